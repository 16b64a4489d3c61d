use super::FitError;
use crate::config::ModelConfig;
use ndarray::{Array1, Array2};

/// L2-regularized binary logistic regression fitted by batch gradient
/// descent over dense ndarray matrices.
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    weights: Array1<f64>,
    bias: f64,
    class_count: usize,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticClassifier {
    /// `y` must contain 0.0/1.0 labels. Callers are expected to have
    /// rejected single-class samples already; the fitted label space is
    /// still recorded so degenerate scoring can be detected.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, config: &ModelConfig) -> Result<Self, FitError> {
        let samples = x.nrows() as f64;
        let mut weights: Array1<f64> = Array1::zeros(x.ncols());
        let mut bias = 0.0_f64;

        let has_positive = y.iter().any(|&label| label > 0.5);
        let has_negative = y.iter().any(|&label| label <= 0.5);
        let class_count = usize::from(has_positive) + usize::from(has_negative);

        for _ in 0..config.max_iterations {
            let logits = x.dot(&weights) + bias;
            let probabilities = logits.mapv(sigmoid);
            let residuals = &probabilities - y;

            let gradient = (x.t().dot(&residuals) + config.l2_penalty * &weights) / samples;
            let bias_gradient = residuals.sum() / samples;

            weights = weights - config.learning_rate * &gradient;
            bias -= config.learning_rate * bias_gradient;
        }

        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(FitError::Numeric(
                "non-finite parameters after optimization".to_string(),
            ));
        }

        Ok(Self {
            weights,
            bias,
            class_count,
        })
    }

    /// Estimated probability of the positive class per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        (x.dot(&self.weights) + self.bias).mapv(sigmoid)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        self.predict_proba(x)
            .mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 })
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }

    pub fn feature_count(&self) -> usize {
        self.weights.len()
    }
}

pub fn accuracy(truth: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(&t, &p)| (t > 0.5) == (p > 0.5))
        .count();
    correct as f64 / truth.len() as f64
}

/// Per-class precision weighted by class support, the weighted-average
/// convention of the original training metrics.
pub fn weighted_precision(truth: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    weighted_metric(truth, predicted, |tp, predicted_count, _actual| {
        if predicted_count == 0 {
            0.0
        } else {
            tp as f64 / predicted_count as f64
        }
    })
}

/// Per-class recall weighted by class support.
pub fn weighted_recall(truth: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    weighted_metric(truth, predicted, |tp, _predicted, actual_count| {
        if actual_count == 0 {
            0.0
        } else {
            tp as f64 / actual_count as f64
        }
    })
}

fn weighted_metric(
    truth: &Array1<f64>,
    predicted: &Array1<f64>,
    per_class: impl Fn(usize, usize, usize) -> f64,
) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }

    let mut weighted = 0.0;
    for class in [false, true] {
        let actual: Vec<bool> = truth.iter().map(|&t| (t > 0.5) == class).collect();
        let predicted_as: Vec<bool> = predicted.iter().map(|&p| (p > 0.5) == class).collect();

        let support = actual.iter().filter(|&&a| a).count();
        let predicted_count = predicted_as.iter().filter(|&&p| p).count();
        let true_positives = actual
            .iter()
            .zip(predicted_as.iter())
            .filter(|(&a, &p)| a && p)
            .count();

        weighted +=
            per_class(true_positives, predicted_count, support) * support as f64;
    }

    weighted / truth.len() as f64
}
