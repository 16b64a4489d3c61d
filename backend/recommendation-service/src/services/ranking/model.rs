use super::encoder::{FeatureEncoder, IdentityOneHotEncoder};
use super::logistic::{accuracy, weighted_precision, weighted_recall, LogisticClassifier};
use super::FitError;
use crate::config::ModelConfig;
use crate::models::{Interaction, ModelMetrics, ModelStatus};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Minimum number of interaction records a fit will accept.
pub const MIN_TRAINING_SAMPLES: usize = 10;
/// Above this sample count a stratified 20% holdout is used for
/// validation metrics.
const VALIDATION_THRESHOLD: usize = 20;
const HOLDOUT_FRACTION: f64 = 0.2;
/// Fixed seed for the validation split so refits on identical data
/// produce identical metrics.
const SPLIT_SEED: u64 = 42;

/// Score returned for every post while the model is untrained.
const COLD_START_SCORE: f64 = 0.1;
/// Score returned for every post when scoring fails internally.
const FAILURE_SCORE: f64 = 0.2;
/// Score returned when the fitted label space degenerated to one class.
const DEGENERATE_SCORE: f64 = 0.5;
/// Range of the low-confidence scores drawn for unknown users.
const UNKNOWN_USER_RANGE: std::ops::Range<f64> = 0.1..0.3;

/// Everything a successful fit produces. Built outside any lock and
/// installed as a whole so concurrent readers observe either the old or
/// the new state, never a half-replaced vocabulary.
pub struct FittedState {
    encoder: Box<dyn FeatureEncoder>,
    classifier: LogisticClassifier,
    metrics: ModelMetrics,
}

impl std::fmt::Debug for FittedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittedState")
            .field("classifier", &self.classifier)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Trainable binary relevance scorer over (user, post) identity pairs.
///
/// State machine: untrained until the first successful fit; each later
/// successful fit replaces vocabularies and parameters wholesale; any
/// fit failure leaves the previous state untouched. Scoring never
/// returns an error to the caller.
pub struct RankingModel {
    config: ModelConfig,
    state: Option<FittedState>,
    rng: Mutex<StdRng>,
}

impl RankingModel {
    pub fn new(config: ModelConfig) -> Self {
        let rng = match config.score_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            state: None,
            rng: Mutex::new(rng),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    /// Fit a replacement state from the sample set. Pure with respect
    /// to the current model: call `install` to make the result live.
    pub fn fit(&self, interactions: &[Interaction]) -> Result<FittedState, FitError> {
        if interactions.len() < MIN_TRAINING_SAMPLES {
            return Err(FitError::InsufficientData(
                interactions.len(),
                MIN_TRAINING_SAMPLES,
            ));
        }
        if interactions.iter().all(|i| i.label) || interactions.iter().all(|i| !i.label) {
            return Err(FitError::SingleClass);
        }

        let encoder = IdentityOneHotEncoder::fit(interactions);
        let features: Vec<Array1<f64>> = interactions
            .iter()
            .map(|i| encoder.encode(i.user_id, i.post_id))
            .collect();
        let rows: Vec<_> = features.iter().map(|f| f.view()).collect();
        let x = ndarray::stack(Axis(0), &rows)
            .map_err(|e| FitError::Numeric(e.to_string()))?;
        let y: Array1<f64> = interactions
            .iter()
            .map(|i| if i.label { 1.0 } else { 0.0 })
            .collect();

        let (classifier, metrics) = if interactions.len() > VALIDATION_THRESHOLD {
            let (train_idx, test_idx) = stratified_split(&y, HOLDOUT_FRACTION, SPLIT_SEED);
            let x_train = x.select(Axis(0), &train_idx);
            let y_train = y.select(Axis(0), &train_idx);
            let x_test = x.select(Axis(0), &test_idx);
            let y_test = y.select(Axis(0), &test_idx);

            let classifier = LogisticClassifier::fit(&x_train, &y_train, &self.config)?;
            let predicted = classifier.predict(&x_test);
            let metrics = ModelMetrics {
                accuracy: Some(accuracy(&y_test, &predicted)),
                precision: Some(weighted_precision(&y_test, &predicted)),
                recall: Some(weighted_recall(&y_test, &predicted)),
                training_samples: interactions.len(),
            };
            (classifier, metrics)
        } else {
            let classifier = LogisticClassifier::fit(&x, &y, &self.config)?;
            let metrics = ModelMetrics {
                training_samples: interactions.len(),
                ..Default::default()
            };
            (classifier, metrics)
        };

        Ok(FittedState {
            encoder: Box::new(encoder),
            classifier,
            metrics,
        })
    }

    /// Replace the trained state wholesale.
    pub fn install(&mut self, state: FittedState) {
        self.state = Some(state);
    }

    /// One score per post id, same order, each in [0, 1]. Never fails:
    /// internal errors degrade to a constant fallback score.
    pub fn score(&self, user_id: Uuid, post_ids: &[Uuid]) -> Vec<f64> {
        let state = match &self.state {
            Some(state) => state,
            None => return vec![COLD_START_SCORE; post_ids.len()],
        };
        if post_ids.is_empty() {
            return Vec::new();
        }

        if !state.encoder.knows_user(user_id) {
            // No signal for this user, not a failure: low-confidence
            // scores drawn per post.
            let mut rng = self.rng.lock().unwrap();
            return post_ids
                .iter()
                .map(|_| rng.gen_range(UNKNOWN_USER_RANGE))
                .collect();
        }

        if state.classifier.class_count() < 2 {
            return vec![DEGENERATE_SCORE; post_ids.len()];
        }

        match Self::score_known(state, user_id, post_ids) {
            Ok(scores) => scores,
            Err(err) => {
                warn!(error = %err, "Scoring failed, returning fallback scores");
                vec![FAILURE_SCORE; post_ids.len()]
            }
        }
    }

    fn score_known(
        state: &FittedState,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> anyhow::Result<Vec<f64>> {
        let rows: Vec<Array1<f64>> = post_ids
            .iter()
            .map(|&post_id| state.encoder.encode(user_id, post_id))
            .collect();
        let views: Vec<_> = rows.iter().map(|r| r.view()).collect();
        let x: Array2<f64> = ndarray::stack(Axis(0), &views)?;

        if x.ncols() != state.classifier.feature_count() {
            anyhow::bail!(
                "encoder produced {} columns, classifier expects {}",
                x.ncols(),
                state.classifier.feature_count()
            );
        }

        let probabilities = state.classifier.predict_proba(&x);
        if probabilities.iter().any(|p| !p.is_finite()) {
            anyhow::bail!("non-finite probability in model output");
        }
        Ok(probabilities.to_vec())
    }

    pub fn status(&self) -> ModelStatus {
        match &self.state {
            Some(state) => ModelStatus {
                trained: true,
                user_features: state.encoder.user_dims(),
                post_features: state.encoder.post_dims(),
                metrics: Some(state.metrics.clone()),
            },
            None => ModelStatus {
                trained: false,
                user_features: 0,
                post_features: 0,
                metrics: None,
            },
        }
    }

    pub fn metrics(&self) -> Option<&ModelMetrics> {
        self.state.as_ref().map(|s| &s.metrics)
    }
}

/// Index split keeping the label ratio of both sides close to the
/// requested holdout fraction; every class contributes at least one
/// holdout sample.
fn stratified_split(y: &Array1<f64>, holdout: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [false, true] {
        let mut indices: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, &label)| (label > 0.5) == class)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            continue;
        }
        indices.shuffle(&mut rng);

        let mut holdout_len = ((indices.len() as f64) * holdout).round() as usize;
        holdout_len = holdout_len.clamp(1, indices.len().saturating_sub(1).max(1));

        test.extend(indices.drain(..holdout_len));
        train.extend(indices);
    }

    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_model() -> RankingModel {
        RankingModel::new(ModelConfig {
            score_seed: Some(7),
            ..Default::default()
        })
    }

    /// Sample set where each user either likes or ignores everything,
    /// so the pattern is learnable from identity features alone.
    fn sample_set(positives: usize, negatives: usize) -> Vec<Interaction> {
        let fan = Uuid::new_v4();
        let lurker = Uuid::new_v4();
        let mut interactions = Vec::new();
        for _ in 0..positives {
            interactions.push(Interaction {
                user_id: fan,
                post_id: Uuid::new_v4(),
                label: true,
            });
        }
        for _ in 0..negatives {
            interactions.push(Interaction {
                user_id: lurker,
                post_id: Uuid::new_v4(),
                label: false,
            });
        }
        interactions
    }

    #[test]
    fn rejects_small_sample_sets() {
        let model = seeded_model();
        let samples = sample_set(5, 4);

        let err = model.fit(&samples).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData(9, _)));
        assert!(!model.is_trained());
    }

    #[test]
    fn rejects_single_class_sample_sets() {
        let model = seeded_model();
        let samples = sample_set(12, 0);

        let err = model.fit(&samples).unwrap_err();
        assert!(matches!(err, FitError::SingleClass));
        assert!(!model.is_trained());
    }

    #[test]
    fn untrained_model_scores_cold_start_default() {
        let model = seeded_model();
        let posts: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

        let scores = model.score(Uuid::new_v4(), &posts);
        assert_eq!(scores, vec![0.1; 4]);
    }

    #[test]
    fn small_fit_skips_validation_metrics() {
        let mut model = seeded_model();
        let samples = sample_set(8, 4);

        let fitted = model.fit(&samples).unwrap();
        model.install(fitted);

        assert!(model.is_trained());
        let metrics = model.metrics().unwrap();
        assert_eq!(metrics.training_samples, 12);
        assert!(metrics.accuracy.is_none());
    }

    #[test]
    fn large_fit_records_validation_metrics() {
        let mut model = seeded_model();
        let samples = sample_set(20, 10);

        let fitted = model.fit(&samples).unwrap();
        model.install(fitted);

        let metrics = model.metrics().unwrap();
        assert_eq!(metrics.training_samples, 30);
        assert!(metrics.accuracy.is_some());
        assert!(metrics.precision.is_some());
        assert!(metrics.recall.is_some());
    }

    #[test]
    fn unknown_user_scores_low_confidence_range() {
        let mut model = seeded_model();
        let fitted = model.fit(&sample_set(8, 4)).unwrap();
        model.install(fitted);

        let posts: Vec<Uuid> = (0..50).map(|_| Uuid::new_v4()).collect();
        let scores = model.score(Uuid::new_v4(), &posts);

        assert_eq!(scores.len(), 50);
        for score in scores {
            assert!((0.1..0.3).contains(&score));
        }
    }

    #[test]
    fn known_user_scores_are_probabilities() {
        let mut model = seeded_model();
        let samples = sample_set(8, 4);
        let fan = samples[0].user_id;
        let liked_post = samples[0].post_id;
        let fitted = model.fit(&samples).unwrap();
        model.install(fitted);

        let scores = model.score(fan, &[liked_post]);
        assert_eq!(scores.len(), 1);
        assert!((0.0..=1.0).contains(&scores[0]));
        // The fan liked everything in the sample set.
        assert!(scores[0] > 0.5);
    }

    #[test]
    fn internal_scoring_failure_degrades_to_fallback_scores() {
        let mut model = seeded_model();
        let samples = sample_set(8, 4);
        let known_user = samples[0].user_id;
        let fitted = model.fit(&samples).unwrap();

        // An encoder out of sync with the classifier's feature count,
        // the kind of inconsistency the scoring path must absorb.
        let narrow = IdentityOneHotEncoder::fit(&samples[..2]);
        model.install(FittedState {
            encoder: Box::new(narrow),
            classifier: fitted.classifier,
            metrics: fitted.metrics,
        });

        let posts: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let scores = model.score(known_user, &posts);
        assert_eq!(scores, vec![0.2; 3]);
    }

    #[test]
    fn failed_refit_preserves_trained_state() {
        let mut model = seeded_model();
        let fitted = model.fit(&sample_set(8, 4)).unwrap();
        model.install(fitted);

        let err = model.fit(&sample_set(3, 2)).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData(_, _)));
        assert!(model.is_trained());
        assert_eq!(model.metrics().unwrap().training_samples, 12);
    }

    #[test]
    fn stratified_split_keeps_both_classes() {
        let y: Array1<f64> = (0..30)
            .map(|i| if i < 20 { 1.0 } else { 0.0 })
            .collect();

        let (train, test) = stratified_split(&y, 0.2, 42);
        assert_eq!(train.len() + test.len(), 30);

        let test_positives = test.iter().filter(|&&i| y[i] > 0.5).count();
        let test_negatives = test.len() - test_positives;
        assert!(test_positives >= 1);
        assert!(test_negatives >= 1);

        let train_positives = train.iter().filter(|&&i| y[i] > 0.5).count();
        assert!(train_positives >= 1);
        assert!(train.len() - train_positives >= 1);
    }
}
