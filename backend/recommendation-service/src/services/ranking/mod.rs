pub mod blender;
pub mod encoder;
pub mod logistic;
pub mod model;

pub use blender::ScoreBlender;
pub use encoder::{FeatureEncoder, IdentityOneHotEncoder};
pub use logistic::LogisticClassifier;
pub use model::{FittedState, RankingModel};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("insufficient training data: {0} samples, need at least {1}")]
    InsufficientData(usize, usize),

    #[error("training data contains a single label class")]
    SingleClass,

    #[error("numeric failure during optimization: {0}")]
    Numeric(String),
}
