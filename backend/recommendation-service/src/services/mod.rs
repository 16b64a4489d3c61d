pub mod engine;
pub mod ranking;
pub mod recall;
pub mod suggestion;
pub mod training;

pub use engine::RecommendationEngine;
pub use ranking::{RankingModel, ScoreBlender};
pub use recall::CandidateRetriever;
pub use suggestion::UserAffinityRanker;
pub use training::TrainingSampleBuilder;
