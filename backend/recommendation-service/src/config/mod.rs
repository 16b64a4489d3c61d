use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub store: StoreConfig,
    pub recall: RecallConfig,
    pub training: TrainingConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub http_port: u16,
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Optional path to a JSON snapshot of users/posts/seen-history.
    /// When unset the service starts with an empty store.
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecallConfig {
    /// First retrieval pass looks back this many days.
    pub initial_window_days: i64,
    /// Second (and final) pass widens to this many days.
    pub extended_window_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Cap on liked posts scanned for positive samples.
    pub max_liked_posts: usize,
    /// Cap on users scanned for negative samples.
    pub max_users: usize,
    /// Cap on posts scanned for negative samples.
    pub max_negative_posts: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub learning_rate: f64,
    pub max_iterations: usize,
    pub l2_penalty: f64,
    /// Seed for the low-confidence unknown-user scores. Unset means
    /// seeded from entropy; set it for reproducible runs.
    pub score_seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iterations: 1000,
            l2_penalty: 1.0,
            score_seed: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();

        Ok(Config {
            service: ServiceConfig {
                http_port: env::var("HTTP_PORT")
                    .unwrap_or_else(|_| "8014".to_string())
                    .parse()
                    .expect("HTTP_PORT must be a valid u16"),
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "recommendation-service".to_string()),
            },
            store: StoreConfig {
                snapshot_path: env::var("STORE_SNAPSHOT_PATH").ok(),
            },
            recall: RecallConfig {
                initial_window_days: env::var("RECALL_INITIAL_WINDOW_DAYS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("RECALL_INITIAL_WINDOW_DAYS must be a valid i64"),
                extended_window_days: env::var("RECALL_EXTENDED_WINDOW_DAYS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("RECALL_EXTENDED_WINDOW_DAYS must be a valid i64"),
            },
            training: TrainingConfig {
                max_liked_posts: env::var("TRAINING_MAX_LIKED_POSTS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .expect("TRAINING_MAX_LIKED_POSTS must be a valid usize"),
                max_users: env::var("TRAINING_MAX_USERS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .expect("TRAINING_MAX_USERS must be a valid usize"),
                max_negative_posts: env::var("TRAINING_MAX_NEGATIVE_POSTS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .expect("TRAINING_MAX_NEGATIVE_POSTS must be a valid usize"),
            },
            model: ModelConfig {
                learning_rate: env::var("MODEL_LEARNING_RATE")
                    .unwrap_or_else(|_| "0.1".to_string())
                    .parse()
                    .expect("MODEL_LEARNING_RATE must be a valid f64"),
                max_iterations: env::var("MODEL_MAX_ITERATIONS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .expect("MODEL_MAX_ITERATIONS must be a valid usize"),
                l2_penalty: env::var("MODEL_L2_PENALTY")
                    .unwrap_or_else(|_| "1.0".to_string())
                    .parse()
                    .expect("MODEL_L2_PENALTY must be a valid f64"),
                score_seed: env::var("MODEL_SCORE_SEED")
                    .ok()
                    .map(|v| v.parse().expect("MODEL_SCORE_SEED must be a valid u64")),
            },
        })
    }
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            initial_window_days: 3,
            extended_window_days: 5,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_liked_posts: 1000,
            max_users: 100,
            max_negative_posts: 500,
        }
    }
}
