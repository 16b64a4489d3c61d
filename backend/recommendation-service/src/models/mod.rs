use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post visibility. Only `Public` posts are eligible for recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Followers,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// A member profile as read from the store. The engine never writes users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    /// Category ids the user follows.
    #[serde(default)]
    pub interests: Vec<Uuid>,
    /// User ids the user follows.
    #[serde(default)]
    pub following: Vec<Uuid>,
    #[serde(default)]
    pub follower_count: u32,
    #[serde(default)]
    pub following_count: u32,
    #[serde(default)]
    pub is_verified: bool,
}

/// A post as read from the store. Read-only for this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author: Uuid,
    pub text: String,
    #[serde(default)]
    pub category: Option<Uuid>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub share_count: u32,
    /// Ids of users who liked the post.
    #[serde(default)]
    pub likes: Vec<Uuid>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub media: Vec<Media>,
}

/// A labeled training record. Exists only for the duration of a
/// training invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub user_id: Uuid,
    pub post_id: Uuid,
    /// true = liked (positive sample), false = negative sample.
    pub label: bool,
}

/// A post paired with its final blended score.
#[derive(Debug, Clone)]
pub struct RankedPost {
    pub post: Post,
    pub score: f64,
}

/// Which tier of the affinity ranker produced a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionReason {
    SimilarInterests,
    FollowedByFriends,
    PopularInInterests,
}

impl SuggestionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionReason::SimilarInterests => "similar_interests",
            SuggestionReason::FollowedByFriends => "followed_by_friends",
            SuggestionReason::PopularInInterests => "popular_in_interests",
        }
    }
}

/// A "who to follow" candidate with its tier and raw score.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestedUser {
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub bio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    pub follower_count: u32,
    pub following_count: u32,
    pub is_verified: bool,
    pub shared_interests: usize,
    pub score: f64,
    pub recommendation_reason: SuggestionReason,
}

/// Metrics recorded by the last successful fit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recall: Option<f64>,
    pub training_samples: usize,
}

/// Snapshot of the model state for `GET /model/status`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub trained: bool,
    pub user_features: usize,
    pub post_features: usize,
    #[serde(flatten)]
    pub metrics: Option<ModelMetrics>,
}

/// Outcome of a training invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainReport {
    Trained {
        total_samples: usize,
        positive_samples: usize,
        negative_samples: usize,
    },
    NoData {
        message: String,
    },
    Failed {
        message: String,
        total_samples: usize,
    },
}
