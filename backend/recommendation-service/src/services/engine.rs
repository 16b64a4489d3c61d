use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    ModelStatus, Post, RankedPost, SuggestedUser, TrainReport, User,
};
use crate::services::ranking::{RankingModel, ScoreBlender};
use crate::services::recall::CandidateRetriever;
use crate::services::suggestion::UserAffinityRanker;
use crate::services::training::TrainingSampleBuilder;
use crate::store::{DataStore, NetworkScope, PostFilter, PostSort};
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Per-surface over-fetch multipliers applied to the requested limit
/// before retrieval; final truncation happens after scoring.
const PREDICT_OVERFETCH: usize = 3;
const TIMELINE_OVERFETCH: usize = 2;
const EXPLORE_OVERFETCH: usize = 3;

/// The candidate-selection-and-scoring engine behind the HTTP surface.
///
/// The model is the only shared mutable state: scoring runs under read
/// guards, and `train` builds the replacement state before taking the
/// write guard, so concurrent readers see either the old or the new
/// model, never a partial one.
pub struct RecommendationEngine {
    store: Arc<dyn DataStore>,
    retriever: CandidateRetriever,
    sampler: TrainingSampleBuilder,
    affinity: UserAffinityRanker,
    model: RwLock<RankingModel>,
}

impl RecommendationEngine {
    pub fn new(store: Arc<dyn DataStore>, config: &Config) -> Self {
        Self {
            retriever: CandidateRetriever::new(store.clone(), config.recall.clone()),
            sampler: TrainingSampleBuilder::new(store.clone(), config.training.clone()),
            affinity: UserAffinityRanker::new(store.clone()),
            model: RwLock::new(RankingModel::new(config.model.clone())),
            store,
        }
    }

    /// Retrain the model from the interaction snapshot. Failures leave
    /// the previous model untouched and are reported, not raised.
    pub async fn train(&self) -> Result<TrainReport> {
        let interactions = self.sampler.build().await.map_err(AppError::from)?;
        if interactions.is_empty() {
            return Ok(TrainReport::NoData {
                message: "No interaction data found for training".to_string(),
            });
        }

        let positives = interactions.iter().filter(|i| i.label).count();
        let negatives = interactions.len() - positives;

        let fitted = {
            let model = self.model.read().unwrap();
            model.fit(&interactions)
        };

        match fitted {
            Ok(state) => {
                self.model.write().unwrap().install(state);
                info!(
                    total = interactions.len(),
                    positives, negatives, "Model trained"
                );
                Ok(TrainReport::Trained {
                    total_samples: interactions.len(),
                    positive_samples: positives,
                    negative_samples: negatives,
                })
            }
            Err(err) => {
                error!(error = %err, "Training failed, keeping previous model");
                Ok(TrainReport::Failed {
                    message: err.to_string(),
                    total_samples: interactions.len(),
                })
            }
        }
    }

    /// Predict surface: model-scored (or heuristic) top-K public posts
    /// the user has not seen and did not author.
    pub async fn rank_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<RankedPost>> {
        let user = self.require_user(user_id).await?;
        let base = self.personal_filter(&user).await?;

        let posts = self
            .retriever
            .retrieve(&base, PostSort::Unsorted, limit, PREDICT_OVERFETCH)
            .await
            .map_err(AppError::from)?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let scores = self.model_scores(user_id, &posts);
        Ok(ScoreBlender::rank_predict(&user, posts, scores, limit))
    }

    /// Timeline surface: posts from followed authors or followed
    /// categories, newest first, blended with the model when trained.
    pub async fn timeline(&self, user_id: Uuid, limit: usize) -> Result<Vec<Post>> {
        let user = self.require_user(user_id).await?;
        let seen = self.store.seen_posts(user_id).await.map_err(AppError::from)?;

        let base = PostFilter::public()
            .not_authored_by(user.id)
            .within_network(NetworkScope {
                authors: user.following.clone(),
                categories: user.interests.clone(),
            })
            .excluding(seen);

        let posts = self
            .retriever
            .retrieve(&base, PostSort::NewestFirst, limit, TIMELINE_OVERFETCH)
            .await
            .map_err(AppError::from)?;

        let scores = self.model_scores(user_id, &posts);
        Ok(ScoreBlender::rank_timeline(posts, scores, limit))
    }

    /// Explore surface: broad public candidates, most-liked first, with
    /// the 70/30 model/diversity split when trained.
    pub async fn explore(&self, user_id: Uuid, limit: usize) -> Result<Vec<Post>> {
        let user = self.require_user(user_id).await?;
        let base = self.personal_filter(&user).await?;

        let posts = self
            .retriever
            .retrieve(&base, PostSort::MostLiked, limit, EXPLORE_OVERFETCH)
            .await
            .map_err(AppError::from)?;

        let scores = self.model_scores(user_id, &posts);
        Ok(ScoreBlender::rank_explore(posts, scores, limit))
    }

    /// Who-to-follow surface.
    pub async fn suggest_users(&self, user_id: Uuid, limit: usize) -> Result<Vec<SuggestedUser>> {
        let user = self.require_user(user_id).await?;
        self.affinity
            .suggest(&user, limit)
            .await
            .map_err(AppError::from)
    }

    pub fn model_status(&self) -> ModelStatus {
        self.model.read().unwrap().status()
    }

    pub fn is_trained(&self) -> bool {
        self.model.read().unwrap().is_trained()
    }

    async fn require_user(&self, user_id: Uuid) -> Result<User> {
        match self.store.get_user(user_id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                warn!(%user_id, "Request for unknown user");
                Err(AppError::user_not_found())
            }
            Err(err) => Err(AppError::Store(err.to_string())),
        }
    }

    /// Base predicate shared by the predict and explore surfaces:
    /// public, not the user's own content, not previously seen.
    async fn personal_filter(&self, user: &User) -> Result<PostFilter> {
        let seen = self.store.seen_posts(user.id).await.map_err(AppError::from)?;
        Ok(PostFilter::public().not_authored_by(user.id).excluding(seen))
    }

    /// Model scores for the candidate set, or `None` while untrained so
    /// the blender falls back to its heuristics.
    fn model_scores(&self, user_id: Uuid, posts: &[Post]) -> Option<Vec<f64>> {
        let model = self.model.read().unwrap();
        if !model.is_trained() || posts.is_empty() {
            return None;
        }
        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        Some(model.score(user_id, &post_ids))
    }
}
