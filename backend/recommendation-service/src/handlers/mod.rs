/// HTTP surface of the recommendation engine. Thin glue: parse the
/// request, call the engine, shape the response envelope.
use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Media, Post, RankedPost, SuggestedUser};
use crate::services::RecommendationEngine;

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    #[serde(default = "default_predict_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    #[serde(default = "default_timeline_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct ExploreQuery {
    #[serde(default = "default_explore_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct SuggestUsersQuery {
    #[serde(default = "default_predict_limit")]
    pub limit: usize,
}

fn default_predict_limit() -> usize {
    10
}

fn default_timeline_limit() -> usize {
    20
}

fn default_explore_limit() -> usize {
    30
}

#[derive(Debug, Serialize)]
pub struct PredictionItem {
    pub post_id: Uuid,
    pub text: String,
    pub author: Uuid,
    pub category: Option<Uuid>,
    pub like_count: u32,
    pub comment_count: u32,
    pub share_count: u32,
    pub hashtags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct FeedItem {
    pub post_id: Uuid,
    pub text: String,
    pub author: Uuid,
    pub category: Option<Uuid>,
    pub like_count: u32,
    pub comment_count: u32,
    pub share_count: u32,
    pub created_at: DateTime<Utc>,
    pub hashtags: Vec<String>,
    pub media: Vec<Media>,
}

#[derive(Serialize)]
struct PredictionsResponse {
    predictions: Vec<PredictionItem>,
}

#[derive(Serialize)]
struct TimelineResponse {
    timeline: Vec<FeedItem>,
}

#[derive(Serialize)]
struct ExploreResponse {
    explore: Vec<FeedItem>,
}

#[derive(Serialize)]
struct SuggestedUsersResponse {
    suggested_users: Vec<SuggestedUser>,
}

impl From<RankedPost> for PredictionItem {
    fn from(ranked: RankedPost) -> Self {
        let post = ranked.post;
        Self {
            post_id: post.id,
            text: post.text,
            author: post.author,
            category: post.category,
            like_count: post.like_count,
            comment_count: post.comment_count,
            share_count: post.share_count,
            hashtags: post.hashtags,
            created_at: post.created_at,
            score: ranked.score,
        }
    }
}

impl From<Post> for FeedItem {
    fn from(post: Post) -> Self {
        Self {
            post_id: post.id,
            text: post.text,
            author: post.author,
            category: post.category,
            like_count: post.like_count,
            comment_count: post.comment_count,
            share_count: post.share_count,
            created_at: post.created_at,
            hashtags: post.hashtags,
            media: post.media,
        }
    }
}

fn parse_user_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid user id: {raw}")))
}

/// POST /train
///
/// Retrain the model from the current interaction snapshot.
#[post("/train")]
pub async fn train_model(engine: web::Data<RecommendationEngine>) -> Result<HttpResponse> {
    let report = engine.train().await?;
    Ok(HttpResponse::Ok().json(report))
}

/// GET /predict/{user_id}
///
/// Model-scored post recommendations with per-post scores.
#[get("/predict/{user_id}")]
pub async fn predict_likes(
    path: web::Path<String>,
    query: web::Query<PredictQuery>,
    engine: web::Data<RecommendationEngine>,
) -> Result<HttpResponse> {
    let user_id = parse_user_id(&path)?;
    debug!(%user_id, limit = query.limit, "Predict request");

    let ranked = engine.rank_for_user(user_id, query.limit).await?;
    Ok(HttpResponse::Ok().json(PredictionsResponse {
        predictions: ranked.into_iter().map(PredictionItem::from).collect(),
    }))
}

/// GET /recommend/timeline/{user_id}
#[get("/recommend/timeline/{user_id}")]
pub async fn recommend_timeline(
    path: web::Path<String>,
    query: web::Query<TimelineQuery>,
    engine: web::Data<RecommendationEngine>,
) -> Result<HttpResponse> {
    let user_id = parse_user_id(&path)?;
    debug!(%user_id, limit = query.limit, "Timeline request");

    let posts = engine.timeline(user_id, query.limit).await?;
    Ok(HttpResponse::Ok().json(TimelineResponse {
        timeline: posts.into_iter().map(FeedItem::from).collect(),
    }))
}

/// GET /recommend/explore/{user_id}
#[get("/recommend/explore/{user_id}")]
pub async fn recommend_explore(
    path: web::Path<String>,
    query: web::Query<ExploreQuery>,
    engine: web::Data<RecommendationEngine>,
) -> Result<HttpResponse> {
    let user_id = parse_user_id(&path)?;
    debug!(%user_id, limit = query.limit, "Explore request");

    let posts = engine.explore(user_id, query.limit).await?;
    Ok(HttpResponse::Ok().json(ExploreResponse {
        explore: posts.into_iter().map(FeedItem::from).collect(),
    }))
}

/// GET /recommend/users/{user_id}
#[get("/recommend/users/{user_id}")]
pub async fn recommend_users(
    path: web::Path<String>,
    query: web::Query<SuggestUsersQuery>,
    engine: web::Data<RecommendationEngine>,
) -> Result<HttpResponse> {
    let user_id = parse_user_id(&path)?;
    debug!(%user_id, limit = query.limit, "User suggestion request");

    let suggested_users = engine.suggest_users(user_id, query.limit).await?;
    Ok(HttpResponse::Ok().json(SuggestedUsersResponse { suggested_users }))
}

/// GET /model/status
#[get("/model/status")]
pub async fn model_status(engine: web::Data<RecommendationEngine>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(engine.model_status()))
}

/// GET /health
#[get("/health")]
pub async fn health_check(engine: web::Data<RecommendationEngine>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "model_trained": engine.is_trained(),
    })))
}
