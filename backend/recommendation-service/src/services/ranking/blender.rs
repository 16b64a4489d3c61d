use crate::models::{Post, RankedPost, User};
use chrono::{Duration, Utc};

/// Per-surface deterministic blending of model scores with engagement,
/// recency and (for explore) diversity signals. Candidates handed in
/// here have already passed retrieval, so visibility, self-exclusion
/// and seen-exclusion hold.
pub struct ScoreBlender;

/// Weighted engagement: likes count most, then comments, then shares.
fn weighted_engagement(post: &Post) -> f64 {
    post.like_count as f64 * 0.5 + post.comment_count as f64 * 0.3 + post.share_count as f64 * 0.2
}

/// Engagement key used for the explore diversity reserve: shares are
/// the strongest signal of reach.
fn diversity_key(post: &Post) -> u64 {
    post.like_count as u64 + post.comment_count as u64 * 2 + post.share_count as u64 * 3
}

impl ScoreBlender {
    /// Heuristic single-post score for the untrained predict surface:
    /// an interest-match bonus plus capped engagement.
    pub fn predict_heuristic(user: &User, post: &Post) -> f64 {
        let mut score = 0.0;
        if let Some(category) = post.category {
            if user.interests.contains(&category) {
                score += 0.5;
            }
        }
        score + (weighted_engagement(post) / 100.0).min(0.5)
    }

    /// Predict surface: model scores when trained, heuristic otherwise.
    /// Sorting is stable, so equal scores keep retrieval order.
    pub fn rank_predict(
        user: &User,
        posts: Vec<Post>,
        model_scores: Option<Vec<f64>>,
        limit: usize,
    ) -> Vec<RankedPost> {
        let mut ranked: Vec<RankedPost> = match model_scores {
            Some(scores) => posts
                .into_iter()
                .zip(scores)
                .map(|(post, score)| RankedPost { post, score })
                .collect(),
            None => posts
                .into_iter()
                .map(|post| {
                    let score = Self::predict_heuristic(user, &post);
                    RankedPost { post, score }
                })
                .collect(),
        };

        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(limit);
        ranked
    }

    /// Timeline surface: 60% model score, 30% normalized engagement,
    /// 10% recency boost for posts under a day old. Untrained fallback
    /// keeps retrieval order.
    pub fn rank_timeline(
        posts: Vec<Post>,
        model_scores: Option<Vec<f64>>,
        limit: usize,
    ) -> Vec<Post> {
        let scores = match model_scores {
            Some(scores) => scores,
            None => {
                let mut posts = posts;
                posts.truncate(limit);
                return posts;
            }
        };

        let now = Utc::now();
        let mut blended: Vec<(Post, f64)> = posts
            .into_iter()
            .zip(scores)
            .map(|(post, model_score)| {
                let raw_total =
                    (post.like_count + post.comment_count + post.share_count) as f64;
                // Guards divide-by-zero on posts with no interactions.
                let engagement = weighted_engagement(&post) / raw_total.max(1.0);
                let recency_boost = if now - post.created_at < Duration::days(1) {
                    0.1
                } else {
                    0.0
                };

                let final_score = model_score * 0.6 + engagement * 0.3 + recency_boost;
                (post, final_score)
            })
            .collect();

        blended.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        blended.into_iter().take(limit).map(|(post, _)| post).collect()
    }

    /// Explore surface: the top ceil(70%) of `limit` by model score,
    /// then floor(30%) of the remainder re-ranked by the diversity key.
    /// The ceil/floor pair always reconciles to exactly `limit`.
    /// Untrained fallback ranks everything by the diversity key.
    pub fn rank_explore(
        posts: Vec<Post>,
        model_scores: Option<Vec<f64>>,
        limit: usize,
    ) -> Vec<Post> {
        let scores = match model_scores {
            Some(scores) => scores,
            None => {
                let mut posts = posts;
                posts.sort_by(|a, b| diversity_key(b).cmp(&diversity_key(a)));
                posts.truncate(limit);
                return posts;
            }
        };

        let mut scored: Vec<(Post, f64)> = posts.into_iter().zip(scores).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let model_share = (limit as f64 * 0.7).ceil() as usize;
        let diversity_share = (limit as f64 * 0.3).floor() as usize;

        let remainder = scored.split_off(model_share.min(scored.len()));
        let mut selected: Vec<Post> = scored.into_iter().map(|(post, _)| post).collect();

        let mut by_engagement: Vec<Post> = remainder.into_iter().map(|(post, _)| post).collect();
        by_engagement.sort_by(|a, b| diversity_key(b).cmp(&diversity_key(a)));
        selected.extend(by_engagement.into_iter().take(diversity_share));

        selected.truncate(limit);
        selected
    }
}
