use crate::config::TrainingConfig;
use crate::models::Interaction;
use crate::store::{DataStore, PostFilter, PostSort, UserFilter, UserSort};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Builds a labeled, class-balanced sample set from the interaction
/// snapshot. Positive samples come from likes; negative samples from
/// (user, post) pairs the user did not like, capped at half the
/// positive count. All scans are bounded so a training invocation has a
/// predictable footprint.
pub struct TrainingSampleBuilder {
    store: Arc<dyn DataStore>,
    config: TrainingConfig,
}

impl TrainingSampleBuilder {
    pub fn new(store: Arc<dyn DataStore>, config: TrainingConfig) -> Self {
        Self { store, config }
    }

    /// Positive records first, then negatives. Empty when no liked
    /// posts exist.
    pub async fn build(&self) -> Result<Vec<Interaction>> {
        let liked_posts = self
            .store
            .find_posts(
                &PostFilter::public().with_likes(),
                PostSort::Unsorted,
                self.config.max_liked_posts,
            )
            .await?;

        let mut interactions: Vec<Interaction> = Vec::new();
        for post in &liked_posts {
            for liker in &post.likes {
                interactions.push(Interaction {
                    user_id: *liker,
                    post_id: post.id,
                    label: true,
                });
            }
        }

        if interactions.is_empty() {
            return Ok(interactions);
        }

        let max_negatives = interactions.len() / 2;
        let users = self
            .store
            .find_users(&UserFilter::default(), UserSort::Unsorted, self.config.max_users)
            .await?;
        let posts = self
            .store
            .find_posts(
                &PostFilter::public(),
                PostSort::Unsorted,
                self.config.max_negative_posts,
            )
            .await?;

        let mut negatives = 0usize;
        'users: for user in &users {
            for post in &posts {
                if !post.likes.contains(&user.id) {
                    interactions.push(Interaction {
                        user_id: user.id,
                        post_id: post.id,
                        label: false,
                    });
                    negatives += 1;
                    if negatives >= max_negatives {
                        break 'users;
                    }
                }
            }
        }

        info!(
            positives = interactions.len() - negatives,
            negatives, "Built training sample set"
        );

        Ok(interactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Post, User, Visibility};
    use crate::store::InMemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(id: Uuid) -> User {
        User {
            id,
            username: format!("user-{id}"),
            full_name: "User".to_string(),
            bio: String::new(),
            profile_picture: None,
            interests: Vec::new(),
            following: Vec::new(),
            follower_count: 0,
            following_count: 0,
            is_verified: false,
        }
    }

    fn liked_post(likers: Vec<Uuid>) -> Post {
        Post {
            id: Uuid::new_v4(),
            author: Uuid::new_v4(),
            text: "post".to_string(),
            category: None,
            visibility: Visibility::Public,
            created_at: Utc::now(),
            like_count: likers.len() as u32,
            comment_count: 0,
            share_count: 0,
            likes: likers,
            hashtags: Vec::new(),
            media: Vec::new(),
        }
    }

    fn builder(store: Arc<InMemoryStore>) -> TrainingSampleBuilder {
        TrainingSampleBuilder::new(store, TrainingConfig::default())
    }

    #[tokio::test]
    async fn empty_without_liked_posts() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_post(liked_post(Vec::new()));

        let samples = builder(store).build().await.unwrap();
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn one_positive_per_liker() {
        let store = Arc::new(InMemoryStore::new());
        let likers: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        store.insert_post(liked_post(likers.clone()));

        let samples = builder(store).build().await.unwrap();
        let positives: Vec<_> = samples.iter().filter(|s| s.label).collect();
        assert_eq!(positives.len(), 3);
        for liker in likers {
            assert!(positives.iter().any(|s| s.user_id == liker));
        }
    }

    #[tokio::test]
    async fn negatives_capped_at_half_positives() {
        let store = Arc::new(InMemoryStore::new());
        let likers: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();
        store.insert_post(liked_post(likers));

        // Plenty of non-liking users and posts to draw negatives from.
        for _ in 0..10 {
            store.insert_user(user(Uuid::new_v4()));
            store.insert_post(liked_post(Vec::new()));
        }

        let samples = builder(store).build().await.unwrap();
        let negatives = samples.iter().filter(|s| !s.label).count();
        assert_eq!(negatives, 4);
        // Positives come first.
        assert!(samples[..8].iter().all(|s| s.label));
    }

    #[tokio::test]
    async fn negative_pairs_skip_actual_likers() {
        let store = Arc::new(InMemoryStore::new());
        let liker = Uuid::new_v4();
        store.insert_user(user(liker));
        store.insert_post(liked_post(vec![liker, Uuid::new_v4()]));

        let samples = builder(store).build().await.unwrap();
        assert!(!samples
            .iter()
            .any(|s| !s.label && s.user_id == liker));
    }
}
