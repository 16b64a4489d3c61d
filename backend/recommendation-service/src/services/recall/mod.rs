use crate::config::RecallConfig;
use crate::models::Post;
use crate::store::{DataStore, PostFilter, PostSort};
use anyhow::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;

/// Candidate retrieval with a widening recency window.
///
/// The first pass is restricted to the initial window (3 days). When it
/// comes back short of `limit`, a single second pass widens to the
/// extended window (5 days), excluding everything already fetched. A
/// short or empty result after both passes is a valid terminal outcome.
pub struct CandidateRetriever {
    store: Arc<dyn DataStore>,
    config: RecallConfig,
}

impl CandidateRetriever {
    pub fn new(store: Arc<dyn DataStore>, config: RecallConfig) -> Self {
        Self { store, config }
    }

    /// `overfetch` is the per-surface multiplier applied to `limit` for
    /// each store query; callers truncate further after scoring.
    pub async fn retrieve(
        &self,
        base: &PostFilter,
        sort: PostSort,
        limit: usize,
        overfetch: usize,
    ) -> Result<Vec<Post>> {
        let cap = limit.saturating_mul(overfetch);
        let now = Utc::now();

        let initial_cutoff = now - Duration::days(self.config.initial_window_days);
        let mut posts = self
            .store
            .find_posts(&base.clone().since(initial_cutoff), sort, cap)
            .await?;

        if posts.len() < limit {
            let fetched: Vec<_> = posts.iter().map(|p| p.id).collect();
            let extended_cutoff = now - Duration::days(self.config.extended_window_days);
            let widened = base.clone().since(extended_cutoff).excluding(fetched);

            let additional = self.store.find_posts(&widened, sort, cap).await?;
            debug!(
                initial = posts.len(),
                additional = additional.len(),
                "Recall widened to extended window"
            );
            posts.extend(additional);
        }

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Post, Visibility};
    use crate::store::InMemoryStore;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn post_aged(days_old: i64) -> Post {
        Post {
            id: Uuid::new_v4(),
            author: Uuid::new_v4(),
            text: "post".to_string(),
            category: None,
            visibility: Visibility::Public,
            created_at: Utc::now() - Duration::days(days_old),
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            likes: Vec::new(),
            hashtags: Vec::new(),
            media: Vec::new(),
        }
    }

    fn retriever(store: Arc<InMemoryStore>) -> CandidateRetriever {
        CandidateRetriever::new(store, RecallConfig::default())
    }

    #[tokio::test]
    async fn initial_window_satisfies_limit() {
        let store = Arc::new(InMemoryStore::new());
        for _ in 0..5 {
            store.insert_post(post_aged(1));
        }
        // Older posts should not be needed.
        store.insert_post(post_aged(4));

        let posts = retriever(store)
            .retrieve(&PostFilter::public(), PostSort::Unsorted, 3, 3)
            .await
            .unwrap();

        assert_eq!(posts.len(), 5);
        assert!(posts.iter().all(|p| p.created_at > Utc::now() - Duration::days(3)));
    }

    #[tokio::test]
    async fn widens_window_without_duplicates() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_post(post_aged(1));
        store.insert_post(post_aged(2));
        store.insert_post(post_aged(4));
        store.insert_post(post_aged(4));
        // Beyond the extended window, never returned.
        store.insert_post(post_aged(10));

        let posts = retriever(store)
            .retrieve(&PostFilter::public(), PostSort::Unsorted, 4, 3)
            .await
            .unwrap();

        assert_eq!(posts.len(), 4);
        let ids: HashSet<_> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn short_result_is_not_an_error() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_post(post_aged(4));

        let posts = retriever(store)
            .retrieve(&PostFilter::public(), PostSort::Unsorted, 10, 3)
            .await
            .unwrap();

        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn empty_store_yields_empty_result() {
        let store = Arc::new(InMemoryStore::new());

        let posts = retriever(store)
            .retrieve(&PostFilter::public(), PostSort::Unsorted, 10, 3)
            .await
            .unwrap();

        assert!(posts.is_empty());
    }
}
