use super::{DataStore, PostFilter, PostSort, UserFilter, UserSort};
use crate::models::{Post, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// JSON snapshot of the interaction data the service is handed at
/// startup. Seen-history ids are kept as strings so malformed entries
/// can be dropped at query time instead of failing the whole load.
#[derive(Debug, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub seen_history: Vec<SeenHistoryRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SeenHistoryRecord {
    pub user: Uuid,
    #[serde(default)]
    pub seen_posts: Vec<String>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    posts: Vec<Post>,
    seen: HashMap<Uuid, Vec<String>>,
}

/// In-memory store over a data snapshot. Scan order is insertion
/// order, which keeps unsorted queries deterministic.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading snapshot {}", path.as_ref().display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw).context("parsing snapshot JSON")?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        info!(
            users = snapshot.users.len(),
            posts = snapshot.posts.len(),
            histories = snapshot.seen_history.len(),
            "Loaded store snapshot"
        );

        let seen = snapshot
            .seen_history
            .into_iter()
            .map(|record| (record.user, record.seen_posts))
            .collect();

        Self {
            inner: RwLock::new(Inner {
                users: snapshot.users,
                posts: snapshot.posts,
                seen,
            }),
        }
    }

    pub fn insert_user(&self, user: User) {
        self.inner.write().unwrap().users.push(user);
    }

    pub fn insert_post(&self, post: Post) {
        self.inner.write().unwrap().posts.push(post);
    }

    pub fn set_seen(&self, user_id: Uuid, seen: Vec<String>) {
        self.inner.write().unwrap().seen.insert(user_id, seen);
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_posts(
        &self,
        filter: &PostFilter,
        sort: PostSort,
        limit: usize,
    ) -> Result<Vec<Post>> {
        let inner = self.inner.read().unwrap();
        let mut posts: Vec<Post> = inner
            .posts
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();

        match sort {
            PostSort::Unsorted => {}
            PostSort::NewestFirst => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            PostSort::MostLiked => posts.sort_by(|a, b| b.like_count.cmp(&a.like_count)),
        }

        posts.truncate(limit);
        Ok(posts)
    }

    async fn find_users(
        &self,
        filter: &UserFilter,
        sort: UserSort,
        limit: usize,
    ) -> Result<Vec<User>> {
        let inner = self.inner.read().unwrap();
        let mut users: Vec<User> = inner
            .users
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();

        match sort {
            UserSort::Unsorted => {}
            UserSort::FollowersDesc => {
                users.sort_by(|a, b| b.follower_count.cmp(&a.follower_count))
            }
        }

        users.truncate(limit);
        Ok(users)
    }

    async fn seen_posts(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let inner = self.inner.read().unwrap();
        let seen = inner
            .seen
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    // Malformed ids are dropped, never surfaced.
                    .filter_map(|raw| Uuid::parse_str(raw).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Visibility;
    use chrono::Utc;

    fn sample_post(like_count: u32) -> Post {
        Post {
            id: Uuid::new_v4(),
            author: Uuid::new_v4(),
            text: "post".to_string(),
            category: None,
            visibility: Visibility::Public,
            created_at: Utc::now(),
            like_count,
            comment_count: 0,
            share_count: 0,
            likes: Vec::new(),
            hashtags: Vec::new(),
            media: Vec::new(),
        }
    }

    #[tokio::test]
    async fn malformed_seen_ids_are_dropped() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let valid = Uuid::new_v4();
        store.set_seen(
            user_id,
            vec![
                valid.to_string(),
                "not-a-uuid".to_string(),
                "12345".to_string(),
            ],
        );

        let seen = store.seen_posts(user_id).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen.contains(&valid));
    }

    #[tokio::test]
    async fn most_liked_sort_and_limit() {
        let store = InMemoryStore::new();
        store.insert_post(sample_post(3));
        store.insert_post(sample_post(10));
        store.insert_post(sample_post(7));

        let posts = store
            .find_posts(&PostFilter::public(), PostSort::MostLiked, 2)
            .await
            .unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].like_count, 10);
        assert_eq!(posts[1].like_count, 7);
    }

    #[tokio::test]
    async fn unsorted_scan_keeps_insertion_order() {
        let store = InMemoryStore::new();
        let first = sample_post(0);
        let second = sample_post(5);
        let first_id = first.id;
        store.insert_post(first);
        store.insert_post(second);

        let posts = store
            .find_posts(&PostFilter::public(), PostSort::Unsorted, 10)
            .await
            .unwrap();

        assert_eq!(posts[0].id, first_id);
    }
}
