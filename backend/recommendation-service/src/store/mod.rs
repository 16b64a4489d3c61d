mod memory;

use crate::models::{Post, User, Visibility};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

pub use memory::{InMemoryStore, SeenHistoryRecord, Snapshot};

/// Restricts a post query to authors in one set OR categories in
/// another (the "posts by followed authors or in followed categories"
/// timeline predicate).
#[derive(Debug, Clone, Default)]
pub struct NetworkScope {
    pub authors: Vec<Uuid>,
    pub categories: Vec<Uuid>,
}

/// Typed post predicate. Composition methods consume and return a new
/// filter so a base predicate can be reused across retrieval passes
/// without hidden mutation.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub visibility: Option<Visibility>,
    pub exclude_author: Option<Uuid>,
    pub network: Option<NetworkScope>,
    pub exclude_ids: HashSet<Uuid>,
    pub created_after: Option<DateTime<Utc>>,
    pub min_likes: Option<u32>,
}

impl PostFilter {
    pub fn public() -> Self {
        Self {
            visibility: Some(Visibility::Public),
            ..Default::default()
        }
    }

    pub fn not_authored_by(mut self, author: Uuid) -> Self {
        self.exclude_author = Some(author);
        self
    }

    pub fn within_network(mut self, scope: NetworkScope) -> Self {
        self.network = Some(scope);
        self
    }

    /// Restrict to posts created at or after `cutoff`.
    pub fn since(mut self, cutoff: DateTime<Utc>) -> Self {
        self.created_after = Some(cutoff);
        self
    }

    /// Extend the exclusion set with additional post ids.
    pub fn excluding<I: IntoIterator<Item = Uuid>>(mut self, ids: I) -> Self {
        self.exclude_ids.extend(ids);
        self
    }

    pub fn with_likes(mut self) -> Self {
        self.min_likes = Some(1);
        self
    }

    pub fn matches(&self, post: &Post) -> bool {
        if let Some(visibility) = self.visibility {
            if post.visibility != visibility {
                return false;
            }
        }
        if let Some(author) = self.exclude_author {
            if post.author == author {
                return false;
            }
        }
        if let Some(scope) = &self.network {
            let by_author = scope.authors.contains(&post.author);
            let by_category = post
                .category
                .map(|c| scope.categories.contains(&c))
                .unwrap_or(false);
            if !by_author && !by_category {
                return false;
            }
        }
        if self.exclude_ids.contains(&post.id) {
            return false;
        }
        if let Some(cutoff) = self.created_after {
            if post.created_at < cutoff {
                return false;
            }
        }
        if let Some(min_likes) = self.min_likes {
            if post.like_count < min_likes {
                return false;
            }
        }
        true
    }
}

/// Typed user predicate.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub exclude_id: Option<Uuid>,
    pub id_in: Option<Vec<Uuid>>,
    pub interests_any: Option<Vec<Uuid>>,
    pub min_followers: Option<u32>,
}

impl UserFilter {
    pub fn excluding_user(mut self, id: Uuid) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn among(mut self, ids: Vec<Uuid>) -> Self {
        self.id_in = Some(ids);
        self
    }

    pub fn interested_in_any(mut self, categories: Vec<Uuid>) -> Self {
        self.interests_any = Some(categories);
        self
    }

    pub fn min_followers(mut self, count: u32) -> Self {
        self.min_followers = Some(count);
        self
    }

    pub fn matches(&self, user: &User) -> bool {
        if let Some(id) = self.exclude_id {
            if user.id == id {
                return false;
            }
        }
        if let Some(ids) = &self.id_in {
            if !ids.contains(&user.id) {
                return false;
            }
        }
        if let Some(categories) = &self.interests_any {
            if !user.interests.iter().any(|i| categories.contains(i)) {
                return false;
            }
        }
        if let Some(min) = self.min_followers {
            if user.follower_count < min {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    /// Store insertion order.
    Unsorted,
    NewestFirst,
    MostLiked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSort {
    Unsorted,
    FollowersDesc,
}

/// Read-only query surface the engine consumes. Point lookups plus
/// filtered, sorted, limited scans; no transactions or joins.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_posts(
        &self,
        filter: &PostFilter,
        sort: PostSort,
        limit: usize,
    ) -> Result<Vec<Post>>;

    async fn find_users(
        &self,
        filter: &UserFilter,
        sort: UserSort,
        limit: usize,
    ) -> Result<Vec<User>>;

    /// Post ids already shown to the user. Malformed ids in the
    /// underlying history are dropped, not surfaced.
    async fn seen_posts(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;
}
