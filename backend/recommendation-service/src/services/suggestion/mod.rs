use crate::models::{SuggestedUser, SuggestionReason, User};
use crate::store::{DataStore, UserFilter, UserSort};
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Follower count floor for the popularity fallback tier.
const POPULARITY_MIN_FOLLOWERS: u32 = 10;
/// How many popular users the fallback tier scans.
const POPULARITY_SCAN_LIMIT: usize = 50;

/// Three-tier "who to follow" scorer, independent of the trained model:
/// shared interests first, then friend-of-friend, then a popularity
/// fallback. Later tiers are consulted only while the accumulated list
/// is below the requested limit; duplicates are dropped across tiers.
pub struct UserAffinityRanker {
    store: Arc<dyn DataStore>,
}

impl UserAffinityRanker {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn suggest(&self, user: &User, limit: usize) -> Result<Vec<SuggestedUser>> {
        let following: HashSet<Uuid> = user.following.iter().copied().collect();
        let interests: HashSet<Uuid> = user.interests.iter().copied().collect();

        let mut suggested: Vec<SuggestedUser> = Vec::new();
        let mut seen_ids: HashSet<Uuid> = HashSet::new();

        self.interest_tier(user, &following, &interests, &mut suggested, &mut seen_ids)
            .await?;

        if suggested.len() < limit {
            self.friend_of_friend_tier(user, &following, &interests, &mut suggested, &mut seen_ids)
                .await?;
        }

        if suggested.len() < limit {
            self.popularity_tier(user, &following, &interests, &mut suggested, &mut seen_ids)
                .await?;
        }

        debug!(
            user_id = %user.id,
            candidates = suggested.len(),
            "User suggestion tiers evaluated"
        );

        suggested.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        suggested.truncate(limit);
        Ok(suggested)
    }

    /// Tier 1: users sharing at least one interest, weighted 80%
    /// overlap / 20% capped follower count.
    async fn interest_tier(
        &self,
        user: &User,
        following: &HashSet<Uuid>,
        interests: &HashSet<Uuid>,
        suggested: &mut Vec<SuggestedUser>,
        seen_ids: &mut HashSet<Uuid>,
    ) -> Result<()> {
        if user.interests.is_empty() {
            return Ok(());
        }

        let candidates = self
            .store
            .find_users(
                &UserFilter::default()
                    .excluding_user(user.id)
                    .interested_in_any(user.interests.clone()),
                UserSort::Unsorted,
                usize::MAX,
            )
            .await?;

        for candidate in candidates {
            if following.contains(&candidate.id) {
                continue;
            }
            let overlap = shared_interests(&candidate, interests);
            if overlap == 0 {
                continue;
            }

            let follower_score = (candidate.follower_count as f64 / 1000.0).min(1.0);
            let score = overlap as f64 * 0.8 + follower_score * 0.2;
            push_suggestion(
                suggested,
                seen_ids,
                candidate,
                overlap,
                score,
                SuggestionReason::SimilarInterests,
            );
        }
        Ok(())
    }

    /// Tier 2: users followed by the requester's followees. Base 0.3
    /// plus small interest and follower bonuses.
    async fn friend_of_friend_tier(
        &self,
        user: &User,
        following: &HashSet<Uuid>,
        interests: &HashSet<Uuid>,
        suggested: &mut Vec<SuggestedUser>,
        seen_ids: &mut HashSet<Uuid>,
    ) -> Result<()> {
        if user.following.is_empty() {
            return Ok(());
        }

        let followees = self
            .store
            .find_users(
                &UserFilter::default().among(user.following.clone()),
                UserSort::Unsorted,
                usize::MAX,
            )
            .await?;

        let mut fof_ids: Vec<Uuid> = Vec::new();
        let mut fof_seen: HashSet<Uuid> = HashSet::new();
        for followee in &followees {
            for &candidate_id in &followee.following {
                if candidate_id == user.id || following.contains(&candidate_id) {
                    continue;
                }
                if fof_seen.insert(candidate_id) {
                    fof_ids.push(candidate_id);
                }
            }
        }
        if fof_ids.is_empty() {
            return Ok(());
        }

        let candidates = self
            .store
            .find_users(
                &UserFilter::default().among(fof_ids),
                UserSort::Unsorted,
                usize::MAX,
            )
            .await?;

        for candidate in candidates {
            if seen_ids.contains(&candidate.id) {
                continue;
            }
            let overlap = shared_interests(&candidate, interests);
            let follower_bonus = (candidate.follower_count as f64 / 2000.0).min(0.2);
            let score = 0.3 + overlap as f64 * 0.1 + follower_bonus;
            push_suggestion(
                suggested,
                seen_ids,
                candidate,
                overlap,
                score,
                SuggestionReason::FollowedByFriends,
            );
        }
        Ok(())
    }

    /// Tier 3: the most-followed users, kept only when they share an
    /// interest or are very widely followed.
    async fn popularity_tier(
        &self,
        user: &User,
        following: &HashSet<Uuid>,
        interests: &HashSet<Uuid>,
        suggested: &mut Vec<SuggestedUser>,
        seen_ids: &mut HashSet<Uuid>,
    ) -> Result<()> {
        let candidates = self
            .store
            .find_users(
                &UserFilter::default()
                    .excluding_user(user.id)
                    .min_followers(POPULARITY_MIN_FOLLOWERS),
                UserSort::FollowersDesc,
                POPULARITY_SCAN_LIMIT,
            )
            .await?;

        for candidate in candidates {
            if following.contains(&candidate.id) || seen_ids.contains(&candidate.id) {
                continue;
            }
            let overlap = shared_interests(&candidate, interests);
            if overlap == 0 && candidate.follower_count <= 1000 {
                continue;
            }

            let follower_score = (candidate.follower_count as f64 / 5000.0).min(0.4);
            let score = follower_score + overlap as f64 * 0.1;
            push_suggestion(
                suggested,
                seen_ids,
                candidate,
                overlap,
                score,
                SuggestionReason::PopularInInterests,
            );
        }
        Ok(())
    }
}

fn shared_interests(candidate: &User, interests: &HashSet<Uuid>) -> usize {
    candidate
        .interests
        .iter()
        .filter(|i| interests.contains(i))
        .count()
}

fn push_suggestion(
    suggested: &mut Vec<SuggestedUser>,
    seen_ids: &mut HashSet<Uuid>,
    candidate: User,
    shared_interests: usize,
    score: f64,
    reason: SuggestionReason,
) {
    if !seen_ids.insert(candidate.id) {
        return;
    }
    suggested.push(SuggestedUser {
        user_id: candidate.id,
        username: candidate.username,
        full_name: candidate.full_name,
        bio: candidate.bio,
        profile_picture: candidate.profile_picture,
        follower_count: candidate.follower_count,
        following_count: candidate.following_count,
        is_verified: candidate.is_verified,
        shared_interests,
        score,
        recommendation_reason: reason,
    });
}
