use crate::models::Interaction;
use ndarray::Array1;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Seam between the model and its feature representation. The shipped
/// implementation is identity one-hot; hashing- or embedding-based
/// encoders can replace it without touching retrieval or blending.
pub trait FeatureEncoder: Send + Sync {
    fn user_dims(&self) -> usize;
    fn post_dims(&self) -> usize;

    /// Encode one (user, post) pair as a dense feature vector of
    /// `user_dims + post_dims` columns. Identities unseen at fit time
    /// activate no column.
    fn encode(&self, user_id: Uuid, post_id: Uuid) -> Array1<f64>;

    fn knows_user(&self, user_id: Uuid) -> bool;
}

/// One-hot vocabularies over the distinct user and post identities seen
/// during the last fit. Columns are assigned in sorted id order so the
/// representation is deterministic for a given sample set.
pub struct IdentityOneHotEncoder {
    users: HashMap<Uuid, usize>,
    posts: HashMap<Uuid, usize>,
}

impl IdentityOneHotEncoder {
    pub fn fit(interactions: &[Interaction]) -> Self {
        let user_ids: BTreeSet<Uuid> = interactions.iter().map(|i| i.user_id).collect();
        let post_ids: BTreeSet<Uuid> = interactions.iter().map(|i| i.post_id).collect();

        Self {
            users: user_ids.into_iter().enumerate().map(|(c, id)| (id, c)).collect(),
            posts: post_ids.into_iter().enumerate().map(|(c, id)| (id, c)).collect(),
        }
    }
}

impl FeatureEncoder for IdentityOneHotEncoder {
    fn user_dims(&self) -> usize {
        self.users.len()
    }

    fn post_dims(&self) -> usize {
        self.posts.len()
    }

    fn encode(&self, user_id: Uuid, post_id: Uuid) -> Array1<f64> {
        let mut features = Array1::zeros(self.users.len() + self.posts.len());
        if let Some(&column) = self.users.get(&user_id) {
            features[column] = 1.0;
        }
        if let Some(&column) = self.posts.get(&post_id) {
            features[self.users.len() + column] = 1.0;
        }
        features
    }

    fn knows_user(&self, user_id: Uuid) -> bool {
        self.users.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(user_id: Uuid, post_id: Uuid, label: bool) -> Interaction {
        Interaction {
            user_id,
            post_id,
            label,
        }
    }

    #[test]
    fn vocabulary_covers_distinct_ids() {
        let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let posts: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let samples = vec![
            interaction(users[0], posts[0], true),
            interaction(users[1], posts[0], false),
            interaction(users[2], posts[1], true),
            interaction(users[0], posts[1], false),
        ];

        let encoder = IdentityOneHotEncoder::fit(&samples);
        assert_eq!(encoder.user_dims(), 3);
        assert_eq!(encoder.post_dims(), 2);
    }

    #[test]
    fn known_pair_activates_exactly_two_columns() {
        let user = Uuid::new_v4();
        let post = Uuid::new_v4();
        let encoder = IdentityOneHotEncoder::fit(&[interaction(user, post, true)]);

        let features = encoder.encode(user, post);
        assert_eq!(features.len(), 2);
        assert_eq!(features.sum(), 2.0);
    }

    #[test]
    fn unknown_identity_activates_nothing() {
        let encoder =
            IdentityOneHotEncoder::fit(&[interaction(Uuid::new_v4(), Uuid::new_v4(), true)]);

        let features = encoder.encode(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(features.sum(), 0.0);
        assert!(!encoder.knows_user(Uuid::new_v4()));
    }
}
