use std::sync::{Arc, Mutex};

use hashbrown::HashMap;

use crate::error::RatingError;
use crate::io::{self, Interaction, ItemId, Rating, UserId};
use crate::itemknn::popularity::PopularityRank;
use crate::service::RecommenderService;
use crate::stopwatch::Stopwatch;

pub const MIN_RATING: Rating = 1.0;
pub const MAX_RATING: Rating = 5.0;

/// Rating-submission boundary check. The core trusts its input range, so
/// anything outside [1, 5] is rejected here with a typed error.
pub fn validate_rating(value: f64) -> Result<Rating, RatingError> {
    if !value.is_finite() || value < MIN_RATING || value > MAX_RATING {
        return Err(RatingError::OutOfRange {
            value,
            min: MIN_RATING,
            max: MAX_RATING,
        });
    }
    Ok(value)
}

struct StoreInner {
    ratings: HashMap<(UserId, ItemId), Rating>,
    purchases: Vec<(UserId, ItemId)>,
}

/// In-memory source of truth for interactions on the serving side. Holds one
/// aggregated rating per (user, item) pair plus the raw purchase events, and
/// hands out full snapshots for refits.
pub struct InteractionStore {
    inner: Mutex<StoreInner>,
}

impl InteractionStore {
    pub fn new(ratings: &[(UserId, ItemId, Rating)], purchases: &[(UserId, ItemId)]) -> Self {
        let inner = StoreInner {
            ratings: io::average_ratings(ratings),
            purchases: purchases.to_vec(),
        };
        InteractionStore {
            inner: Mutex::new(inner),
        }
    }

    /// Stores a validated rating, replacing any previous rating by the same
    /// user for the same item.
    pub fn put_rating(
        &self,
        user_id: UserId,
        item_id: ItemId,
        rating: f64,
    ) -> Result<(), RatingError> {
        let rating = validate_rating(rating)?;
        self.inner
            .lock()
            .unwrap()
            .ratings
            .insert((user_id, item_id), rating);
        Ok(())
    }

    /// The full current interaction set, one logical interaction per
    /// (user, item) pair, ready to be fitted.
    pub fn snapshot(&self) -> Vec<Interaction> {
        let inner = self.inner.lock().unwrap();
        io::interaction_snapshot(&inner.ratings, &inner.purchases)
    }
}

pub struct SharedHandlesAndConfig {
    pub store: Arc<InteractionStore>,
    pub recommender: Arc<RecommenderService>,
    pub popularity_rank: Arc<PopularityRank>,
    pub recommend_stopwatch: Arc<Mutex<Stopwatch>>,
    pub num_items_to_recommend: usize,
    pub min_personalized_results: usize,
    pub qty_workers: usize,
}

#[cfg(test)]
mod store_test {
    use super::*;

    #[test]
    fn should_accept_ratings_within_bounds() {
        assert_eq!(Ok(1.0), validate_rating(1.0));
        assert_eq!(Ok(5.0), validate_rating(5.0));
        assert_eq!(Ok(3.5), validate_rating(3.5));
    }

    #[test]
    fn should_reject_ratings_outside_bounds() {
        assert!(validate_rating(0.9).is_err());
        assert!(validate_rating(5.1).is_err());
        assert!(validate_rating(f64::NAN).is_err());
        assert!(validate_rating(f64::INFINITY).is_err());
    }

    #[test]
    fn should_replace_a_users_previous_rating() {
        let store = InteractionStore::new(&[(1, 10, 2.0)], &[]);

        store.put_rating(1, 10, 5.0).unwrap();

        assert_eq!(vec![Interaction::new(1, 10, 5.0)], store.snapshot());
    }

    #[test]
    fn should_not_store_an_invalid_rating() {
        let store = InteractionStore::new(&[(1, 10, 2.0)], &[]);

        assert!(store.put_rating(1, 10, 9.0).is_err());

        assert_eq!(vec![Interaction::new(1, 10, 2.0)], store.snapshot());
    }

    #[test]
    fn snapshot_should_combine_ratings_and_purchases() {
        let store = InteractionStore::new(&[(1, 10, 2.0)], &[(1, 10), (2, 20)]);

        let mut snapshot = store.snapshot();
        snapshot.sort_by_key(|interaction| (interaction.user_id, interaction.item_id));

        assert_eq!(
            vec![
                Interaction::new(1, 10, 2.0),
                Interaction::new(2, 20, io::IMPLICIT_FEEDBACK_RATING),
            ],
            snapshot
        );
    }
}
