use hashbrown::HashMap;
use itertools::Itertools;
use num_format::{Locale, ToFormattedString};
use rayon::prelude::*;
use tracing::info;

pub type UserId = u64;
pub type ItemId = u64;
pub type Rating = f64;

/// Stand-in rating for a purchase without an explicit review.
pub const IMPLICIT_FEEDBACK_RATING: Rating = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: Rating,
}

impl Interaction {
    pub fn new(user_id: UserId, item_id: ItemId, rating: Rating) -> Self {
        Interaction {
            user_id,
            item_id,
            rating,
        }
    }
}

/// Reads explicit ratings as tab-separated `user_id item_id rating` records.
pub fn read_ratings(ratings_path: &str) -> anyhow::Result<Vec<(UserId, ItemId, Rating)>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(ratings_path)?;

    let mut ratings = Vec::new();
    for result in reader.deserialize() {
        let record: (UserId, ItemId, Rating) = result?;
        ratings.push(record);
    }
    Ok(ratings)
}

/// Reads purchase events as tab-separated `user_id item_id` records.
pub fn read_purchases(purchases_path: &str) -> anyhow::Result<Vec<(UserId, ItemId)>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(purchases_path)?;

    let mut purchases = Vec::new();
    for result in reader.deserialize() {
        let record: (UserId, ItemId) = result?;
        purchases.push(record);
    }
    Ok(purchases)
}

/// Collapses raw rating events to one averaged rating per (user, item) pair.
pub fn average_ratings(ratings: &[(UserId, ItemId, Rating)]) -> HashMap<(UserId, ItemId), Rating> {
    ratings
        .iter()
        .map(|&(user_id, item_id, rating)| ((user_id, item_id), rating))
        .into_group_map()
        .into_iter()
        .map(|(pair, values)| {
            let avg = values.iter().sum::<Rating>() / values.len() as Rating;
            (pair, avg)
        })
        .collect()
}

/// Assembles the full interaction snapshot handed to a fit: one logical
/// interaction per (user, item) pair. Explicit ratings win over purchases;
/// a purchased pair without a rating contributes implicit feedback.
pub fn interaction_snapshot(
    ratings: &HashMap<(UserId, ItemId), Rating>,
    purchases: &[(UserId, ItemId)],
) -> Vec<Interaction> {
    let mut interactions: Vec<Interaction> = ratings
        .iter()
        .map(|(&(user_id, item_id), &rating)| Interaction::new(user_id, item_id, rating))
        .collect();

    for (user_id, item_id) in purchases.iter().copied().unique() {
        if !ratings.contains_key(&(user_id, item_id)) {
            interactions.push(Interaction::new(user_id, item_id, IMPLICIT_FEEDBACK_RATING));
        }
    }

    interactions
}

pub fn log_snapshot_stats(descriptive_name: &str, interactions: &[Interaction]) {
    let mut user_ids: Vec<UserId> = interactions
        .par_iter()
        .map(|interaction| interaction.user_id)
        .collect();
    user_ids.par_sort_unstable();
    user_ids.dedup();

    let mut item_ids: Vec<ItemId> = interactions
        .par_iter()
        .map(|interaction| interaction.item_id)
        .collect();
    item_ids.par_sort_unstable();
    item_ids.dedup();

    info!("Loaded {}", descriptive_name);
    info!(
        "\tInteractions: {}",
        interactions.len().to_formatted_string(&Locale::en)
    );
    info!(
        "\tUsers: {}",
        user_ids.len().to_formatted_string(&Locale::en)
    );
    info!(
        "\tItems: {}",
        item_ids.len().to_formatted_string(&Locale::en)
    );
}

#[cfg(test)]
mod io_test {
    use super::*;

    #[test]
    fn should_average_duplicate_ratings() {
        let ratings = vec![(1, 10, 5.0), (1, 10, 3.0), (2, 10, 2.0)];

        let averaged = average_ratings(&ratings);

        assert_eq!(2, averaged.len());
        assert_eq!(4.0, averaged[&(1, 10)]);
        assert_eq!(2.0, averaged[&(2, 10)]);
    }

    #[test]
    fn should_keep_explicit_rating_for_purchased_pairs() {
        let mut ratings = HashMap::new();
        ratings.insert((1, 10), 2.0);
        let purchases = vec![(1, 10), (1, 20), (1, 20)];

        let mut snapshot = interaction_snapshot(&ratings, &purchases);
        snapshot.sort_by_key(|interaction| (interaction.user_id, interaction.item_id));

        assert_eq!(
            vec![
                Interaction::new(1, 10, 2.0),
                Interaction::new(1, 20, IMPLICIT_FEEDBACK_RATING),
            ],
            snapshot
        );
    }

    #[test]
    fn should_emit_one_implicit_interaction_per_purchased_pair() {
        let ratings = HashMap::new();
        let purchases = vec![(7, 10), (7, 10), (7, 10)];

        let snapshot = interaction_snapshot(&ratings, &purchases);

        assert_eq!(vec![Interaction::new(7, 10, 4.0)], snapshot);
    }
}
