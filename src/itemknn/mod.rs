use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::io::{ItemId, UserId};
use crate::itemknn::interaction_matrix::FittedState;
use crate::itemknn::similarity::PairwiseSimilarity;

pub mod interaction_matrix;
pub mod popularity;
pub mod similarity;

#[derive(PartialEq, Debug, Clone)]
pub struct ItemScore {
    pub id: ItemId,
    pub score: f64,
}

impl ItemScore {
    pub fn new(id: ItemId, score: f64) -> Self {
        ItemScore { id, score }
    }
}

impl Eq for ItemScore {}

impl Ord for ItemScore {
    fn cmp(&self, other: &Self) -> Ordering {
        // reverse order by score; equal scores order by ascending item id so
        // rankings are reproducible
        match self.score.partial_cmp(&other.score) {
            Some(Ordering::Less) => Ordering::Greater,
            Some(Ordering::Greater) => Ordering::Less,
            _ => self.id.cmp(&other.id),
        }
    }
}

impl PartialOrd for ItemScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scores every item the user has not rated via the similarity-weighted
/// average of the user's known ratings, and returns the top `how_many` by
/// descending score. Unknown users get an empty result, they are a normal
/// case, not an error.
pub fn predict(
    state: &FittedState,
    backend: &dyn PairwiseSimilarity,
    user_id: UserId,
    how_many: usize,
    min_similarity: f64,
) -> Vec<ItemScore> {
    if how_many == 0 {
        return Vec::new();
    }

    let user_index = match state.users().index_of(user_id) {
        Some(index) => index,
        None => return Vec::new(),
    };

    let user_ratings = state.matrix().user_row(user_index);
    let rated: Vec<usize> = user_ratings
        .iter()
        .enumerate()
        .filter(|(_, &rating)| rating > 0.0)
        .map(|(item_index, _)| item_index)
        .collect();

    let similarities = state.item_similarities(backend);

    let mut top_items: BinaryHeap<ItemScore> = BinaryHeap::with_capacity(how_many);
    for target_index in 0..state.matrix().n_items() {
        if user_ratings[target_index] > 0.0 {
            continue;
        }

        let mut similarity_sum = 0.0;
        let mut weighted_sum = 0.0;
        for &rated_index in rated.iter() {
            let similarity = similarities.at(target_index, rated_index);
            if similarity > min_similarity {
                similarity_sum += similarity;
                weighted_sum += user_ratings[rated_index] * similarity;
            }
        }

        // No qualifying neighbors means no prediction, not a zero prediction.
        if similarity_sum <= 0.0 {
            continue;
        }
        let score = weighted_sum / similarity_sum;
        if score <= 0.0 {
            continue;
        }

        let scored_item = ItemScore::new(state.items().id_at(target_index), score);
        if top_items.len() < how_many {
            top_items.push(scored_item);
        } else {
            let mut bottom = top_items.peek_mut().unwrap();
            if scored_item < *bottom {
                // ordering is reverse thus, the scored item outranks the
                // current bottom of the heap.
                *bottom = scored_item;
            }
        }
    }

    top_items.into_sorted_vec()
}

#[cfg(test)]
mod predict_test {
    use super::*;
    use crate::io::Interaction;
    use crate::itemknn::similarity::ReferenceBackend;
    use float_cmp::approx_eq;

    fn example_state() -> FittedState {
        FittedState::build(&[
            Interaction::new(1, 10, 5.0),
            Interaction::new(1, 20, 1.0),
            Interaction::new(2, 10, 4.0),
            Interaction::new(2, 20, 5.0),
            Interaction::new(3, 20, 3.0),
        ])
        .unwrap()
    }

    #[test]
    fn should_predict_the_worked_example() {
        let state = example_state();

        let recommendations = predict(&state, &ReferenceBackend, 3, 5, 0.0);

        // User 3 rated item 20 only; item 10 has one qualifying neighbor, so
        // the weighted average collapses to the user's rating of item 20.
        assert_eq!(1, recommendations.len());
        assert_eq!(10, recommendations[0].id);
        assert!(approx_eq!(f64, 3.0, recommendations[0].score, epsilon = 1e-12));
    }

    #[test]
    fn should_return_empty_for_unknown_users() {
        let state = example_state();

        assert!(predict(&state, &ReferenceBackend, 99, 5, 0.0).is_empty());
    }

    #[test]
    fn should_return_empty_for_zero_how_many() {
        let state = example_state();

        assert!(predict(&state, &ReferenceBackend, 3, 0, 0.0).is_empty());
    }

    #[test]
    fn should_never_recommend_rated_items() {
        let state = example_state();

        for user_id in [1, 2, 3] {
            let user_index = state.users().index_of(user_id).unwrap();
            let user_ratings = state.matrix().user_row(user_index).to_vec();
            let recommendations = predict(&state, &ReferenceBackend, user_id, 10, 0.0);

            assert!(recommendations.len() <= 10);
            for scored in recommendations.iter() {
                let item_index = state.items().index_of(scored.id).unwrap();
                assert_eq!(0.0, user_ratings[item_index]);
            }
        }
    }

    #[test]
    fn should_exclude_items_above_min_similarity_threshold() {
        let state = example_state();

        // sim(item 10, item 20) is roughly 0.66, a higher threshold leaves no
        // qualifying neighbor for the unseen item.
        let recommendations = predict(&state, &ReferenceBackend, 3, 5, 0.9);

        assert!(recommendations.is_empty());
    }

    #[test]
    fn should_respect_how_many() {
        let state = FittedState::build(&[
            Interaction::new(1, 10, 5.0),
            Interaction::new(1, 20, 4.0),
            Interaction::new(1, 30, 3.0),
            Interaction::new(2, 10, 5.0),
            Interaction::new(2, 40, 4.0),
            Interaction::new(2, 50, 2.0),
            Interaction::new(3, 10, 4.0),
        ])
        .unwrap();

        let recommendations = predict(&state, &ReferenceBackend, 3, 2, 0.0);

        assert_eq!(2, recommendations.len());
        assert!(recommendations[0].score >= recommendations[1].score);
    }

    #[test]
    fn should_break_score_ties_by_ascending_item_id() {
        let mut recommendations: BinaryHeap<ItemScore> = BinaryHeap::new();
        recommendations.push(ItemScore::new(30, 2.5));
        recommendations.push(ItemScore::new(20, 4.0));
        recommendations.push(ItemScore::new(10, 2.5));

        let ranked: Vec<u64> = recommendations
            .into_sorted_vec()
            .iter()
            .map(|scored| scored.id)
            .collect();

        assert_eq!(vec![20, 10, 30], ranked);
    }

    #[test]
    fn handle_reverse_ordering_itemscore() {
        let largest = ItemScore::new(123, 5000 as f64);
        let middle = ItemScore::new(234, 100 as f64);
        let smallest = ItemScore::new(543, 1 as f64);
        let items = vec![largest, smallest, middle];

        let how_many = 2;
        let mut top_items: BinaryHeap<ItemScore> = BinaryHeap::with_capacity(how_many);

        for scored_item in items.into_iter() {
            if top_items.len() < how_many {
                top_items.push(scored_item);
            } else {
                let mut bottom = top_items.peek_mut().unwrap();
                if scored_item < *bottom {
                    *bottom = scored_item;
                }
            }
        }

        // the results are the top `how_many` in reverse order
        assert_eq!(234, top_items.pop().unwrap().id);
        assert_eq!(123, top_items.pop().unwrap().id);
    }
}
