use chrono::{NaiveDateTime, Utc};
use hashbrown::HashMap;
use once_cell::sync::OnceCell;

use crate::error::RecommendError;
use crate::io::{Interaction, Rating};
use crate::itemknn::similarity::{Axis, PairwiseSimilarity, SimilarityMatrix};

/// Bijection between external ids and dense matrix indices. Rebuilt from
/// scratch on every fit; indices are assigned over the sorted distinct ids so
/// the assignment is reproducible.
pub struct IdIndex {
    index_of: HashMap<u64, usize>,
    id_of: Vec<u64>,
}

impl IdIndex {
    fn from_observed(mut ids: Vec<u64>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        let index_of = ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();
        IdIndex {
            index_of,
            id_of: ids,
        }
    }

    pub fn index_of(&self, id: u64) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    pub fn id_at(&self, index: usize) -> u64 {
        self.id_of[index]
    }

    pub fn len(&self) -> usize {
        self.id_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_of.is_empty()
    }
}

/// Dense row-major `users x items` matrix. A cell holds the rating of the
/// interaction, or 0.0 for absence; ratings are >= 1.0 so the two never
/// collide.
pub struct InteractionMatrix {
    values: Vec<Rating>,
    n_users: usize,
    n_items: usize,
}

impl InteractionMatrix {
    fn zeroed(n_users: usize, n_items: usize) -> Self {
        InteractionMatrix {
            values: vec![0.0; n_users * n_items],
            n_users,
            n_items,
        }
    }

    fn set(&mut self, user_index: usize, item_index: usize, rating: Rating) {
        self.values[user_index * self.n_items + item_index] = rating;
    }

    pub fn user_row(&self, user_index: usize) -> &[Rating] {
        let offset = user_index * self.n_items;
        &self.values[offset..offset + self.n_items]
    }

    pub fn item_vector(&self, item_index: usize) -> Vec<Rating> {
        (0..self.n_users)
            .map(|user_index| self.values[user_index * self.n_items + item_index])
            .collect()
    }

    /// Row or column vectors for pairwise similarity over the given axis.
    pub fn axis_vectors(&self, axis: Axis) -> Vec<Vec<Rating>> {
        match axis {
            Axis::Users => (0..self.n_users)
                .map(|user_index| self.user_row(user_index).to_vec())
                .collect(),
            Axis::Items => (0..self.n_items)
                .map(|item_index| self.item_vector(item_index))
                .collect(),
        }
    }

    pub fn n_users(&self) -> usize {
        self.n_users
    }

    pub fn n_items(&self) -> usize {
        self.n_items
    }
}

/// The immutable result of one fit. A refit builds a brand-new state and
/// never touches a previous one, so concurrent readers always see one
/// internally consistent snapshot.
pub struct FittedState {
    matrix: InteractionMatrix,
    users: IdIndex,
    items: IdIndex,
    similarities: OnceCell<SimilarityMatrix>,
    fitted_at: NaiveDateTime,
    qty_interactions: usize,
}

impl FittedState {
    pub fn build(interactions: &[Interaction]) -> Result<FittedState, RecommendError> {
        if interactions.is_empty() {
            return Err(RecommendError::NoInteractions);
        }

        let users = IdIndex::from_observed(
            interactions
                .iter()
                .map(|interaction| interaction.user_id)
                .collect(),
        );
        let items = IdIndex::from_observed(
            interactions
                .iter()
                .map(|interaction| interaction.item_id)
                .collect(),
        );

        let mut matrix = InteractionMatrix::zeroed(users.len(), items.len());
        for interaction in interactions {
            // The maps were built from this input, lookups cannot miss.
            let user_index = users.index_of(interaction.user_id).unwrap();
            let item_index = items.index_of(interaction.item_id).unwrap();
            // Duplicate (user, item) pairs overwrite: last write wins.
            matrix.set(user_index, item_index, interaction.rating);
        }

        Ok(FittedState {
            matrix,
            users,
            items,
            similarities: OnceCell::new(),
            fitted_at: Utc::now().naive_utc(),
            qty_interactions: interactions.len(),
        })
    }

    /// The item-item similarity matrix for this state. Computed on first use,
    /// memoized for the lifetime of the state.
    pub fn item_similarities(&self, backend: &dyn PairwiseSimilarity) -> &SimilarityMatrix {
        self.similarities
            .get_or_init(|| backend.pairwise(&self.matrix, Axis::Items))
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    pub fn users(&self) -> &IdIndex {
        &self.users
    }

    pub fn items(&self) -> &IdIndex {
        &self.items
    }

    pub fn fitted_at(&self) -> NaiveDateTime {
        self.fitted_at
    }

    pub fn qty_interactions(&self) -> usize {
        self.qty_interactions
    }
}

#[cfg(test)]
mod interaction_matrix_test {
    use super::*;
    use crate::itemknn::similarity::ReferenceBackend;

    fn example_interactions() -> Vec<Interaction> {
        vec![
            Interaction::new(1, 10, 5.0),
            Interaction::new(1, 20, 1.0),
            Interaction::new(2, 10, 4.0),
            Interaction::new(2, 20, 5.0),
            Interaction::new(3, 20, 3.0),
        ]
    }

    #[test]
    fn should_fail_without_interactions() {
        let result = FittedState::build(&[]);

        assert_eq!(Some(RecommendError::NoInteractions), result.err());
    }

    #[test]
    fn should_index_sorted_distinct_ids() {
        let state = FittedState::build(&example_interactions()).unwrap();

        assert_eq!(3, state.users().len());
        assert_eq!(2, state.items().len());
        assert_eq!(Some(0), state.users().index_of(1));
        assert_eq!(Some(2), state.users().index_of(3));
        assert_eq!(None, state.users().index_of(99));
        assert_eq!(10, state.items().id_at(0));
        assert_eq!(20, state.items().id_at(1));
    }

    #[test]
    fn should_build_item_vectors_over_users() {
        let state = FittedState::build(&example_interactions()).unwrap();

        assert_eq!(vec![5.0, 4.0, 0.0], state.matrix().item_vector(0));
        assert_eq!(vec![1.0, 5.0, 3.0], state.matrix().item_vector(1));
        assert_eq!(&[5.0, 1.0], state.matrix().user_row(0));
        assert_eq!(&[0.0, 3.0], state.matrix().user_row(2));
    }

    #[test]
    fn should_overwrite_duplicate_pairs_last_write_wins() {
        let interactions = vec![
            Interaction::new(1, 10, 2.0),
            Interaction::new(1, 10, 5.0),
        ];

        let state = FittedState::build(&interactions).unwrap();

        assert_eq!(vec![5.0], state.matrix().item_vector(0));
    }

    #[test]
    fn should_memoize_similarities_per_state() {
        let state = FittedState::build(&example_interactions()).unwrap();
        let backend = ReferenceBackend;

        let first = state.item_similarities(&backend);
        let second = state.item_similarities(&backend);

        assert!(std::ptr::eq(first, second));
    }
}
