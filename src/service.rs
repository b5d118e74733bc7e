use std::sync::{Arc, RwLock};
use std::time::Instant;

use hashbrown::HashMap;
use rayon::prelude::*;
use tracing::info;

use crate::error::RecommendError;
use crate::io::{Interaction, UserId};
use crate::itemknn::interaction_matrix::FittedState;
use crate::itemknn::similarity::PairwiseSimilarity;
use crate::itemknn::{self, ItemScore};

/// Serving facade around the engine. Holds the single reference readers
/// contend on: a fitted state, once built, is immutable, and a refit installs
/// a complete replacement with one swap. Readers never observe a partially
/// rebuilt matrix and never block on a running refit.
pub struct RecommenderService {
    backend: Box<dyn PairwiseSimilarity>,
    min_similarity: f64,
    state: RwLock<Option<Arc<FittedState>>>,
}

impl RecommenderService {
    pub fn new(backend: Box<dyn PairwiseSimilarity>, min_similarity: f64) -> Self {
        RecommenderService {
            backend,
            min_similarity,
            state: RwLock::new(None),
        }
    }

    /// Fits a new state from the full interaction snapshot and swaps it in.
    /// The similarity matrix is warmed before the swap so no live request
    /// pays for it. On failure the previous state keeps serving.
    pub fn fit(&self, interactions: &[Interaction]) -> Result<(), RecommendError> {
        let start_time = Instant::now();
        let state = FittedState::build(interactions)?;
        state.item_similarities(self.backend.as_ref());
        let qty_users = state.users().len();
        let qty_items = state.items().len();
        *self.state.write().unwrap() = Some(Arc::new(state));
        info!(
            "fitted {} users x {} items from {} interactions in {} micros",
            qty_users,
            qty_items,
            interactions.len(),
            start_time.elapsed().as_micros()
        );
        Ok(())
    }

    fn current_state(&self) -> Result<Arc<FittedState>, RecommendError> {
        self.state
            .read()
            .unwrap()
            .clone()
            .ok_or(RecommendError::NotFitted)
    }

    /// The currently served snapshot, if any. The guard is held for the
    /// reference clone only.
    pub fn fitted_state(&self) -> Option<Arc<FittedState>> {
        self.state.read().unwrap().clone()
    }

    pub fn recommend(
        &self,
        user_id: UserId,
        how_many: usize,
    ) -> Result<Vec<ItemScore>, RecommendError> {
        let state = self.current_state()?;
        Ok(itemknn::predict(
            &state,
            self.backend.as_ref(),
            user_id,
            how_many,
            self.min_similarity,
        ))
    }

    /// Per-user recommendations, computed independently in parallel. Each
    /// user only reads the shared state, there is no cross-user scratch
    /// state.
    pub fn batch_recommend(
        &self,
        user_ids: &[UserId],
        how_many: usize,
    ) -> Result<HashMap<UserId, Vec<ItemScore>>, RecommendError> {
        let state = self.current_state()?;
        let results = user_ids
            .par_iter()
            .map(|&user_id| {
                (
                    user_id,
                    itemknn::predict(
                        &state,
                        self.backend.as_ref(),
                        user_id,
                        how_many,
                        self.min_similarity,
                    ),
                )
            })
            .collect();
        Ok(results)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
