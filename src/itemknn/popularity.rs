use std::cmp::Ordering;

use dary_heap::OctonaryHeap;
use hashbrown::HashMap;

use crate::io::{ItemId, UserId};
use crate::itemknn::ItemScore;

/// Sentinel score marking an item that was appended from the popularity rank
/// rather than predicted.
pub const FALLBACK_SCORE: f64 = 0.0;

#[derive(Eq, PartialEq, Debug)]
struct RankedItem {
    id: ItemId,
    qty_purchases: usize,
}

impl Ord for RankedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // reverse order by purchase count, ties by ascending item id
        match other.qty_purchases.cmp(&self.qty_purchases) {
            Ordering::Equal => self.id.cmp(&other.id),
            ordering => ordering,
        }
    }
}

impl PartialOrd for RankedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Items ranked by purchase frequency, most popular first. Rebuilt from the
/// purchase snapshot; the serving layer consults it when personalized output
/// is too short.
pub struct PopularityRank {
    ranked: Vec<ItemId>,
}

impl PopularityRank {
    pub fn new(purchases: &[(UserId, ItemId)], length: usize) -> PopularityRank {
        if length == 0 {
            return PopularityRank { ranked: Vec::new() };
        }

        let mut qty_purchases: HashMap<ItemId, usize> = HashMap::with_capacity(purchases.len());
        for (_user_id, item_id) in purchases.iter() {
            let counter = qty_purchases.entry(*item_id).or_insert(0);
            *counter += 1;
        }

        let mut top_items = OctonaryHeap::<RankedItem>::with_capacity(length);
        for (id, qty_purchases) in qty_purchases.into_iter() {
            let candidate = RankedItem { id, qty_purchases };
            if top_items.len() < length {
                top_items.push(candidate);
            } else {
                let mut bottom = top_items.peek_mut().unwrap();
                if candidate < *bottom {
                    *bottom = candidate;
                }
            }
        }

        let ranked = top_items
            .into_sorted_vec()
            .iter()
            .map(|ranked_item| ranked_item.id)
            .collect();

        PopularityRank { ranked }
    }

    pub fn as_slice(&self) -> &[ItemId] {
        &self.ranked
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Pads a short personalized result with popularity-ranked items. A result
/// with at least `min_personalized` entries passes through untouched;
/// otherwise rank-ordered items are appended, skipping ones already present,
/// until `target_count` entries or the rank is exhausted.
pub fn augment(
    personal: Vec<ItemScore>,
    popularity_rank: &[ItemId],
    min_personalized: usize,
    target_count: usize,
) -> Vec<ItemScore> {
    if personal.len() >= min_personalized {
        return personal;
    }

    let mut combined = personal;
    for &item_id in popularity_rank.iter() {
        if combined.len() >= target_count {
            break;
        }
        if combined.iter().any(|scored| scored.id == item_id) {
            continue;
        }
        combined.push(ItemScore::new(item_id, FALLBACK_SCORE));
    }
    combined
}
