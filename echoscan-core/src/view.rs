//! Derived view: the filtered, ordered subset of items shown to the user.
//!
//! The view is always recomputed from the raw items and the current
//! criteria. Nothing here remembers previous results.

use crate::types::{FilterCriteria, Item, SortKey};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewCriteria {
    pub filter: FilterCriteria,
    pub sort: SortKey,
}

/// Result of one view computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub items: Vec<Item>,
    /// Number of items in the store when the view was computed.
    pub total: usize,
    pub criteria: ViewCriteria,
    /// Store revision the view was computed from.
    pub revision: u64,
}

impl ViewSnapshot {
    pub fn visible(&self) -> usize {
        self.items.len()
    }

    pub fn hidden(&self) -> usize {
        self.total - self.items.len()
    }
}

/// Keeps items whose relevance reaches the filter threshold and orders them
/// descending by `sort`. Ties keep their input order.
pub fn compute_view<'a>(items: &'a [Item], filter: &FilterCriteria, sort: SortKey) -> Vec<&'a Item> {
    let mut visible: Vec<&Item> = items.iter().filter(|item| filter.accepts(item)).collect();
    // `sort_by` is stable, so equal keys stay in discovery order.
    visible.sort_by(|a, b| compare_descending(a, b, sort));
    visible
}

pub fn snapshot(items: &[Item], criteria: ViewCriteria, revision: u64) -> ViewSnapshot {
    ViewSnapshot {
        items: compute_view(items, &criteria.filter, criteria.sort)
            .into_iter()
            .cloned()
            .collect(),
        total: items.len(),
        criteria,
        revision,
    }
}

fn compare_descending(a: &Item, b: &Item, sort: SortKey) -> Ordering {
    match sort {
        SortKey::Relevance => b.relevance().total_cmp(&a.relevance()),
        SortKey::Date => b.created_at.cmp(&a.created_at),
        SortKey::Upvotes => b.upvotes.cmp(&a.upvotes),
        SortKey::Comments => b.comments.cmp(&a.comments),
    }
}
