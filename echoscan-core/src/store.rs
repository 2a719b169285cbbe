use crate::error::CoreError;
use crate::types::{Analysis, Item};
use std::collections::HashMap;
use tracing::{debug, warn};

/// In-memory set of discovered items, kept in discovery order.
#[derive(Debug, Default, Clone)]
pub struct ContentStore {
    items: Vec<Item>,
    index: HashMap<String, usize>,
    revision: u64,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards every item (and its analysis) and installs `items`.
    /// Duplicate ids keep their first occurrence.
    pub fn replace(&mut self, items: Vec<Item>) {
        let mut kept = Vec::with_capacity(items.len());
        let mut index = HashMap::with_capacity(items.len());

        for item in items {
            if index.contains_key(&item.id) {
                warn!("Dropping duplicate item {} from replacement set", item.id);
                continue;
            }
            index.insert(item.id.clone(), kept.len());
            kept.push(item);
        }

        debug!("Content store replaced with {} items", kept.len());
        self.items = kept;
        self.index = index;
        self.revision += 1;
    }

    /// Swaps in `analysis` for the item `id` wholesale.
    pub fn attach_analysis(&mut self, id: &str, analysis: Analysis) -> Result<(), CoreError> {
        let position = *self
            .index
            .get(id)
            .ok_or_else(|| CoreError::not_found(format!("item {id}")))?;

        self.items[position].analysis = Some(analysis);
        self.revision += 1;
        Ok(())
    }

    /// Applies a batch of analyses in one step. Returns the ids that were
    /// not present in the store; those are skipped.
    pub fn attach_analyses(&mut self, analyses: Vec<(String, Analysis)>) -> Vec<String> {
        let mut missing = Vec::new();
        let mut attached = 0usize;

        for (id, analysis) in analyses {
            match self.index.get(&id) {
                Some(&position) => {
                    self.items[position].analysis = Some(analysis);
                    attached += 1;
                }
                None => missing.push(id),
            }
        }

        if attached > 0 {
            self.revision += 1;
        }
        missing
    }

    pub fn all(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// First `limit` items without analysis, in store order.
    pub fn unanalyzed(&self, limit: usize) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| !item.is_analyzed())
            .take(limit)
            .collect()
    }

    pub fn unanalyzed_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_analyzed()).count()
    }

    /// Analyzed items whose relevance reaches `min_relevance`.
    pub fn count_qualifying(&self, min_relevance: f64) -> usize {
        self.items
            .iter()
            .filter(|item| {
                item.analysis
                    .as_ref()
                    .is_some_and(|analysis| analysis.relevance >= min_relevance)
            })
            .count()
    }
}
