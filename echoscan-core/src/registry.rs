use crate::types::Trend;
use std::collections::HashSet;

/// Append-only log of synthesis results for the session.
#[derive(Debug, Default, Clone)]
pub struct TrendRegistry {
    entries: Vec<Trend>,
    ids: HashSet<String>,
}

impl TrendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, trend: Trend) {
        self.ids.insert(trend.id.clone());
        self.entries.push(trend);
    }

    /// Entries in the order they were appended.
    pub fn all(&self) -> &[Trend] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&Trend> {
        self.entries.last()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn trend(id: &str, query: &str) -> Trend {
        Trend {
            id: id.to_string(),
            query: query.to_string(),
            posts_analyzed: 2,
            key_trends: vec!["wearables".to_string()],
            community_insights: BTreeMap::new(),
            suggested_strategies: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_order_and_growth() {
        let mut registry = TrendRegistry::new();
        assert!(registry.is_empty());

        registry.append(trend("t1", "longevity"));
        registry.append(trend("t2", "longevity"));
        registry.append(trend("t3", "sleep"));

        let ids: Vec<_> = registry.all().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
        assert_eq!(registry.latest().unwrap().query, "sleep");
        assert!(registry.contains("t2"));
        assert!(!registry.contains("t4"));
    }

    #[test]
    fn test_identical_snapshots_are_kept() {
        let mut registry = TrendRegistry::new();
        registry.append(trend("t1", "longevity"));
        registry.append(trend("t1", "longevity"));
        assert_eq!(registry.len(), 2);
    }
}
