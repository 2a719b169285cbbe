use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const MAX_RELEVANCE: f64 = 100.0;

/// A discovered content unit. Only the enrichment stage ever touches
/// `analysis` after discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub body: String,
    pub community: String,
    pub author: String,
    pub upvotes: u64,
    pub comments: u64,
    pub created_at: DateTime<Utc>,
    pub permalink: String,
    pub analysis: Option<Analysis>,
}

impl Item {
    /// Relevance used for filtering and ordering; unanalyzed items count as 0.
    pub fn relevance(&self) -> f64 {
        self.analysis
            .as_ref()
            .map(|analysis| analysis.relevance)
            .unwrap_or(0.0)
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub relevance: f64,
    pub themes: Vec<String>,
    pub takeaways: Vec<String>,
    pub suggested_response: Option<String>,
    pub targeting_insights: Option<String>,
}

impl Analysis {
    pub fn new(relevance: f64) -> Self {
        Self {
            relevance: clamp_relevance(relevance),
            themes: Vec::new(),
            takeaways: Vec::new(),
            suggested_response: None,
            targeting_insights: None,
        }
    }

    pub fn band(&self) -> RelevanceBand {
        RelevanceBand::from_score(self.relevance)
    }
}

/// Forces a score into `0..=100`; NaN and infinities become 0.
pub fn clamp_relevance(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, MAX_RELEVANCE)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub id: String,
    pub query: String,
    pub posts_analyzed: u64,
    pub key_trends: Vec<String>,
    pub community_insights: BTreeMap<String, String>,
    pub suggested_strategies: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    min_relevance: f64,
}

impl FilterCriteria {
    pub fn new(min_relevance: f64) -> Result<Self, CoreError> {
        validate_relevance("min_relevance", min_relevance)?;
        Ok(Self { min_relevance })
    }

    pub fn min_relevance(&self) -> f64 {
        self.min_relevance
    }

    pub fn accepts(&self, item: &Item) -> bool {
        item.relevance() >= self.min_relevance
    }
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self { min_relevance: 0.0 }
    }
}

/// Rejects thresholds that cannot be compared against a 0-100 score.
pub fn validate_relevance(field: &str, value: f64) -> Result<(), CoreError> {
    if value.is_finite() && (0.0..=MAX_RELEVANCE).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::invalid_input(format!(
            "{field} must be between 0 and 100, got {value}"
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Relevance,
    Date,
    Upvotes,
    Comments,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Relevance,
        SortKey::Date,
        SortKey::Upvotes,
        SortKey::Comments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Relevance => "relevance",
            SortKey::Date => "date",
            SortKey::Upvotes => "upvotes",
            SortKey::Comments => "comments",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortKey::Relevance),
            "date" => Ok(SortKey::Date),
            "upvotes" => Ok(SortKey::Upvotes),
            "comments" => Ok(SortKey::Comments),
            other => Err(CoreError::invalid_input(format!(
                "unknown sort key '{other}', expected relevance, date, upvotes or comments"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Discover,
    Enrich,
    Synthesize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discover => "Discover",
            Stage::Enrich => "Enrich",
            Stage::Synthesize => "Synthesize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StageStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed(String),
}

impl StageStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, StageStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelevanceBand {
    High,
    Good,
    Moderate,
    Low,
}

impl RelevanceBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RelevanceBand::High
        } else if score >= 60.0 {
            RelevanceBand::Good
        } else if score >= 40.0 {
            RelevanceBand::Moderate
        } else {
            RelevanceBand::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelevanceBand::High => "High Relevance",
            RelevanceBand::Good => "Good Relevance",
            RelevanceBand::Moderate => "Moderate Relevance",
            RelevanceBand::Low => "Low Relevance",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("Upvotes".parse::<SortKey>().unwrap(), SortKey::Upvotes);
        assert_eq!(" date ".parse::<SortKey>().unwrap(), SortKey::Date);
        assert!("karma".parse::<SortKey>().is_err());
        assert_eq!(SortKey::default(), SortKey::Relevance);
    }

    #[test]
    fn test_filter_bounds() {
        assert!(FilterCriteria::new(0.0).is_ok());
        assert!(FilterCriteria::new(100.0).is_ok());
        assert!(matches!(
            FilterCriteria::new(100.5),
            Err(CoreError::InvalidInput { .. })
        ));
        assert!(FilterCriteria::new(-1.0).is_err());
        assert!(FilterCriteria::new(f64::NAN).is_err());
    }

    #[test]
    fn test_relevance_clamping() {
        assert_eq!(Analysis::new(140.0).relevance, 100.0);
        assert_eq!(Analysis::new(-3.0).relevance, 0.0);
        assert_eq!(Analysis::new(f64::NAN).relevance, 0.0);
        assert_eq!(Analysis::new(72.5).relevance, 72.5);
    }

    #[test]
    fn test_relevance_bands() {
        assert_eq!(RelevanceBand::from_score(80.0), RelevanceBand::High);
        assert_eq!(RelevanceBand::from_score(79.9), RelevanceBand::Good);
        assert_eq!(RelevanceBand::from_score(40.0), RelevanceBand::Moderate);
        assert_eq!(RelevanceBand::from_score(12.0).label(), "Low Relevance");
    }
}
