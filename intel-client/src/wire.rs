//! JSON shapes exchanged with the content-intelligence service and their
//! conversion into domain types.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use echoscan_core::{clamp_relevance, Analysis, Item, Trend};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct SearchBody<'a> {
    pub query: &'a str,
    pub company_description: &'a str,
    pub max_posts: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeBody<'a> {
    pub post_ids: &'a [String],
    pub company_description: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub posts: Vec<WirePost>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub analyses: Vec<WireAnalysis>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub posts: Vec<WirePost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendsResponse {
    #[serde(default)]
    pub trends: Vec<WireTrend>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WirePost {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default = "deleted_author")]
    pub author: String,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub analysis: Option<WireAnalysis>,
}

fn deleted_author() -> String {
    "[deleted]".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireAnalysis {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub detected_themes: Vec<String>,
    #[serde(default)]
    pub takeaways: Vec<String>,
    #[serde(default)]
    pub suggested_response: Option<String>,
    #[serde(default)]
    pub targeting_insights: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireTrend {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub posts_analyzed: u64,
    #[serde(default)]
    pub key_trends: Vec<String>,
    #[serde(default)]
    pub community_insights: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub suggested_strategies: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<WireAnalysis> for Analysis {
    fn from(wire: WireAnalysis) -> Self {
        Self {
            relevance: clamp_relevance(wire.relevance_score),
            themes: wire.detected_themes,
            takeaways: wire.takeaways,
            suggested_response: non_empty(wire.suggested_response),
            targeting_insights: non_empty(wire.targeting_insights),
        }
    }
}

impl From<WirePost> for Item {
    fn from(wire: WirePost) -> Self {
        Self {
            created_at: parse_timestamp(&wire.created_at),
            id: wire.id,
            title: wire.title,
            body: wire.content,
            community: wire.subreddit,
            author: wire.author,
            upvotes: wire.upvotes.max(0) as u64,
            comments: wire.comments_count.max(0) as u64,
            permalink: wire.url,
            analysis: wire.analysis.map(Analysis::from),
        }
    }
}

impl From<WireTrend> for Trend {
    fn from(wire: WireTrend) -> Self {
        let community_insights = wire
            .community_insights
            .into_iter()
            .map(|(community, insight)| {
                let text = match insight {
                    serde_json::Value::String(text) => text,
                    other => other.to_string(),
                };
                (community, text)
            })
            .collect();

        Self {
            id: wire
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            query: wire.query,
            posts_analyzed: wire.posts_analyzed,
            key_trends: wire.key_trends,
            community_insights,
            suggested_strategies: wire.suggested_strategies,
            created_at: wire
                .created_at
                .as_deref()
                .map(parse_timestamp)
                .unwrap_or_else(Utc::now),
        }
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

/// Accepts RFC 3339 as well as the `YYYY-MM-DD HH:MM:SS+HH:MM` form the
/// service emits. Zone-less timestamps are read as UTC; anything else falls
/// back to the Unix epoch.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%:z"] {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return parsed.with_timezone(&Utc);
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Utc.from_utc_datetime(&parsed);
        }
    }

    if !raw.is_empty() {
        warn!("Unparseable timestamp '{}', using epoch", raw);
    }
    DateTime::<Utc>::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z"), expected);
        assert_eq!(parse_timestamp("2024-03-01 12:30:00+00:00"), expected);
        assert_eq!(parse_timestamp("2024-03-01 14:30:00+02:00"), expected);
        assert_eq!(parse_timestamp("2024-03-01T12:30:00.000"), expected);
        assert_eq!(parse_timestamp("garbage"), DateTime::<Utc>::default());
        assert_eq!(parse_timestamp(""), DateTime::<Utc>::default());
    }

    #[test]
    fn test_post_conversion() {
        let wire: WirePost = serde_json::from_value(serde_json::json!({
            "id": "abc123",
            "title": "Zone 2 cardio and mitochondria",
            "content": "Long read",
            "subreddit": "longevity",
            "author": "runner",
            "upvotes": -4,
            "comments_count": 12,
            "url": "https://reddit.com/r/longevity/comments/abc123",
            "created_at": "2024-03-01 12:30:00+00:00",
            "scraped_at": "2024-03-02T00:00:00",
            "analysis": {
                "post_id": "abc123",
                "relevance_score": 85,
                "detected_themes": ["exercise", "mitochondria"],
                "takeaways": ["People track HRV"],
                "suggested_response": "",
                "targeting_insights": "Data-driven crowd"
            }
        }))
        .unwrap();

        let item: Item = wire.into();
        assert_eq!(item.id, "abc123");
        assert_eq!(item.community, "longevity");
        assert_eq!(item.upvotes, 0);
        assert_eq!(item.comments, 12);

        let analysis = item.analysis.unwrap();
        assert_eq!(analysis.relevance, 85.0);
        assert_eq!(analysis.themes, vec!["exercise", "mitochondria"]);
        assert!(analysis.suggested_response.is_none());
        assert_eq!(analysis.targeting_insights.as_deref(), Some("Data-driven crowd"));
    }

    #[test]
    fn test_trend_conversion() {
        let wire: WireTrend = serde_json::from_value(serde_json::json!({
            "query": "longevity",
            "posts_analyzed": 3,
            "key_trends": ["CGMs go mainstream"],
            "community_insights": {
                "r/longevity": "Skeptical of supplements",
                "r/Biohackers": {"tone": "experimental"}
            },
            "suggested_strategies": ["Publish sleep data"],
            "created_at": "2024-03-01T12:30:00+00:00"
        }))
        .unwrap();

        let trend: Trend = wire.into();
        assert!(!trend.id.is_empty());
        assert_eq!(trend.posts_analyzed, 3);
        assert_eq!(
            trend.community_insights.get("r/longevity").map(String::as_str),
            Some("Skeptical of supplements")
        );
        assert!(trend.community_insights["r/Biohackers"].contains("experimental"));
    }
}
