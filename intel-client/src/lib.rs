pub mod api;
pub mod metrics;
pub mod wire;

use async_trait::async_trait;
use echoscan_core::{Analysis, CoreError, Item, Trend};

pub use api::HttpIntelClient;
pub use metrics::{ApiMetrics, EndpointMetrics, MetricsCollector, RequestOutcome, RequestRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverRequest {
    pub query: String,
    pub context_description: String,
    pub max_items: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiscoverOutcome {
    Items(Vec<Item>),
    /// Nothing matched; carries the service's explanation.
    Empty { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichRequest {
    pub item_ids: Vec<String>,
    pub context_description: String,
}

/// Acknowledgement of an enrich call. `analyses` holds whatever the service
/// chose to return inline and may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichAck {
    pub analyses: Vec<(String, Analysis)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    Trend(Trend),
    /// The service declined, typically because too few relevant items exist.
    Declined { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// The external content-intelligence service. Every call resolves to exactly
/// one outcome; transport problems surface as `Err`.
#[async_trait]
pub trait ContentIntelligence: Send + Sync {
    async fn discover(&self, request: &DiscoverRequest) -> Result<DiscoverOutcome, CoreError>;

    async fn enrich(&self, request: &EnrichRequest) -> Result<EnrichAck, CoreError>;

    async fn synthesize(&self, query: &str, min_relevance: f64)
        -> Result<SynthesisOutcome, CoreError>;

    /// Current item collection, analyses included. The listing covers at
    /// least `min_limit` of the newest items.
    async fn list_items(&self, min_limit: usize) -> Result<Vec<Item>, CoreError>;

    async fn list_trends(&self) -> Result<Vec<Trend>, CoreError>;

    async fn health(&self) -> Result<HealthStatus, CoreError>;
}
