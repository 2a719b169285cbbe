use crate::metrics::{ApiMetrics, MetricsCollector, RequestOutcome, RequestRecord};
use crate::wire::{
    AnalyzeBody, AnalyzeResponse, ErrorBody, HealthResponse, PostsResponse, SearchBody,
    SearchResponse, TrendsResponse, WireTrend,
};
use crate::{
    ContentIntelligence, DiscoverOutcome, DiscoverRequest, EnrichAck, EnrichRequest,
    HealthStatus, SynthesisOutcome,
};
use async_trait::async_trait;
use echoscan_core::{Analysis, CoreError, ErrorExt, Item, ServiceConfig, ServiceError, Trend};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

const SEARCH_ENDPOINT: &str = "/api/search-reddit";
const ANALYZE_ENDPOINT: &str = "/api/analyze-posts";
const SYNTHESIZE_ENDPOINT: &str = "/api/synthesize-trends";
const POSTS_ENDPOINT: &str = "/api/posts";
const TRENDS_ENDPOINT: &str = "/api/trends";
const HEALTH_ENDPOINT: &str = "/api/health";

/// reqwest-backed client for the content-intelligence HTTP API.
#[derive(Debug, Clone)]
pub struct HttpIntelClient {
    http_client: Client,
    base_url: Url,
    metrics: MetricsCollector,
    timeout_secs: u64,
    listing_limit: u32,
}

impl HttpIntelClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, CoreError> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| CoreError::invalid_input(format!("invalid service URL: {e}")))?;
        // Endpoints resolve under any path prefix, so it must end in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            metrics: MetricsCollector::new(),
            timeout_secs: config.timeout_secs,
            listing_limit: config.listing_limit,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, CoreError> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| CoreError::invalid_input(format!("invalid endpoint {endpoint}: {e}")))
    }

    /// Sends a request and maps every failure mode onto `CoreError`. The
    /// outcome is recorded in the metrics either way.
    async fn make_request(
        &self,
        method: Method,
        endpoint: &'static str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, CoreError> {
        let url = self.endpoint_url(endpoint)?;
        let start_time = Instant::now();

        info!("Calling content-intelligence service: {} {}", method, endpoint);
        let request = build(self.http_client.request(method.clone(), url));
        let outcome = self.send(request, endpoint).await;

        let recorded = match &outcome {
            Ok(response) => RequestOutcome::Succeeded {
                status_code: response.status().as_u16(),
            },
            Err(CoreError::Timeout { .. }) => RequestOutcome::TimedOut,
            Err(e) => RequestOutcome::Failed {
                status_code: match e {
                    CoreError::Service(ServiceError::Upstream { status_code, .. }) => *status_code,
                    CoreError::Service(ServiceError::Status { status_code }) => Some(*status_code),
                    CoreError::Service(ServiceError::Unavailable { .. }) => Some(503),
                    _ => None,
                },
                error_code: e.error_code(),
            },
        };

        self.metrics
            .record(RequestRecord {
                endpoint,
                method: method.to_string(),
                elapsed: start_time.elapsed(),
                outcome: recorded,
            })
            .await;

        outcome
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response, CoreError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!("Request to {} timed out after {}s", endpoint, self.timeout_secs);
                return Err(CoreError::Timeout {
                    seconds: self.timeout_secs,
                });
            }
            Err(e) => {
                error!("Network error for {}: {}", endpoint, e);
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let body = response.text().await.unwrap_or_default();
        Err(service_failure(status.as_u16(), &body, endpoint).into())
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        what: &str,
    ) -> Result<T, CoreError> {
        let text = self.read_body(response, what).await?;
        serde_json::from_str::<T>(&text).map_err(|e| {
            error!("Failed to parse {}: {}", what, e);
            CoreError::Service(ServiceError::InvalidResponse {
                details: format!("Failed to parse {what}"),
            })
        })
    }

    /// Reading the body is still bound by the client timeout.
    async fn read_body(&self, response: Response, what: &str) -> Result<String, CoreError> {
        response.text().await.map_err(|e| {
            if e.is_timeout() {
                error!("Reading {} timed out after {}s", what, self.timeout_secs);
                CoreError::Timeout {
                    seconds: self.timeout_secs,
                }
            } else {
                error!("Failed to read {}: {}", what, e);
                CoreError::Network(e)
            }
        })
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    pub async fn reset_metrics(&self) {
        self.metrics.reset_metrics().await;
    }
}

/// Prefers the service's own `detail` text so it reaches the user verbatim.
fn service_failure(status_code: u16, body: &str, endpoint: &str) -> ServiceError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) if !detail.is_empty() => ServiceError::Upstream {
            detail,
            status_code: Some(status_code),
        },
        Ok(ErrorBody { detail }) if !detail.is_null() => ServiceError::Upstream {
            detail: detail.to_string(),
            status_code: Some(status_code),
        },
        _ if status_code == 503 => ServiceError::Unavailable {
            endpoint: endpoint.to_string(),
        },
        _ => ServiceError::Status { status_code },
    }
}

#[async_trait]
impl ContentIntelligence for HttpIntelClient {
    async fn discover(&self, request: &DiscoverRequest) -> Result<DiscoverOutcome, CoreError> {
        let body = SearchBody {
            query: &request.query,
            company_description: &request.context_description,
            max_posts: request.max_items,
        };
        let response = self
            .make_request(Method::POST, SEARCH_ENDPOINT, |builder| builder.json(&body))
            .await?;
        let search: SearchResponse = self.decode(response, "search results").await?;

        if search.posts.is_empty() {
            let message = search
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "No posts found".to_string());
            info!("Discovery for '{}' returned no items", request.query);
            return Ok(DiscoverOutcome::Empty { message });
        }

        let items: Vec<Item> = search.posts.into_iter().map(Item::from).collect();
        info!("Discovered {} items for '{}'", items.len(), request.query);
        Ok(DiscoverOutcome::Items(items))
    }

    async fn enrich(&self, request: &EnrichRequest) -> Result<EnrichAck, CoreError> {
        let body = AnalyzeBody {
            post_ids: &request.item_ids,
            company_description: &request.context_description,
        };
        let response = self
            .make_request(Method::POST, ANALYZE_ENDPOINT, |builder| builder.json(&body))
            .await?;

        // The acknowledgement body is optional; an unreadable one still
        // means the call succeeded.
        let text = self.read_body(response, "enrich acknowledgement").await?;
        let parsed = if text.trim().is_empty() {
            AnalyzeResponse::default()
        } else {
            serde_json::from_str::<AnalyzeResponse>(&text).unwrap_or_else(|e| {
                warn!("Ignoring unreadable enrich acknowledgement: {}", e);
                AnalyzeResponse::default()
            })
        };

        let analyses = parsed
            .analyses
            .into_iter()
            .filter(|analysis| !analysis.post_id.is_empty())
            .map(|analysis| (analysis.post_id.clone(), Analysis::from(analysis)))
            .collect::<Vec<_>>();

        info!(
            "Enrich acknowledged for {} items ({} inline analyses)",
            request.item_ids.len(),
            analyses.len()
        );
        Ok(EnrichAck { analyses })
    }

    async fn synthesize(
        &self,
        query: &str,
        min_relevance: f64,
    ) -> Result<SynthesisOutcome, CoreError> {
        let min_relevance = min_relevance.to_string();
        let response = self
            .make_request(Method::POST, SYNTHESIZE_ENDPOINT, |builder| {
                builder.query(&[("query", query), ("min_relevance", min_relevance.as_str())])
            })
            .await?;
        let value: serde_json::Value = self.decode(response, "synthesis result").await?;

        if value.get("key_trends").is_none() {
            if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
                info!("Synthesis declined by service: {}", message);
                return Ok(SynthesisOutcome::Declined {
                    message: message.to_string(),
                });
            }
        }

        let wire: WireTrend = serde_json::from_value(value).map_err(|e| {
            error!("Failed to parse trend: {}", e);
            CoreError::Service(ServiceError::InvalidResponse {
                details: "Failed to parse trend".to_string(),
            })
        })?;
        let trend = Trend::from(wire);
        info!("Synthesized trend {} from {} items", trend.id, trend.posts_analyzed);
        Ok(SynthesisOutcome::Trend(trend))
    }

    async fn list_items(&self, min_limit: usize) -> Result<Vec<Item>, CoreError> {
        let limit = u32::try_from(min_limit)
            .unwrap_or(u32::MAX)
            .max(self.listing_limit)
            .to_string();
        let response = self
            .make_request(Method::GET, POSTS_ENDPOINT, |builder| {
                builder.query(&[("limit", limit.as_str())])
            })
            .await?;
        let listing: PostsResponse = self.decode(response, "item listing").await?;

        debug!("Listing returned {} items", listing.posts.len());
        Ok(listing.posts.into_iter().map(Item::from).collect())
    }

    async fn list_trends(&self) -> Result<Vec<Trend>, CoreError> {
        let limit = self.listing_limit.to_string();
        let response = self
            .make_request(Method::GET, TRENDS_ENDPOINT, |builder| {
                builder.query(&[("limit", limit.as_str())])
            })
            .await?;
        let listing: TrendsResponse = self.decode(response, "trend listing").await?;

        debug!("Trend listing returned {} entries", listing.trends.len());
        Ok(listing.trends.into_iter().map(Trend::from).collect())
    }

    async fn health(&self) -> Result<HealthStatus, CoreError> {
        let response = self
            .make_request(Method::GET, HEALTH_ENDPOINT, |builder| builder)
            .await?;
        let health: HealthResponse = self.decode(response, "health status").await?;
        Ok(HealthStatus {
            status: health.status,
        })
    }
}
