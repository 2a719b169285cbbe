//! Per-endpoint call statistics for the content-intelligence service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// How a single service call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Succeeded { status_code: u16 },
    /// The service answered with an error, or the transport failed.
    Failed {
        status_code: Option<u16>,
        error_code: &'static str,
    },
    TimedOut,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Succeeded { .. })
    }

    fn status_code(&self) -> Option<u16> {
        match self {
            RequestOutcome::Succeeded { status_code } => Some(*status_code),
            RequestOutcome::Failed { status_code, .. } => *status_code,
            RequestOutcome::TimedOut => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub endpoint: &'static str,
    pub method: String,
    pub elapsed: Duration,
    pub outcome: RequestOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub timed_out_requests: u64,
    pub total_response_time: Duration,
    pub last_request_time: Option<SystemTime>,
    pub requests_by_endpoint: HashMap<String, EndpointMetrics>,
}

impl ApiMetrics {
    pub fn average_response_time(&self) -> Duration {
        mean(self.total_response_time, self.total_requests)
    }

    fn record(&mut self, record: &RequestRecord) {
        self.total_requests += 1;
        self.total_response_time += record.elapsed;
        self.last_request_time = Some(SystemTime::now());

        match record.outcome {
            RequestOutcome::Succeeded { .. } => self.successful_requests += 1,
            RequestOutcome::Failed { .. } => self.failed_requests += 1,
            RequestOutcome::TimedOut => {
                self.failed_requests += 1;
                self.timed_out_requests += 1;
            }
        }

        self.requests_by_endpoint
            .entry(record.endpoint.to_string())
            .or_default()
            .record(record);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointMetrics {
    pub request_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub total_response_time: Duration,
    pub slowest_response_time: Duration,
    pub last_status_code: Option<u16>,
    /// Error codes seen on this endpoint and how often.
    pub errors_by_code: HashMap<String, u64>,
}

impl EndpointMetrics {
    fn record(&mut self, record: &RequestRecord) {
        self.request_count += 1;
        self.total_response_time += record.elapsed;
        self.slowest_response_time = self.slowest_response_time.max(record.elapsed);
        self.last_status_code = record.outcome.status_code();

        let error_code = match &record.outcome {
            RequestOutcome::Succeeded { .. } => {
                self.success_count += 1;
                return;
            }
            RequestOutcome::Failed { error_code, .. } => *error_code,
            RequestOutcome::TimedOut => "TIMEOUT",
        };
        self.error_count += 1;
        *self.errors_by_code.entry(error_code.to_string()).or_default() += 1;
    }

    pub fn average_response_time(&self) -> Duration {
        mean(self.total_response_time, self.request_count)
    }

    pub fn success_rate(&self) -> f64 {
        if self.request_count == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.request_count as f64
    }
}

fn mean(total: Duration, count: u64) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(count) => total / count,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}

/// Shared, clonable sink for request records.
#[derive(Debug, Default, Clone)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<ApiMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, record: RequestRecord) {
        self.metrics.write().await.record(&record);
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn get_endpoint_metrics(&self, endpoint: &str) -> Option<EndpointMetrics> {
        self.metrics
            .read()
            .await
            .requests_by_endpoint
            .get(endpoint)
            .cloned()
    }

    pub async fn reset_metrics(&self) {
        *self.metrics.write().await = ApiMetrics::default();
    }

    pub async fn export_metrics(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.metrics.read().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(endpoint: &'static str, millis: u64, outcome: RequestOutcome) -> RequestRecord {
        RequestRecord {
            endpoint,
            method: "POST".to_string(),
            elapsed: Duration::from_millis(millis),
            outcome,
        }
    }

    #[tokio::test]
    async fn test_totals_and_average() {
        let collector = MetricsCollector::new();
        collector
            .record(record("/api/search-reddit", 150, RequestOutcome::Succeeded { status_code: 200 }))
            .await;
        collector
            .record(record("/api/search-reddit", 50, RequestOutcome::TimedOut))
            .await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.timed_out_requests, 1);
        assert_eq!(metrics.average_response_time(), Duration::from_millis(100));
        assert!(metrics.last_request_time.is_some());
    }

    #[tokio::test]
    async fn test_endpoint_breakdown() {
        let collector = MetricsCollector::new();
        collector
            .record(record("/api/analyze-posts", 100, RequestOutcome::Succeeded { status_code: 200 }))
            .await;
        collector
            .record(record(
                "/api/analyze-posts",
                300,
                RequestOutcome::Failed {
                    status_code: Some(500),
                    error_code: "SERVICE_UPSTREAM",
                },
            ))
            .await;

        let endpoint = collector
            .get_endpoint_metrics("/api/analyze-posts")
            .await
            .unwrap();
        assert_eq!(endpoint.request_count, 2);
        assert_eq!(endpoint.success_rate(), 0.5);
        assert_eq!(endpoint.average_response_time(), Duration::from_millis(200));
        assert_eq!(endpoint.slowest_response_time, Duration::from_millis(300));
        assert_eq!(endpoint.last_status_code, Some(500));
        assert_eq!(endpoint.errors_by_code["SERVICE_UPSTREAM"], 1);
        assert!(collector.get_endpoint_metrics("/api/posts").await.is_none());
    }

    #[tokio::test]
    async fn test_export_and_reset() {
        let collector = MetricsCollector::new();
        collector
            .record(record("/api/posts", 10, RequestOutcome::Succeeded { status_code: 200 }))
            .await;

        let exported = collector.export_metrics().await.unwrap();
        assert!(exported.contains("/api/posts"));

        collector.reset_metrics().await;
        assert_eq!(collector.get_metrics().await.total_requests, 0);
    }
}
