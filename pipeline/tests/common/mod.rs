//! Scripted stand-in for the content-intelligence service.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use echoscan_core::{Analysis, CoreError, Item, PipelineConfig, ServiceError, Trend};
use intel_client::{
    ContentIntelligence, DiscoverOutcome, DiscoverRequest, EnrichAck, EnrichRequest,
    HealthStatus, SynthesisOutcome,
};
use pipeline::PipelineController;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub enum Failure {
    Upstream(String),
    Timeout,
}

impl Failure {
    fn into_error(self) -> CoreError {
        match self {
            Failure::Upstream(detail) => CoreError::Service(ServiceError::Upstream {
                detail,
                status_code: Some(500),
            }),
            Failure::Timeout => CoreError::Timeout { seconds: 30 },
        }
    }
}

#[derive(Debug, Clone)]
pub enum SynthesisReply {
    Trend(Trend),
    Declined(String),
    Fail(Failure),
}

#[derive(Default)]
struct Script {
    discover_items: Vec<Item>,
    discover_empty_message: Option<String>,
    discover_failure: Option<Failure>,
    scores: HashMap<String, f64>,
    enrich_failure: Option<Failure>,
    inline_analyses: bool,
    /// What the listing endpoint currently holds.
    listing: Vec<Item>,
    /// Ids the listing leaves out, as a page that ends too early would.
    unlisted: HashSet<String>,
    synthesis: Option<SynthesisReply>,
    stored_trends: Vec<Trend>,
}

#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub discover: Vec<DiscoverRequest>,
    pub enrich_batches: Vec<Vec<String>>,
    pub synthesize: Vec<(String, f64)>,
    /// Minimum page size asked of each listing call.
    pub list_items: Vec<usize>,
}

#[derive(Default)]
pub struct FakeService {
    script: Mutex<Script>,
    calls: Mutex<Calls>,
    discover_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_items(self: &Arc<Self>, items: Vec<Item>) -> &Arc<Self> {
        let mut script = self.script.lock().unwrap();
        script.listing = items.clone();
        script.discover_items = items;
        self
    }

    /// Relevance the service assigns to `id` when asked to enrich it.
    pub fn score(self: &Arc<Self>, id: &str, relevance: f64) -> &Arc<Self> {
        self.script
            .lock()
            .unwrap()
            .scores
            .insert(id.to_string(), relevance);
        self
    }

    /// Puts an analysis on the listing without any enrich call.
    pub fn analyzed_elsewhere(self: &Arc<Self>, id: &str, relevance: f64) -> &Arc<Self> {
        let mut script = self.script.lock().unwrap();
        if let Some(item) = script.listing.iter_mut().find(|item| item.id == id) {
            item.analysis = Some(Analysis::new(relevance));
        }
        self
    }

    pub fn leave_off_listing(self: &Arc<Self>, id: &str) -> &Arc<Self> {
        self.script.lock().unwrap().unlisted.insert(id.to_string());
        self
    }

    pub fn discover_empty(self: &Arc<Self>, message: &str) -> &Arc<Self> {
        self.script.lock().unwrap().discover_empty_message = Some(message.to_string());
        self
    }

    pub fn fail_discover(self: &Arc<Self>, failure: Failure) -> &Arc<Self> {
        self.script.lock().unwrap().discover_failure = Some(failure);
        self
    }

    pub fn fail_enrich(self: &Arc<Self>, failure: Failure) -> &Arc<Self> {
        self.script.lock().unwrap().enrich_failure = Some(failure);
        self
    }

    pub fn inline_analyses(self: &Arc<Self>) -> &Arc<Self> {
        self.script.lock().unwrap().inline_analyses = true;
        self
    }

    pub fn reply_synthesis(self: &Arc<Self>, reply: SynthesisReply) -> &Arc<Self> {
        self.script.lock().unwrap().synthesis = Some(reply);
        self
    }

    pub fn stored_trends(self: &Arc<Self>, trends: Vec<Trend>) -> &Arc<Self> {
        self.script.lock().unwrap().stored_trends = trends;
        self
    }

    /// Makes the next discover calls wait until the returned handle is
    /// notified.
    pub fn hold_discover(self: &Arc<Self>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.discover_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentIntelligence for FakeService {
    async fn discover(&self, request: &DiscoverRequest) -> Result<DiscoverOutcome, CoreError> {
        self.calls.lock().unwrap().discover.push(request.clone());

        let gate = self.discover_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let script = self.script.lock().unwrap();
        if let Some(failure) = script.discover_failure.clone() {
            return Err(failure.into_error());
        }
        if let Some(message) = script.discover_empty_message.clone() {
            return Ok(DiscoverOutcome::Empty { message });
        }
        Ok(DiscoverOutcome::Items(script.discover_items.clone()))
    }

    async fn enrich(&self, request: &EnrichRequest) -> Result<EnrichAck, CoreError> {
        self.calls
            .lock()
            .unwrap()
            .enrich_batches
            .push(request.item_ids.clone());

        let mut script = self.script.lock().unwrap();
        if let Some(failure) = script.enrich_failure.clone() {
            return Err(failure.into_error());
        }

        let mut analyses = Vec::new();
        for id in &request.item_ids {
            let Some(&relevance) = script.scores.get(id) else {
                continue;
            };
            let analysis = Analysis::new(relevance);
            if let Some(item) = script.listing.iter_mut().find(|item| &item.id == id) {
                item.analysis = Some(analysis.clone());
            }
            analyses.push((id.clone(), analysis));
        }

        if script.inline_analyses {
            Ok(EnrichAck { analyses })
        } else {
            Ok(EnrichAck::default())
        }
    }

    async fn synthesize(
        &self,
        query: &str,
        min_relevance: f64,
    ) -> Result<SynthesisOutcome, CoreError> {
        self.calls
            .lock()
            .unwrap()
            .synthesize
            .push((query.to_string(), min_relevance));

        match self.script.lock().unwrap().synthesis.clone() {
            Some(SynthesisReply::Trend(trend)) => Ok(SynthesisOutcome::Trend(trend)),
            Some(SynthesisReply::Declined(message)) => Ok(SynthesisOutcome::Declined { message }),
            Some(SynthesisReply::Fail(failure)) => Err(failure.into_error()),
            None => Ok(SynthesisOutcome::Trend(trend("trend-default", query, 1))),
        }
    }

    async fn list_items(&self, min_limit: usize) -> Result<Vec<Item>, CoreError> {
        self.calls.lock().unwrap().list_items.push(min_limit);
        let script = self.script.lock().unwrap();
        Ok(script
            .listing
            .iter()
            .filter(|item| !script.unlisted.contains(&item.id))
            .cloned()
            .collect())
    }

    async fn list_trends(&self) -> Result<Vec<Trend>, CoreError> {
        Ok(self.script.lock().unwrap().stored_trends.clone())
    }

    async fn health(&self) -> Result<HealthStatus, CoreError> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
        })
    }
}

pub fn item(id: &str, upvotes: u64) -> Item {
    Item {
        id: id.to_string(),
        title: format!("Post {id}"),
        body: String::new(),
        community: "longevity".to_string(),
        author: "poster".to_string(),
        upvotes,
        comments: 0,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        permalink: format!("https://reddit.com/r/longevity/comments/{id}"),
        analysis: None,
    }
}

pub fn items(count: usize) -> Vec<Item> {
    (0..count).map(|n| item(&format!("p{n}"), n as u64)).collect()
}

/// Trend created `day` days into May 2024.
pub fn trend(id: &str, query: &str, day: u32) -> Trend {
    Trend {
        id: id.to_string(),
        query: query.to_string(),
        posts_analyzed: 2,
        key_trends: vec!["Rapamycin curiosity".to_string()],
        community_insights: BTreeMap::new(),
        suggested_strategies: vec!["Host an AMA".to_string()],
        created_at: Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap(),
    }
}

pub fn controller(service: &Arc<FakeService>) -> PipelineController {
    controller_with(service, PipelineConfig::default())
}

pub fn controller_with(service: &Arc<FakeService>, settings: PipelineConfig) -> PipelineController {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let service: Arc<dyn ContentIntelligence> = service.clone();
    PipelineController::new(service, settings)
}
