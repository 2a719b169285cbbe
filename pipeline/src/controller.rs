//! Pipeline controller: the only writer of the content store and the trend
//! registry.
//!
//! Every stage call claims its stage slot, checks preconditions against the
//! state as it is at that moment, performs its service call without holding
//! any state lock, and applies the result in one write. Stage calls always
//! end in a [`Notice`]; errors never escape to the caller.

use crate::notice::Notice;
use crate::stage::StageSlot;
use echoscan_core::{
    snapshot, validate_relevance, Analysis, ContentStore, CoreError, EnrichMode,
    ErrorExt, ErrorReporter, FilterCriteria, Item, PipelineConfig, SortKey, Stage, StageStatus,
    Trend, TrendRegistry, ViewCriteria, ViewSnapshot, MAX_DISCOVERY_ITEMS,
};
use intel_client::{
    ContentIntelligence, DiscoverOutcome, DiscoverRequest, EnrichRequest, HealthStatus,
    SynthesisOutcome,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, instrument, warn};

/// Items sent to the service per enrich call.
pub const ENRICH_BATCH_SIZE: usize = 10;

/// Analyzed items at or above the threshold needed before synthesis.
pub const MIN_SYNTHESIS_ITEMS: usize = 2;

const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct SharedState {
    store: ContentStore,
    trends: TrendRegistry,
    criteria: ViewCriteria,
}

pub struct PipelineController {
    service: Arc<dyn ContentIntelligence>,
    settings: PipelineConfig,
    state: RwLock<SharedState>,
    discover_slot: StageSlot,
    enrich_slot: StageSlot,
    synthesize_slot: StageSlot,
    notices: broadcast::Sender<Notice>,
    view: watch::Sender<ViewSnapshot>,
    reporter: ErrorReporter,
}

impl PipelineController {
    pub fn new(service: Arc<dyn ContentIntelligence>, settings: PipelineConfig) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let (view, _) = watch::channel(ViewSnapshot::default());

        Self {
            service,
            settings,
            state: RwLock::new(SharedState::default()),
            discover_slot: StageSlot::new(Stage::Discover),
            enrich_slot: StageSlot::new(Stage::Enrich),
            synthesize_slot: StageSlot::new(Stage::Synthesize),
            notices,
            view,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn settings(&self) -> &PipelineConfig {
        &self.settings
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.slot(stage).status()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<ViewSnapshot> {
        self.view.subscribe()
    }

    /// Latest derived view. Reflects every mutation made before this call.
    pub fn view(&self) -> ViewSnapshot {
        self.view.borrow().clone()
    }

    pub async fn items(&self) -> Vec<Item> {
        self.state.read().await.store.all().to_vec()
    }

    pub async fn trends(&self) -> Vec<Trend> {
        self.state.read().await.trends.all().to_vec()
    }

    pub async fn criteria(&self) -> ViewCriteria {
        self.state.read().await.criteria
    }

    pub async fn set_filter(&self, filter: FilterCriteria) {
        let mut state = self.state.write().await;
        state.criteria.filter = filter;
        debug!("Filter threshold set to {}", filter.min_relevance());
        self.publish_view(&state);
    }

    pub async fn set_sort(&self, sort: SortKey) {
        let mut state = self.state.write().await;
        state.criteria.sort = sort;
        debug!("Sort key set to {}", sort);
        self.publish_view(&state);
    }

    pub async fn health(&self) -> Result<HealthStatus, CoreError> {
        self.service.health().await
    }

    #[instrument(skip(self, context_description))]
    pub async fn discover(&self, query: &str, context_description: &str, max_items: u32) -> Notice {
        let outcome = self.run_discover(query, context_description, max_items).await;
        self.conclude(Stage::Discover, outcome)
    }

    #[instrument(skip(self, context_description))]
    pub async fn enrich(&self, context_description: &str) -> Notice {
        let outcome = self.run_enrich(context_description).await;
        self.conclude(Stage::Enrich, outcome)
    }

    #[instrument(skip(self))]
    pub async fn synthesize(&self, query: &str, min_relevance: f64) -> Notice {
        let outcome = self.run_synthesize(query, min_relevance).await;
        self.conclude(Stage::Synthesize, outcome)
    }

    /// Pulls analyses for items already in the store from the listing call.
    /// Membership and order stay as they are. Shares the enrich slot.
    pub async fn refresh_items(&self) -> Notice {
        let outcome = self.run_refresh().await;
        self.conclude(Stage::Enrich, outcome)
    }

    /// Appends trends held by the service that this session has not seen,
    /// oldest first. Shares the synthesize slot.
    pub async fn load_trends(&self) -> Notice {
        let outcome = self.run_load_trends().await;
        self.conclude(Stage::Synthesize, outcome)
    }

    async fn run_discover(
        &self,
        query: &str,
        context_description: &str,
        max_items: u32,
    ) -> Result<Notice, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::invalid_input("Please enter a search query"));
        }
        if !(1..=MAX_DISCOVERY_ITEMS).contains(&max_items) {
            return Err(CoreError::invalid_input(format!(
                "max_items must be between 1 and {MAX_DISCOVERY_ITEMS}, got {max_items}"
            )));
        }

        let mut run = self.discover_slot.try_begin()?;
        run.start();

        let request = DiscoverRequest {
            query: query.to_string(),
            context_description: context_description.to_string(),
            max_items,
        };

        match self.service.discover(&request).await {
            Ok(DiscoverOutcome::Items(items)) => {
                let count = {
                    let mut state = self.state.write().await;
                    state.store.replace(items);
                    self.publish_view(&state);
                    state.store.len()
                };
                run.succeed();
                info!("Discovery stored {} items", count);
                Ok(Notice::success(Stage::Discover, format!("Found {count} posts")))
            }
            Ok(DiscoverOutcome::Empty { message }) => {
                run.succeed();
                info!("Discovery returned nothing: {}", message);
                Ok(Notice::info(Stage::Discover, message))
            }
            Err(error) => {
                run.fail(error.user_friendly_message());
                Err(error)
            }
        }
    }

    async fn run_enrich(&self, context_description: &str) -> Result<Notice, CoreError> {
        let mut run = self.enrich_slot.try_begin()?;

        let (selected, stored): (Vec<String>, usize) = {
            let state = self.state.read().await;
            let selected = state
                .store
                .unanalyzed(ENRICH_BATCH_SIZE)
                .into_iter()
                .map(|item| item.id.clone())
                .collect();
            (selected, state.store.len())
        };

        if selected.is_empty() {
            run.abandon();
            return Err(CoreError::NothingToDo {
                message: "No posts to analyze".to_string(),
            });
        }

        run.start();
        info!("Enriching {} items", selected.len());

        let request = EnrichRequest {
            item_ids: selected.clone(),
            context_description: context_description.to_string(),
        };
        let ack = match self.service.enrich(&request).await {
            Ok(ack) => ack,
            Err(error) => {
                run.fail(error.user_friendly_message());
                return Err(error);
            }
        };

        let returned = match self.settings.enrich_mode {
            EnrichMode::Inline => ack.analyses,
            EnrichMode::Listing => match self.service.list_items(stored).await {
                Ok(items) => {
                    let mut returned = analyses_from_listing(items);
                    // Inline analyses cover selected items the listing has no analysis for.
                    let listed: HashSet<String> =
                        returned.iter().map(|(id, _)| id.clone()).collect();
                    returned.extend(
                        ack.analyses
                            .into_iter()
                            .filter(|(id, _)| !listed.contains(id)),
                    );
                    returned
                }
                Err(error) => {
                    run.fail(error.user_friendly_message());
                    return Err(error);
                }
            },
        };

        let wanted: HashSet<&str> = selected.iter().map(String::as_str).collect();
        let analyses: Vec<(String, Analysis)> = returned
            .into_iter()
            .filter(|(id, _)| wanted.contains(id.as_str()))
            .collect();

        let (attached, remaining) = {
            let mut state = self.state.write().await;
            let offered = analyses.len();
            let missing = state.store.attach_analyses(analyses);
            for id in &missing {
                warn!("Item {} left the store before its analysis arrived", id);
            }
            self.publish_view(&state);
            (offered - missing.len(), state.store.unanalyzed_count())
        };
        run.succeed();

        info!(
            "Attached {} of {} analyses, {} items still unanalyzed",
            attached,
            selected.len(),
            remaining
        );

        if attached == 0 {
            return Ok(Notice::info(
                Stage::Enrich,
                format!(
                    "The service returned no analyses for the {} selected posts",
                    selected.len()
                ),
            ));
        }

        let mut message = format!("Analyzed {attached} posts");
        if remaining > 0 {
            message.push_str(&format!(", {remaining} still waiting"));
        }
        Ok(Notice::success(Stage::Enrich, message))
    }

    async fn run_synthesize(&self, query: &str, min_relevance: f64) -> Result<Notice, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::invalid_input("Please enter a search query first"));
        }
        validate_relevance("min_relevance", min_relevance)?;

        let mut run = self.synthesize_slot.try_begin()?;

        // Read the store now, not when the request was made.
        let qualifying = self.state.read().await.store.count_qualifying(min_relevance);
        if qualifying < MIN_SYNTHESIS_ITEMS {
            run.abandon();
            return Err(CoreError::insufficient_data(format!(
                "Not enough relevant posts for trend analysis: {qualifying} of {MIN_SYNTHESIS_ITEMS} \
                 needed with relevance of at least {min_relevance}"
            )));
        }

        run.start();
        info!("Synthesizing trends from {} qualifying items", qualifying);

        match self.service.synthesize(query, min_relevance).await {
            Ok(SynthesisOutcome::Trend(trend)) => {
                let trend_id = trend.id.clone();
                self.state.write().await.trends.append(trend);
                run.succeed();
                info!("Trend {} appended", trend_id);
                Ok(Notice::success(Stage::Synthesize, "Trend synthesis completed"))
            }
            Ok(SynthesisOutcome::Declined { message }) => {
                run.succeed();
                Err(CoreError::InsufficientData { message })
            }
            Err(error) => {
                run.fail(error.user_friendly_message());
                Err(error)
            }
        }
    }

    async fn run_refresh(&self) -> Result<Notice, CoreError> {
        let mut run = self.enrich_slot.try_begin()?;
        let stored = self.state.read().await.store.len();
        if stored == 0 {
            run.abandon();
            return Err(CoreError::NothingToDo {
                message: "No posts to refresh".to_string(),
            });
        }

        run.start();
        let listing = match self.service.list_items(stored).await {
            Ok(items) => items,
            Err(error) => {
                run.fail(error.user_friendly_message());
                return Err(error);
            }
        };

        let refreshed = {
            let mut state = self.state.write().await;
            let analyses = analyses_from_listing(listing);
            let offered = analyses.len();
            // Listed items this session never discovered are skipped.
            let unknown = state.store.attach_analyses(analyses);
            self.publish_view(&state);
            offered - unknown.len()
        };
        run.succeed();

        Ok(Notice::success(
            Stage::Enrich,
            format!("Refreshed analyses for {refreshed} posts"),
        ))
    }

    async fn run_load_trends(&self) -> Result<Notice, CoreError> {
        let mut run = self.synthesize_slot.try_begin()?;
        run.start();

        let mut fetched = match self.service.list_trends().await {
            Ok(trends) => trends,
            Err(error) => {
                run.fail(error.user_friendly_message());
                return Err(error);
            }
        };
        fetched.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let added = {
            let mut state = self.state.write().await;
            let mut added = 0usize;
            for trend in fetched {
                if !state.trends.contains(&trend.id) {
                    state.trends.append(trend);
                    added += 1;
                }
            }
            added
        };
        run.succeed();

        debug!("Loaded {} stored trends", added);
        Ok(Notice::success(
            Stage::Synthesize,
            format!("Loaded {added} stored trends"),
        ))
    }

    fn slot(&self, stage: Stage) -> &StageSlot {
        match stage {
            Stage::Discover => &self.discover_slot,
            Stage::Enrich => &self.enrich_slot,
            Stage::Synthesize => &self.synthesize_slot,
        }
    }

    /// Recomputes the derived view from the state the caller holds locked.
    fn publish_view(&self, state: &SharedState) {
        let view = snapshot(state.store.all(), state.criteria, state.store.revision());
        self.view.send_replace(view);
    }

    fn conclude(&self, stage: Stage, outcome: Result<Notice, CoreError>) -> Notice {
        let notice = match outcome {
            Ok(notice) => notice,
            Err(error) => {
                self.reporter.report(&error);
                Notice::from_error(stage, &error)
            }
        };
        // No subscribers is fine.
        let _ = self.notices.send(notice.clone());
        notice
    }
}

fn analyses_from_listing(items: Vec<Item>) -> Vec<(String, Analysis)> {
    items
        .into_iter()
        .filter_map(|item| item.analysis.map(|analysis| (item.id, analysis)))
        .collect()
}
