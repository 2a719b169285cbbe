use anyhow::{Context, Result};
use clap::Parser;
use echoscan_core::{AppConfig, FilterCriteria, SortKey, Stage, StageStatus, ViewSnapshot};
use intel_client::{ContentIntelligence, HttpIntelClient};
use pipeline::{NoticeLevel, PipelineController};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "echoscan")]
#[command(version)]
#[command(about = "Discover community posts, score them against your business, and spot trends")]
struct Cli {
    /// Search query sent to the discovery service
    query: String,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Business context used for relevance scoring
    #[arg(long)]
    context: Option<String>,

    /// Number of posts to discover (1-100)
    #[arg(long)]
    max_items: Option<u32>,

    /// Enrich batches to run after discovery
    #[arg(long, default_value_t = 1)]
    batches: u32,

    /// Hide posts below this relevance score
    #[arg(long, default_value_t = 0.0)]
    min_relevance: f64,

    /// relevance, date, upvotes or comments
    #[arg(long, default_value = "relevance")]
    sort: SortKey,

    /// Synthesize trends once enrichment is done
    #[arg(long)]
    synthesize: bool,

    /// Relevance threshold for posts fed to trend synthesis
    #[arg(long)]
    synthesis_min_relevance: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echoscan=info,pipeline=info,intel_client=info".into()),
        )
        .init();

    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    info!("Using content service at {}", config.service.base_url);

    let client = HttpIntelClient::new(&config.service).context("building service client")?;
    let service: Arc<dyn ContentIntelligence> = Arc::new(client);
    let controller = PipelineController::new(service, config.pipeline.clone());

    match controller.health().await {
        Ok(health) if health.is_healthy() => {}
        Ok(health) => warn!("Service reports status '{}'", health.status),
        Err(e) => warn!("Health check failed: {}", e),
    }

    let context = cli
        .context
        .unwrap_or_else(|| config.pipeline.context_description.clone());
    let max_items = cli.max_items.unwrap_or(config.pipeline.max_items);

    let notice = controller.discover(&cli.query, &context, max_items).await;
    println!("{notice}");
    if notice.level != NoticeLevel::Success {
        return Ok(());
    }

    for _ in 0..cli.batches {
        let notice = controller.enrich(&context).await;
        println!("{notice}");
        if notice.level != NoticeLevel::Success {
            break;
        }
    }

    if cli.synthesize {
        let threshold = cli
            .synthesis_min_relevance
            .unwrap_or(config.pipeline.synthesis_min_relevance);
        println!("{}", controller.synthesize(&cli.query, threshold).await);
    }

    controller
        .set_filter(FilterCriteria::new(cli.min_relevance)?)
        .await;
    controller.set_sort(cli.sort).await;

    print_view(&controller.view());

    let trends = controller.trends().await;
    if !trends.is_empty() {
        println!();
        println!("Trends ({})", trends.len());
        for trend in &trends {
            println!(
                "  {} ({} posts, {})",
                trend.query,
                trend.posts_analyzed,
                trend.created_at.format("%Y-%m-%d %H:%M")
            );
            for key_trend in &trend.key_trends {
                println!("    - {key_trend}");
            }
            for (community, insight) in &trend.community_insights {
                println!("    {community}: {insight}");
            }
            for strategy in &trend.suggested_strategies {
                println!("    > {strategy}");
            }
        }
    }

    for stage in [Stage::Discover, Stage::Enrich, Stage::Synthesize] {
        if let StageStatus::Failed(reason) = controller.status(stage) {
            warn!("{} ended in failure: {}", stage, reason);
        }
    }

    Ok(())
}

fn print_view(view: &ViewSnapshot) {
    println!();
    println!(
        "Showing {} of {} posts (min relevance {}, sorted by {})",
        view.visible(),
        view.total,
        view.criteria.filter.min_relevance(),
        view.criteria.sort
    );

    for item in &view.items {
        let score = match &item.analysis {
            Some(analysis) => format!("{:>5.1} {}", analysis.relevance, analysis.band().label()),
            None => "  --- Not analyzed".to_string(),
        };
        println!(
            "  {}  r/{}  {} up  {} comments  {}",
            score, item.community, item.upvotes, item.comments, item.title
        );
        if let Some(response) = item
            .analysis
            .as_ref()
            .and_then(|analysis| analysis.suggested_response.as_ref())
        {
            println!("      suggested: {response}");
        }
    }
}
