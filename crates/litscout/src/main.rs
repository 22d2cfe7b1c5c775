//! litscout CLI - Entry Point
//!
//! Runs the discovery engine's public operations from the command line:
//! multilayer search, deep search, and citation-map assembly.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use litscout::clock::SystemClock;
use litscout::formatters::{
    ResponseFormat, compact_map, compact_paper, format_citation_map_markdown,
    format_papers_markdown,
};
use litscout::genai::GenAiClient;
use litscout::pool::CredentialPool;
use litscout::scorer::RelevanceScorer;
use litscout::search::{SearchEngine, SearchOptions};
use litscout::sources::{PubMedClient, ScholarClient, SourceAdapter};
use litscout::{CitationGraphBuilder, Config};

#[derive(Parser, Debug)]
#[command(name = "litscout")]
#[command(about = "Literature discovery and citation-graph engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search for papers on a topic, relevance-scored
    Search {
        /// Research topic in natural language
        topic: String,

        /// Result count at which search strategies stop escalating
        #[arg(long, default_value = "5")]
        threshold: usize,

        /// Maximum papers to return
        #[arg(long, default_value = "50")]
        max_results: usize,

        /// Skip relevance scoring
        #[arg(long)]
        no_score: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "markdown")]
        format: ResponseFormat,
    },

    /// Deep search: expanded terms plus citation-network augmentation
    DeepSearch {
        /// Research topic in natural language
        topic: String,

        /// Maximum papers to return
        #[arg(long, default_value = "50")]
        max_results: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "markdown")]
        format: ResponseFormat,
    },

    /// Build a citation map around one paper
    CitationMap {
        /// Paper identifier or DOI
        id: String,

        /// Output format
        #[arg(long, value_enum, default_value = "markdown")]
        format: ResponseFormat,
    },
}

fn init_tracing(log_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let config = Config::from_env()?;
    let clock = Arc::new(SystemClock);
    let pool = Arc::new(CredentialPool::new(config.genai_api_keys.clone(), clock.clone()));
    let genai = Arc::new(GenAiClient::new(&config, pool)?);
    let scholar = Arc::new(ScholarClient::new(&config, clock.clone())?);
    let pubmed = Arc::new(PubMedClient::new(&config, clock.clone())?);
    let sources: Vec<Arc<dyn SourceAdapter>> = vec![scholar.clone(), pubmed];

    let result = run(cli.command, &config, clock, sources, scholar, genai).await;
    if let Err(err) = result {
        // Typed engine failures get the friendly rendering; the rest bubble up.
        match err.downcast_ref::<litscout::EngineError>() {
            Some(engine_err) => {
                eprintln!("error: {}", engine_err.to_user_message());
                std::process::exit(1);
            }
            None => return Err(err),
        }
    }
    Ok(())
}

async fn run(
    command: Command,
    config: &Config,
    clock: Arc<SystemClock>,
    sources: Vec<Arc<dyn SourceAdapter>>,
    scholar: Arc<ScholarClient>,
    genai: Arc<GenAiClient>,
) -> anyhow::Result<()> {
    match command {
        Command::Search { topic, threshold, max_results, no_score, format } => {
            let engine = SearchEngine::new(
                sources,
                Some(scholar),
                genai.clone(),
                clock.clone(),
                config,
            );
            let options = SearchOptions { threshold, max_results, sources: None };
            let mut papers = engine.search(&topic, &options).await?;

            if !no_score {
                let scorer = RelevanceScorer::new(genai, clock);
                papers = scorer.score(&topic, papers).await?;
            }

            print_papers(&papers, format);
        }
        Command::DeepSearch { topic, max_results, format } => {
            let engine = SearchEngine::new(sources, Some(scholar), genai, clock, config);
            let papers = engine.multilayer_search(&topic, max_results).await?;
            print_papers(&papers, format);
        }
        Command::CitationMap { id, format } => {
            let builder = CitationGraphBuilder::new(scholar, clock);
            let map = builder.build_map(&id).await?;
            match format {
                ResponseFormat::Markdown => println!("{}", format_citation_map_markdown(&map)),
                ResponseFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&compact_map(&map))?);
                }
            }
        }
    }
    Ok(())
}

fn print_papers(papers: &[litscout::Paper], format: ResponseFormat) {
    match format {
        ResponseFormat::Markdown => println!("{}", format_papers_markdown(papers)),
        ResponseFormat::Json => {
            let compact: Vec<_> = papers.iter().map(compact_paper).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&compact).unwrap_or_else(|_| "[]".to_string())
            );
        }
    }
}
