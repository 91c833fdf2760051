//! Command-line driver for the matching engine.
//!
//! Usage:
//!     eval match --pool intents.json --text "Looking for iPhone 13 under 50k"
//!     eval match --postgrest-url http://127.0.0.1:3000 --text "Need a plumber" --category service
//!     eval cluster --profiles profiles.json
//!     eval health --postgrest-url http://127.0.0.1:3000

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use intentmatch_cluster::{cluster_profiles, ClusterConfig, ProfileRecord};
use intentmatch_engine::{Engine, EngineConfig};
use intentmatch_explain::{explain_match, summarize_match};
use intentmatch_features::HashingEmbedder;
use intentmatch_model::{Category, Intent, MatchResult, PostType};
use intentmatch_query::RuleInterpreter;
use intentmatch_store::{CandidateStore, MemoryStore, PostgrestConfig, PostgrestStore};

#[derive(Parser)]
#[command(name = "eval")]
#[command(about = "Run intent matching against a pool or a PostgREST backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PostTypeArg {
    Demand,
    Supply,
}

impl From<PostTypeArg> for PostType {
    fn from(arg: PostTypeArg) -> Self {
        match arg {
            PostTypeArg::Demand => PostType::Demand,
            PostTypeArg::Supply => PostType::Supply,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Find matches for a query text
    Match {
        /// JSON array of intents to match against
        #[arg(long, conflicts_with = "postgrest_url")]
        pool: Option<PathBuf>,

        /// PostgREST endpoint to fetch candidates from
        #[arg(long)]
        postgrest_url: Option<String>,

        #[arg(long)]
        api_key: Option<String>,

        /// Query text
        #[arg(short, long)]
        text: String,

        #[arg(short, long, default_value = "general")]
        category: String,

        #[arg(long, value_enum, default_value = "demand")]
        post_type: PostTypeArg,

        /// Location name of the query
        #[arg(short, long)]
        location: Option<String>,

        /// Owner id of the query; this owner's intents are never matched
        #[arg(long, default_value = "cli")]
        owner: String,

        /// Print per-component explanations
        #[arg(long)]
        explain: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// JSON engine config overriding the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Cluster user and business profiles
    Cluster {
        /// JSON array of profiles
        #[arg(short, long)]
        profiles: PathBuf,
    },

    /// Check backend health
    Health {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        postgrest_url: String,

        #[arg(long)]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intentmatch=debug".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Match {
            pool,
            postgrest_url,
            api_key,
            text,
            category,
            post_type,
            location,
            owner,
            explain,
            format,
            config,
        } => {
            let config = match config {
                Some(path) => EngineConfig::load(&path)?,
                None => EngineConfig::default(),
            };

            let mut query = Intent::new(
                "cli-query",
                owner,
                post_type.into(),
                Category::from(category.as_str()),
                text,
            )
            .with_created_at(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
            if let Some(location) = location {
                query = query.with_location_name(location);
            }

            let output = OutputOptions { explain, format };
            match (pool, postgrest_url) {
                (Some(pool), _) => {
                    let store = MemoryStore::from_json_file(&pool)
                        .with_context(|| format!("loading pool {}", pool.display()))?;
                    eprintln!("Loaded {} intents from {}", store.len(), pool.display());
                    run_match(store, config, &query, output).await?;
                }
                (None, Some(url)) => {
                    let store = postgrest_store(url, api_key)?;
                    run_match(store, config, &query, output).await?;
                }
                (None, None) => bail!("either --pool or --postgrest-url is required"),
            }
        }
        Commands::Cluster { profiles } => {
            run_cluster(&profiles)?;
        }
        Commands::Health {
            postgrest_url,
            api_key,
        } => {
            let store = postgrest_store(postgrest_url, api_key)?;
            run_health(&store).await?;
        }
    }

    Ok(())
}

struct OutputOptions {
    explain: bool,
    format: OutputFormat,
}

fn postgrest_store(base_url: String, api_key: Option<String>) -> Result<PostgrestStore> {
    let config = PostgrestConfig {
        base_url,
        api_key,
        ..Default::default()
    };
    Ok(PostgrestStore::new(config)?)
}

async fn run_match<S: CandidateStore>(
    store: S,
    config: EngineConfig,
    query: &Intent,
    output: OutputOptions,
) -> Result<()> {
    let engine = Engine::new(store, config)?
        .with_interpreter(Arc::new(RuleInterpreter::new()))
        .with_embedder(Arc::new(HashingEmbedder::default()));

    if output.format == OutputFormat::Text {
        println!("Matching: {}", query.raw_text);
        println!(
            "Post type: {} | Category: {}",
            query.post_type.as_str(),
            query.category.as_str()
        );
        println!("---");
    }

    let results = engine.find_matches(query).await;

    match output.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => print_results(query, &results, output.explain),
    }
    Ok(())
}

fn print_results(query: &Intent, results: &[MatchResult], explain: bool) {
    for (i, result) in results.iter().enumerate() {
        println!("\n{}. {} (Intent: {})", i + 1, result.raw_text, result.intent_id);
        println!(
            "   Owner: {} | Location: {}",
            result.owner_name,
            if result.location_name.is_empty() {
                "-"
            } else {
                result.location_name.as_str()
            }
        );
        print!("   Score: {:.2}", result.score);
        if let Some(confidence) = result.confidence {
            print!(" | Confidence: {:.2}", confidence);
        }
        if let Some(quality) = result.quality {
            print!(" | Quality: {}", quality.label());
        }
        println!();
        println!("   {}", summarize_match(result));

        if explain {
            for explanation in explain_match(result, &query.raw_text) {
                println!("     - {}: {}", explanation.summary, explanation.detail);
            }
        }
    }

    println!("\n---");
    println!("Total: {} matches", results.len());
}

fn run_cluster(path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading profiles {}", path.display()))?;
    let profiles: Vec<ProfileRecord> = serde_json::from_str(&raw)?;
    tracing::info!(profiles = profiles.len(), "Clustering profiles");

    let clusters = cluster_profiles(&profiles, &ClusterConfig::default());
    println!("{}", serde_json::to_string_pretty(&clusters)?);
    Ok(())
}

async fn run_health(store: &PostgrestStore) -> Result<()> {
    print!("Checking {} store... ", store.name());

    match store.health_check().await {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}
