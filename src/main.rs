mod explore;

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use insights_analytics::{Choice, ConversationStore, LoadOutcome, ReportGenerator};
use insights_core::config::{AppConfig, SourceKind};
use insights_core::source::source_from_config;
use insights_core::types::{CallStatus, CallType};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "call-insights",
    about = "Filter call conversation records and report call metrics",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/call-insights/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the data source: a JSON file path or an http(s) URL
    #[arg(short, long, global = true)]
    source: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the dashboard for the filtered calls (default)
    Dashboard {
        #[command(flatten)]
        filters: FilterArgs,

        /// Emit the metrics snapshot as JSON instead of markdown
        #[arg(long)]
        json: bool,

        /// Rows in the recent calls table
        #[arg(long)]
        recent: Option<usize>,
    },

    /// List the agents present in the data
    Agents,

    /// Interactively adjust filters and inspect metrics
    Explore {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

/// Initial filter values; anything left out keeps its default.
#[derive(Args, Default)]
struct FilterArgs {
    /// First day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD, UTC), the whole day counts
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Widen the date range to cover all loaded data
    #[arg(long, conflicts_with_all = ["from", "to"])]
    all_time: bool,
    /// Exact agent identifier
    #[arg(long)]
    agent: Option<String>,
    /// all, inbound or outbound
    #[arg(long = "type")]
    call_type: Option<Choice<CallType>>,
    /// all, success, busy, transfer, no_answer or dropped
    #[arg(long)]
    status: Option<Choice<CallStatus>>,
    /// Substring of the caller number
    #[arg(long)]
    caller: Option<String>,
    /// Substring of the callee number
    #[arg(long)]
    callee: Option<String>,
    #[arg(long)]
    min_duration: Option<f64>,
    #[arg(long)]
    max_duration: Option<f64>,
    #[arg(long)]
    min_cost: Option<f64>,
    #[arg(long)]
    max_cost: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "call_insights=info,warn".into()),
        )
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Load config.
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Apply CLI overrides.
    if let Some(source) = &cli.source {
        if source.starts_with("http://") || source.starts_with("https://") {
            config.source.kind = SourceKind::Http;
            config.source.url = source.clone();
        } else {
            config.source.kind = SourceKind::File;
            config.source.path = PathBuf::from(source);
        }
    }

    match cli.command {
        Some(Commands::Config { action }) => handle_config_command(action, &config),
        Some(Commands::Agents) => {
            let store = load_store(&config).await?;
            for agent in store.sorted_agents() {
                println!("{}", agent);
            }
            Ok(())
        }
        Some(Commands::Explore { filters }) => {
            let mut store = load_store(&config).await?;
            apply_filters(&mut store, &filters);
            explore::run(config, store).await
        }
        Some(Commands::Dashboard {
            filters,
            json,
            recent,
        }) => {
            let mut store = load_store(&config).await?;
            apply_filters(&mut store, &filters);
            print_dashboard(&store, &config, json, recent)
        }
        None => {
            let store = load_store(&config).await?;
            print_dashboard(&store, &config, false, None)
        }
    }
}

/// Build a store with an event bus and load it once from the configured source.
async fn load_store(config: &AppConfig) -> Result<ConversationStore> {
    let source = source_from_config(&config.source)?;
    let mut store = ConversationStore::new(config.filters.clone())
        .with_event_bus(insights_core::EventBus::new());

    tracing::info!("Loading conversations from {}", source.describe());
    if let LoadOutcome::Failed(_) = store.load(&*source).await {
        tracing::warn!("Continuing without data");
    }
    Ok(store)
}

fn print_dashboard(
    store: &ConversationStore,
    config: &AppConfig,
    json: bool,
    recent: Option<usize>,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
    } else {
        let limit = recent.unwrap_or(config.dashboard.recent_calls);
        print!("{}", ReportGenerator::dashboard(store, limit));
    }
    Ok(())
}

fn apply_filters(store: &mut ConversationStore, args: &FilterArgs) {
    if args.all_time {
        if let Some(bounds) = store.date_range() {
            store.set_date_range(bounds.min, bounds.max);
        }
    }
    if let Some(from) = args.from {
        store.set_date_start(day_start_millis(from));
    }
    if let Some(to) = args.to {
        store.set_date_end(day_end_millis(to));
    }
    if let Some(agent) = &args.agent {
        store.set_agent(agent.clone());
    }
    if let Some(call_type) = args.call_type {
        store.set_call_type(call_type);
    }
    if let Some(status) = args.status {
        store.set_status(status);
    }
    if let Some(caller) = &args.caller {
        store.set_caller(caller.clone());
    }
    if let Some(callee) = &args.callee {
        store.set_callee(callee.clone());
    }
    if args.min_duration.is_some() || args.max_duration.is_some() {
        let current = store.filters().duration_range;
        store.set_duration_range(
            args.min_duration.unwrap_or(current.min),
            args.max_duration.unwrap_or(current.max),
        );
    }
    if args.min_cost.is_some() || args.max_cost.is_some() {
        let current = store.filters().cost_range;
        store.set_cost_range(
            args.min_cost.unwrap_or(current.min),
            args.max_cost.unwrap_or(current.max),
        );
    }
}

/// Midnight UTC at the start of `date`, in epoch milliseconds.
pub(crate) fn day_start_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Last millisecond of `date` in UTC.
pub(crate) fn day_end_millis(date: NaiveDate) -> i64 {
    date.succ_opt()
        .map(|next| day_start_millis(next) - 1)
        .unwrap_or(i64::MAX)
}

fn handle_config_command(action: Option<ConfigAction>, config: &AppConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            let path = AppConfig::default_path();
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                config.save()?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", AppConfig::default_path().display());
        }
    }
    Ok(())
}
