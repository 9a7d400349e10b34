//! Casewatch CLI: refresh, watch, and query commands.
//!
//! Commands:
//! - `refresh`: run one refresh cycle and print a summary
//! - `watch`: run the background scheduler until interrupted (or `--ticks`)
//! - `rank`: ranked county or state list, pinned regions first
//! - `series`: rolling-window series for one region as JSON
//! - `economic`: one economic series, or the claims ratio / excess views
//! - `status`: economic cache status
//! - `causes`: leading causes of death reference table

use anyhow::{bail, Context, Result};
use casewatch_core::data::{GitCli, HttpSource, RemoteSource};
use casewatch_core::domain::{RegionKey, RegionKind};
use casewatch_runner::{
    spawn_scheduler, DashboardConfig, DashboardPipeline, QueryFacade, RefreshCoordinator,
    RefreshReport, RetryPolicy,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "casewatch",
    about = "Casewatch: COVID case and economic indicator dashboard backend"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one refresh cycle and print a summary.
    Refresh,
    /// Run the refresh scheduler in the foreground.
    Watch {
        /// Stop after this many ticks. Runs until interrupted when omitted.
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Ranked region list: pinned first, then by latest cumulative cases.
    Rank {
        #[arg(value_enum)]
        kind: KindArg,

        /// Extra pins ("County, State" or "State"), ahead of configured ones.
        #[arg(long = "pin")]
        pins: Vec<String>,

        /// Show every region instead of the configured display list.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Rolling-window series for one region (or the national total) as JSON.
    Series {
        /// "County, State", "State", or omit for the national series.
        region: Option<String>,

        /// Window length in days. Defaults to the configured window.
        #[arg(long)]
        window: Option<usize>,

        /// Percent growth over dates instead of new events over cumulative cases.
        #[arg(long, default_value_t = false)]
        percent: bool,
    },
    /// Economic views as JSON.
    Economic {
        #[command(subcommand)]
        view: EconomicArg,
    },
    /// Economic cache status.
    Status,
    /// Leading causes of death reference table.
    Causes,
}

#[derive(Subcommand)]
enum EconomicArg {
    /// One configured series by code (e.g. ICSA).
    Series { code: String },
    /// Continuing claims as a fraction of the employment level.
    ClaimsFraction,
    /// Cumulative new claims above a baseline date.
    ClaimsExcess {
        /// Baseline date (YYYY-MM-DD). Defaults to the configured baseline.
        #[arg(long)]
        baseline: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    County,
    State,
}

impl From<KindArg> for RegionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::County => RegionKind::County,
            KindArg::State => RegionKind::State,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Refresh => run_refresh(&config),
        Commands::Watch { ticks } => run_watch(&config, ticks),
        Commands::Rank { kind, pins, all } => run_rank(&config, kind.into(), &pins, all),
        Commands::Series {
            region,
            window,
            percent,
        } => run_series(&config, region.as_deref(), window, percent),
        Commands::Economic { view } => run_economic(&config, view),
        Commands::Status => run_status(&config),
        Commands::Causes => run_causes(),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<DashboardConfig> {
    match path {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(DashboardConfig::default()),
    }
}

fn build_pipeline(config: &DashboardConfig) -> Result<Arc<DashboardPipeline>> {
    let pipeline = DashboardPipeline::from_config(config, Arc::new(GitCli::new()), |spec| {
        Ok(Arc::new(HttpSource::fred(&spec.code)?) as Arc<dyn RemoteSource>)
    })?;
    Ok(Arc::new(pipeline))
}

fn build_coordinator(config: &DashboardConfig) -> Result<Arc<RefreshCoordinator>> {
    let pipeline = build_pipeline(config)?;
    Ok(Arc::new(RefreshCoordinator::new(
        pipeline,
        RetryPolicy::from(&config.retry),
    )))
}

fn build_facade(config: &DashboardConfig) -> Result<QueryFacade> {
    Ok(QueryFacade::from_config(build_coordinator(config)?, config))
}

fn run_refresh(config: &DashboardConfig) -> Result<()> {
    let coordinator = build_coordinator(config)?;
    let report = coordinator.refresh()?;
    let Some(snapshot) = coordinator.current() else {
        bail!("refresh reported {report:?} but no snapshot is published");
    };

    println!();
    println!("=== Refresh ===");
    match report {
        RefreshReport::Published {
            generation,
            attempts,
        } => println!("Generation:     {generation} ({attempts} attempt(s))"),
        RefreshReport::Coalesced => println!("Generation:     {} (coalesced)", snapshot.generation),
    }
    match snapshot.as_of() {
        Some(date) => println!("As of:          {date}"),
        None => println!("As of:          (no case data)"),
    }
    println!("Counties:       {}", snapshot.counties.len());
    println!("States:         {}", snapshot.states.len());
    println!("National cases: {}", snapshot.national.latest_cases());
    println!("Economic:       {}", snapshot.economic.len());
    for (code, series) in &snapshot.economic {
        match series.latest() {
            Some((date, value)) => println!("  {code:<12} {date}  {value:.1}"),
            None => println!("  {code:<12} (empty)"),
        }
    }
    println!("Fingerprint:    {}", &snapshot.fingerprint[..16.min(snapshot.fingerprint.len())]);
    println!();
    Ok(())
}

fn run_watch(config: &DashboardConfig, ticks: Option<u64>) -> Result<()> {
    let coordinator = build_coordinator(config)?;
    info!(
        interval_secs = config.refresh_interval_secs,
        ?ticks,
        "starting scheduler"
    );
    let handle = spawn_scheduler(coordinator, config.refresh_interval(), ticks)
        .context("spawning scheduler thread")?;
    // Without a tick limit this blocks until the process is interrupted.
    handle.join();
    Ok(())
}

fn run_rank(config: &DashboardConfig, kind: RegionKind, extra: &[String], all: bool) -> Result<()> {
    let facade = build_facade(config)?;

    let mut pins = Vec::new();
    for text in extra {
        match RegionKey::parse(text).filter(|k| k.kind() == kind) {
            Some(key) => pins.push(key),
            None => warn!(pin = %text, ?kind, "ignoring pin of a different region kind"),
        }
    }
    pins.extend(config.pinned(kind)?);

    if all {
        for (i, key) in facade.ranked_regions(kind, &pins)?.iter().enumerate() {
            println!("{:>4}  {key}", i + 1);
        }
        return Ok(());
    }

    let limit = match kind {
        RegionKind::County => config.county_limit,
        RegionKind::State => usize::MAX,
    };
    for entry in facade.display_order(kind, &pins, config.top_n, limit)? {
        let marker = if entry.highlighted { "*" } else { " " };
        println!("{marker} {}", entry.label);
    }
    Ok(())
}

fn run_series(
    config: &DashboardConfig,
    region: Option<&str>,
    window: Option<usize>,
    percent: bool,
) -> Result<()> {
    let facade = build_facade(config)?;
    let window = window.unwrap_or(config.window);
    if window == 0 {
        bail!("--window must be at least 1");
    }

    let result = match region {
        Some(text) => {
            let key = RegionKey::parse(text)
                .with_context(|| format!("'{text}' is not a region (\"County, State\" or \"State\")"))?;
            facade.series_for(&key, window, percent)
        }
        None => facade.national_series(window, percent),
    };

    match result {
        Ok(plot) => {
            println!("{}", serde_json::to_string_pretty(&plot)?);
            Ok(())
        }
        Err(e) if e.is_insufficient_history() => {
            warn!(error = %e, "not enough history for this window, nothing to plot");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_economic(config: &DashboardConfig, view: EconomicArg) -> Result<()> {
    let facade = build_facade(config)?;
    let json = match view {
        EconomicArg::Series { code } => serde_json::to_string_pretty(&facade.economic(&code)?)?,
        EconomicArg::ClaimsFraction => serde_json::to_string_pretty(&facade.claims_fraction()?)?,
        EconomicArg::ClaimsExcess { baseline } => {
            let baseline = baseline
                .as_deref()
                .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .transpose()
                .context("--baseline must be YYYY-MM-DD")?;
            serde_json::to_string_pretty(&facade.claims_excess(baseline)?)?
        }
    };
    println!("{json}");
    Ok(())
}

fn run_status(config: &DashboardConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let status = pipeline.economic_status();

    println!("Cache: {}", config.cache_dir().display());
    println!("Repository: {}", config.checkout_dir().display());
    println!();
    println!("{:<14} {:<8} {:<8} {:>12} {:>10}", "Source", "Cached", "Fresh", "Age", "Size");
    println!("{}", "-".repeat(56));
    for s in &status {
        let age = s.age_secs.map_or_else(|| "-".to_string(), format_age);
        let size = s.byte_count.map_or_else(|| "-".to_string(), format_size);
        println!(
            "{:<14} {:<8} {:<8} {:>12} {:>10}",
            s.source_id, s.cached, s.fresh, age, size
        );
    }
    Ok(())
}

fn run_causes() -> Result<()> {
    println!("{:<20} {:>10}", "Cause", "Deaths");
    println!("{}", "-".repeat(31));
    for entry in casewatch_core::reference::causes_of_death() {
        println!("{:<20} {:>10}", entry.cause, entry.deaths);
    }
    Ok(())
}

fn format_age(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
