use std::{
    io,
    path::PathBuf,
    sync::{atomic::Ordering, Arc},
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flight_sweep::{
    report, FileCache, FlightSearch, HttpTransport, RankingComparator, RateLimitedDispatcher,
    SearchConfig, TripFile, TripSpec,
};

/// Fans a round-trip search out to the fare provider and lists the best options.
#[derive(Parser, Debug)]
#[command(name = "flight_sweep", version)]
struct Args {
    /// JSON trip file
    trip_file: PathBuf,

    /// Log the requests instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Neither read nor write the response cache
    #[arg(long)]
    no_cache: bool,

    /// Maximum request launches per second
    #[arg(long)]
    rps: Option<f64>,

    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Carrier favored among equally priced, equally long trips
    #[arg(long)]
    preferred_carrier: Option<String>,

    #[arg(long)]
    min_trip_length: Option<u32>,

    #[arg(long)]
    max_trip_length: Option<u32>,

    #[arg(long)]
    endpoint: Option<String>,

    /// Number of options to list
    #[arg(long)]
    top: Option<usize>,
}

impl Args {
    // File flags first, then command line overrides
    fn into_config(self) -> Result<(TripSpec, SearchConfig)> {
        let file = TripFile::load(&self.trip_file)
            .with_context(|| format!("Failed to load trip file {}", self.trip_file.display()))?;
        let (mut spec, mut config) = file.into_parts(SearchConfig::from_env());

        if self.dry_run {
            config.dry_run = true;
        }
        if self.no_cache {
            config.cache_enabled = false;
        }
        if let Some(rps) = self.rps {
            config.requests_per_second = rps;
        }
        if let Some(dir) = self.cache_dir {
            config.cache_dir = dir;
        }
        if let Some(carrier) = self.preferred_carrier {
            config.preferred_carrier = carrier;
        }
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(top) = self.top {
            config.top_n = top;
        }
        config.min_trip_length_days = self.min_trip_length;
        config.max_trip_length_days = self.max_trip_length;

        config.apply_trip_bounds(&mut spec);
        config.validate(&spec).context("Invalid configuration")?;
        Ok((spec, config))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Error: {e:?}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let (spec, config) = args.into_config()?;
    info!(
        dry_run = config.dry_run,
        cache = config.cache_enabled,
        rps = config.requests_per_second,
        "Starting flight search"
    );

    let transport = Arc::new(HttpTransport::new(
        config.endpoint.clone(),
        config.api_key.clone(),
    ));
    let cache = Arc::new(FileCache::new(config.cache_dir.clone()));
    let search = FlightSearch::new(
        RateLimitedDispatcher::new(transport, cache),
        RankingComparator::new(&config.preferred_carrier),
    );

    let outcome = search
        .run(&spec, &config.dispatch_config())
        .await
        .context("Flight search failed")?;

    let stats = search.dispatcher().stats();
    let cache_stats = search.dispatcher().cache().stats();
    info!(
        launched = stats.requests_launched.load(Ordering::SeqCst),
        succeeded = stats.requests_succeeded.load(Ordering::SeqCst),
        failed = stats.requests_failed.load(Ordering::SeqCst),
        network_calls = stats.network_calls.load(Ordering::SeqCst),
        cache_hits = stats.cache_hits.load(Ordering::SeqCst),
        cache_writes = stats.cache_writes.load(Ordering::SeqCst),
        cached_items = cache_stats.items_count,
        "Dispatch finished"
    );

    let stdout = io::stdout();
    report::render(&mut stdout.lock(), &outcome, config.top_n)
        .context("Failed to write results")?;
    Ok(())
}
