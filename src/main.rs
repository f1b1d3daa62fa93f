//! georesolve - command-line geocoding lookup
//!
//! Thin wrapper over [`GeocodingService`]: parse arguments, run one
//! resolution, print the ranked candidates.

use anyhow::{Context, Result};
use clap::Parser;
use georesolve::{GeocodeOptions, GeocodingConfig, GeocodingService, ProviderKind};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "georesolve")]
#[command(about = "Resolve a place query to candidate coordinates")]
#[command(version)]
struct Args {
    /// Free-text place query, e.g. "Lisbon" or "221B Baker Street"
    query: String,

    /// Provider to prefer: nominatim, google, or mapbox
    #[arg(short, long)]
    provider: Option<String>,

    /// API key / access token for the preferred provider
    #[arg(long, env = "GEORESOLVE_API_KEY")]
    api_key: Option<String>,

    /// Maximum number of candidates
    #[arg(short, long, default_value_t = 5)]
    limit: usize,

    /// Result language (BCP47 tag)
    #[arg(long)]
    language: Option<String>,

    /// Restrict to a country (ISO 3166-1 alpha-2, repeatable)
    #[arg(long = "country")]
    countries: Vec<String>,

    /// Overall resolution deadline in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Bypass the result cache
    #[arg(long)]
    force_fresh: bool,

    /// Print results as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Path to a TOML config file
    #[arg(short, long, env = "GEORESOLVE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "georesolve=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let preferred_provider = args
        .provider
        .as_deref()
        .map(str::parse::<ProviderKind>)
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let config = GeocodingConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    let service = GeocodingService::new(config).context("Failed to build geocoding service")?;

    let options = GeocodeOptions {
        preferred_provider,
        api_key: args.api_key,
        limit: args.limit,
        countries: args.countries,
        language: args.language,
        timeout: Some(Duration::from_millis(args.timeout_ms)),
        force_fresh: args.force_fresh,
        ..Default::default()
    };

    info!(query = %args.query, "resolving");
    let results = service.resolve(&args.query, &options).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for (index, result) in results.iter().enumerate() {
        let address = result.formatted_address.as_deref().unwrap_or("(no address)");
        println!(
            "{:>2}. {}  [{:.5}, {:.5}]  confidence {:.2}  via {}",
            index + 1,
            address,
            result.latitude,
            result.longitude,
            result.confidence,
            result.source,
        );
    }

    if results.iter().all(|r| r.source.is_synthetic()) {
        eprintln!("note: no provider answered; coordinates are a synthetic estimate");
    }

    Ok(())
}
