//! Bookcover-Finder main entry point
//!
//! Command-line front end: looks up the cover image of one Amazon book
//! page and prints the lookup response as JSON.

use anyhow::Context;
use bookcover_finder::cache::describe_ttl;
use bookcover_finder::config::{load_config_with_hash, load_default_config, Config};
use bookcover_finder::{LookupService, ResolveOptions};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Bookcover-Finder: locates the cover image of an Amazon book page
///
/// Fetches the product page, runs the extraction strategies over it, and
/// caches the result in Redis or a local file.
#[derive(Parser, Debug)]
#[command(name = "bookcover-finder")]
#[command(version = "1.0.0")]
#[command(about = "Locates the cover image of an Amazon book page", long_about = None)]
struct Cli {
    /// Amazon product page to look up
    #[arg(value_name = "URL", required_unless_present = "show_config")]
    url: Option<String>,

    /// Path to TOML configuration file (defaults plus environment otherwise)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log every resolution stage at info level and report the matching strategy
    #[arg(long)]
    debug: bool,

    /// Include stage and strategy timings in the response
    #[arg(long)]
    profile: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_deref())?;

    if cli.show_config {
        print_config(&config);
        return Ok(ExitCode::SUCCESS);
    }

    let service = LookupService::from_config(&config)
        .await
        .context("Failed to initialize lookup service")?;

    let options = ResolveOptions {
        debug: cli.debug,
        profile: cli.profile,
    };
    let response = service.lookup(cli.url.as_deref(), options).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.success {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::debug!(status = response.status.http_status(), "Lookup failed");
        Ok(ExitCode::FAILURE)
    }
}

/// Loads the configuration file when given, else defaults with env overrides
fn load(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => load_default_config().context("Invalid environment configuration"),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only the JSON response.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bookcover_finder=info,warn"),
            1 => EnvFilter::new("bookcover_finder=debug,info"),
            2 => EnvFilter::new("bookcover_finder=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --show-config
fn print_config(config: &Config) {
    println!("=== Bookcover-Finder Configuration ===\n");

    println!("Cache:");
    println!("  Key prefix: {}", config.cache.key_prefix);
    println!("  Timeout: {}", describe_ttl(config.cache.timeout_secs));
    match &config.cache.redis_url {
        Some(url) => println!("  Redis URL: {}", url),
        None => println!("  Redis URL: (disabled)"),
    }
    println!("  File path: {}", config.cache.file_path);

    println!("\nRequests:");
    println!("  Connect timeout: {}s", config.request.connect_timeout_secs);
    println!("  Read timeout: {}s", config.request.read_timeout_secs);
    println!("  Max retries: {}", config.request.max_retries);
    println!("  Backoff factor: {}s", config.request.backoff_factor_secs);

    println!("\nUser Agents ({}):", config.request.user_agents.len());
    for agent in &config.request.user_agents {
        println!("  - {}", agent);
    }
}
