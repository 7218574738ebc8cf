//! Command line front end for redwork statistics.
//!
//! Usage:
//!   redwork-stats report --redis-url redis://localhost:6379/0
//!   redwork-stats report --format html > stats.html
//!   redwork-stats serve --port 8080
//!   redwork-stats config --config redwork.toml

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redwork::{
    RedisTopology, RedworkConfig, ReportFormat, StatsCollector, config::LoggingConfig,
    store::RedisStore,
};
use std::{path::PathBuf, process, sync::Arc};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "redwork-stats")]
#[command(about = "Inspect ready, unacked and consumer counts of Redis work queues")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Path to a TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "REDWORK_REDIS_URL", help = "Redis connection URL")]
    redis_url: Option<String>,

    #[arg(long, global = true, help = "Key prefix of the queue system")]
    prefix: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(short, long, global = true, help = "Suppress output except errors")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Collect a snapshot and print it")]
    Report {
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,

        #[arg(long, help = "Number of queues or connections to query at once")]
        concurrency: Option<usize>,
    },

    #[command(about = "Serve live reports over HTTP")]
    Serve {
        #[arg(long, help = "Address to bind")]
        bind: Option<String>,

        #[arg(short, long, help = "Port to listen on")]
        port: Option<u16>,
    },

    #[command(about = "Print the effective configuration as TOML")]
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    };

    if let Err(e) = setup_logging(&cli, &config.logging) {
        eprintln!("Error: failed to initialise logging: {:#}", e);
        process::exit(2);
    }

    if let Err(e) = run(cli.command, config).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<RedworkConfig> {
    let config = match &cli.config {
        Some(path) => RedworkConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => RedworkConfig::default(),
    };
    let mut config = config.merge_env()?;

    if let Some(url) = &cli.redis_url {
        config.redis.url = url.clone();
    }
    if let Some(prefix) = &cli.prefix {
        config.redis.key_prefix = prefix.clone();
    }
    Ok(config)
}

fn setup_logging(cli: &Cli, logging: &LoggingConfig) -> Result<()> {
    let log_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        logging.level.as_str()
    };

    let env_filter = EnvFilter::from_default_env()
        .add_directive(format!("redwork={}", log_level).parse()?)
        .add_directive(format!("redwork_stats={}", log_level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

async fn run(command: Commands, mut config: RedworkConfig) -> Result<()> {
    match command {
        Commands::Report {
            format,
            concurrency,
        } => {
            if let Some(concurrency) = concurrency {
                config = config.with_concurrency(concurrency);
            }
            let collector = connect(&config).await?;
            let stats = collector.collect_with_timeout().await?;
            print!("{}", format.render(&stats)?);
            if matches!(format, ReportFormat::Html | ReportFormat::Json | ReportFormat::Table) {
                println!();
            }
        }
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.dashboard.bind_address = bind;
            }
            if let Some(port) = port {
                config.dashboard.port = port;
            }
            serve(config).await?;
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

async fn connect(config: &RedworkConfig) -> Result<StatsCollector<RedisTopology<RedisStore>>> {
    let store = RedisStore::connect(&config.redis.url)
        .await
        .with_context(|| format!("failed to connect to {}", config.redis.url))?;
    debug!("Using key prefix {}", config.redis.key_prefix);

    let topology = RedisTopology::with_keys(Arc::new(store), config.redis.key_layout());
    Ok(StatsCollector::with_config(
        Arc::new(topology),
        config.collector.clone(),
    ))
}

#[cfg(feature = "dashboard")]
async fn serve(config: RedworkConfig) -> Result<()> {
    let collector = connect(&config).await?;
    let dashboard = redwork::StatsDashboard::new(collector, &config.dashboard)?;
    dashboard.start().await?;
    Ok(())
}

#[cfg(not(feature = "dashboard"))]
async fn serve(_config: RedworkConfig) -> Result<()> {
    anyhow::bail!("redwork-stats was built without the `dashboard` feature")
}
