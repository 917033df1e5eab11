use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use restaurant_finder::clock::{Clock, SystemClock};
use restaurant_finder::config::{Config, ProviderKind};
use restaurant_finder::mcp::McpServer;
use restaurant_finder::providers::{self, UsageReport};
use restaurant_finder::tools::ToolRegistry;

#[derive(Parser)]
#[command(name = "restaurant-finder")]
#[command(about = "Restaurant search tools over MCP, with response caching and free-tier tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve restaurant tools over stdin/stdout
    Serve {
        /// Provider backing the tools: google or yelp (default: from config)
        #[arg(short, long)]
        provider: Option<ProviderKind>,
    },
    /// Show cache performance and free-tier usage
    Stats {
        /// Only show this provider (default: both)
        #[arg(short, long)]
        provider: Option<ProviderKind>,
    },
    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Configure restaurant-finder
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
        /// Provider the API key belongs to
        #[arg(short, long, default_value = "google")]
        provider: ProviderKind,
        /// Set API key
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete cached responses
    Clear {
        /// Only clear this provider's cache (default: both)
        #[arg(short, long)]
        provider: Option<ProviderKind>,
        /// Only delete entries older than this many days
        #[arg(long)]
        older_than_days: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restaurant_finder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { provider } => {
            serve(provider).await?;
        }
        Commands::Stats { provider } => {
            show_stats(provider)?;
        }
        Commands::Cache {
            action: CacheAction::Clear {
                provider,
                older_than_days,
            },
        } => {
            clear_cache(provider, older_than_days)?;
        }
        Commands::Config {
            show,
            provider,
            api_key,
        } => {
            handle_config(show, provider, api_key)?;
        }
    }

    Ok(())
}

fn selected(provider: Option<ProviderKind>) -> Vec<ProviderKind> {
    match provider {
        Some(kind) => vec![kind],
        None => vec![ProviderKind::Google, ProviderKind::Yelp],
    }
}

async fn serve(provider: Option<ProviderKind>) -> Result<()> {
    let config = Config::load()?;
    let kind = provider.unwrap_or(config.default_provider);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let server = match kind {
        ProviderKind::Google => {
            let client = Arc::new(providers::create_places_client(&config, clock)?);
            McpServer::new(
                "restaurant-finder-mcp",
                ToolRegistry::for_places(client.clone(), client),
            )
        }
        ProviderKind::Yelp => {
            let client = Arc::new(providers::create_business_client(&config, clock)?);
            McpServer::new(
                "yelp-finder-mcp",
                ToolRegistry::for_business(client.clone(), client),
            )
        }
    };

    tracing::info!(
        "Serving {} tools for provider {}",
        server.registry().tool_names().len(),
        kind
    );
    server.serve_stdio().await
}

fn show_stats(provider: Option<ProviderKind>) -> Result<()> {
    let config = Config::load()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    for kind in selected(provider) {
        let cache = providers::open_cache(&config, kind, clock.clone())?;
        let meter = providers::open_meter(&config, kind, clock.clone())?;
        let report = UsageReport::collect(cache.stats(), meter.as_ref())?;

        println!("[{}]", kind);
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
        if let Some(warning) = &report.warning {
            println!("{}", warning);
        }
    }

    Ok(())
}

fn clear_cache(provider: Option<ProviderKind>, older_than_days: Option<u64>) -> Result<()> {
    let config = Config::load()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    for kind in selected(provider) {
        let cache = providers::open_cache(&config, kind, clock.clone())?;
        let removed = match older_than_days {
            Some(days) => cache.clear_older_than(days)?,
            None => cache.clear()?,
        };
        println!("✓ Removed {} cached {} responses", removed, kind);
    }

    Ok(())
}

fn handle_config(show: bool, provider: ProviderKind, api_key: Option<String>) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        let mut shown = config.clone();
        for key in [&mut shown.google.api_key, &mut shown.yelp.api_key] {
            if key.is_some() {
                *key = Some("********".to_string());
            }
        }
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&shown)?);
        return Ok(());
    }

    if let Some(key) = api_key {
        config.set_api_key(provider, key);
        config.save()?;
        println!("{} API key updated", provider);
        println!("Configuration saved to: {:?}", Config::config_path()?);
    } else {
        println!("No changes made. Use --show to view current configuration.");
    }

    Ok(())
}
