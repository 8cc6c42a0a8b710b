//! catalog-feed - Incremental product catalog browser
//!
//! Lists, browses and favorites products served by a catalog API.

use anyhow::Result;
use catalog_feed::commands::{BrowseCommand, FavoriteCommand, ImportCommand, ListCommand};
use catalog_feed::config::{Config, OutputFormat};
use catalog_feed::ProductId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "catalog-feed",
    version,
    about = "Incremental product catalog browser",
    long_about = "Pages through a catalog API with a large first page and smaller follow-up pages, \
                  toggles favorites optimistically and triggers catalog imports."
)]
struct Cli {
    /// Catalog API base URL
    #[arg(long, global = true, env = "CATALOG_API_URL")]
    api_url: Option<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "CATALOG_PROXY")]
    proxy: Option<String>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products page by page
    #[command(alias = "l")]
    List {
        /// Number of pages to load
        #[arg(short, long, default_value = "1")]
        pages: u32,

        /// Probe image sources and show the one that loads
        #[arg(long)]
        resolve_images: bool,
    },

    /// Browse the feed interactively
    #[command(alias = "b")]
    Browse,

    /// Toggle a product's favorite flag
    #[command(alias = "f")]
    Favorite {
        /// Product ID
        id: ProductId,
    },

    /// Import products into the catalog and show the refreshed first page
    Import,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(format) = cli.format {
        config.format = format;
    }

    match cli.command {
        Commands::List { pages, resolve_images } => {
            let cmd = ListCommand::new(config, pages, resolve_images);
            let output = cmd.execute().await?;
            println!("{}", output);
        }

        Commands::Browse => {
            let cmd = BrowseCommand::new(config);
            cmd.execute().await?;
        }

        Commands::Favorite { id } => {
            let cmd = FavoriteCommand::new(config);
            let output = cmd.execute(id).await?;
            println!("{}", output);
        }

        Commands::Import => {
            let cmd = ImportCommand::new(config);
            let output = cmd.execute().await?;
            println!("{}", output);
        }
    }

    Ok(())
}
