//! List command implementation.

use crate::catalog::{CatalogClient, CatalogService};
use crate::config::{Config, OutputFormat};
use crate::feed::{LoadOutcome, PaginationController};
use crate::format::{Formatter, ResolvedProduct};
use crate::images::{ImageProbe, ImageResolver, ImageSettings};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Loads one or more pages of the feed and prints them.
pub struct ListCommand {
    config: Config,
    pages: u32,
    resolve_images: bool,
}

impl ListCommand {
    /// Creates a new list command.
    pub fn new(config: Config, pages: u32, resolve_images: bool) -> Self {
        Self { config, pages: pages.max(1), resolve_images }
    }

    /// Executes the listing and returns formatted output.
    pub async fn execute(&self) -> Result<String> {
        let client =
            Arc::new(CatalogClient::new(&self.config).context("Failed to create HTTP client")?);

        self.execute_with_client(Arc::clone(&client), client.as_ref()).await
    }

    /// Executes the listing with a provided service and image probe (for testing).
    pub async fn execute_with_client<C>(
        &self,
        client: Arc<C>,
        probe: &dyn ImageProbe,
    ) -> Result<String>
    where
        C: CatalogService + ?Sized,
    {
        let feed = PaginationController::new(client, self.config.page_policy());
        let mut notice = None;

        for _ in 0..self.pages {
            match feed.load_next().await {
                Ok(LoadOutcome::Appended { page, count, has_more }) => {
                    debug!("Page {} added {} products", page, count);
                    if !has_more {
                        break;
                    }
                }
                Ok(outcome) => {
                    debug!("Stopping at {:?}", outcome);
                    break;
                }
                Err(e) if feed.is_empty() => {
                    let message = e.user_message();
                    return Err(e).context(message);
                }
                Err(e) => {
                    warn!("{}", e);
                    notice = Some(e.user_message());
                    break;
                }
            }
        }

        let products = feed.products();
        info!("Listed {} products", products.len());

        let formatter = Formatter::new(self.config.format);
        let mut output = if self.resolve_images {
            let settings = ImageSettings::from_config(&self.config);
            let mut resolved = Vec::with_capacity(products.len());
            for product in products {
                let mut resolver = ImageResolver::for_product(&product, &settings);
                resolver.resolve_with(probe).await;
                resolved.push(ResolvedProduct::new(product, resolver.current()));
            }
            formatter.format_resolved(&resolved)
        } else {
            formatter.format_products(&products)
        };

        // Machine-readable formats stay parseable
        if matches!(self.config.format, OutputFormat::Table | OutputFormat::Markdown) {
            if let Some(notice) = notice {
                output.push_str(&format!("\n\n{}", notice));
            } else if feed.has_more() {
                output.push_str("\n\nMore products available. Use --pages to load more.");
            }
        }

        Ok(output)
    }
}
