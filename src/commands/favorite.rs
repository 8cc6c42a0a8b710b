//! Favorite command implementation.

use crate::catalog::{CatalogClient, CatalogService, ProductId};
use crate::config::Config;
use crate::format::Formatter;
use anyhow::{Context, Result};
use tracing::info;

/// Toggles one product's favorite flag and reports the server's answer.
pub struct FavoriteCommand {
    config: Config,
}

impl FavoriteCommand {
    /// Creates a new favorite command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes the toggle and returns formatted output.
    pub async fn execute(&self, product_id: ProductId) -> Result<String> {
        let client = CatalogClient::new(&self.config).context("Failed to create HTTP client")?;

        self.execute_with_client(&client, product_id).await
    }

    /// Executes the toggle with a provided client (for testing).
    pub async fn execute_with_client(
        &self,
        client: &(impl CatalogService + ?Sized),
        product_id: ProductId,
    ) -> Result<String> {
        let state = client
            .toggle_favorite(product_id)
            .await
            .with_context(|| format!("Could not update favorite for product {}", product_id))?;

        info!("Product {} favorite={}", state.product_id, state.is_favorite);

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_favorite(&state))
    }
}
