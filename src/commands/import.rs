//! Import command implementation.

use crate::catalog::{CatalogClient, CatalogService};
use crate::config::{Config, OutputFormat};
use crate::feed::{ImportOutcome, ImportTrigger, PaginationController};
use crate::format::Formatter;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

/// Triggers the bulk import and shows the refreshed first page.
pub struct ImportCommand {
    config: Config,
}

impl ImportCommand {
    /// Creates a new import command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes the import and returns formatted output.
    pub async fn execute(&self) -> Result<String> {
        let client = CatalogClient::new(&self.config).context("Failed to create HTTP client")?;

        self.execute_with_client(Arc::new(client)).await
    }

    /// Executes the import with a provided client (for testing).
    pub async fn execute_with_client<C>(&self, client: Arc<C>) -> Result<String>
    where
        C: CatalogService + ?Sized,
    {
        let feed = Arc::new(PaginationController::new(client, self.config.page_policy()));
        let trigger = ImportTrigger::new(Arc::clone(&feed));

        let report = match trigger.run().await {
            Ok(ImportOutcome::Completed(report)) => report,
            Ok(ImportOutcome::AlreadyRunning) => anyhow::bail!("An import is already running"),
            Err(e) => {
                let message = e.user_message();
                return Err(e).context(message);
            }
        };

        let formatter = Formatter::new(self.config.format);
        let human = matches!(self.config.format, OutputFormat::Table | OutputFormat::Markdown);

        let mut sections = Vec::new();
        if human {
            sections.push(report.message.clone());
        }

        match report.reload {
            Ok(_) => sections.push(formatter.format_products(&feed.products())),
            Err(e) => {
                warn!("Reload after import failed: {}", e);
                if human {
                    sections.push(e.user_message());
                } else {
                    sections.push(formatter.format_products(&[]));
                }
            }
        }

        Ok(sections.join("\n\n"))
    }
}
