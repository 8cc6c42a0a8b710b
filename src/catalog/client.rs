//! HTTP client for the catalog service REST API.

use super::models::{
    decode_favorite, decode_import, decode_page, FavoriteState, ImportReceipt, Page, ProductId,
};
use crate::config::Config;
use crate::images::candidates::origin_of;
use crate::images::{ImageProbe, ImageSettings};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};
use wreq::Client;

/// Trait for catalog service operations - enables mocking for tests.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetches one page of products.
    async fn list_page(&self, page: u32, per_page: u32) -> Result<Page>;

    /// Toggles a product's favorite flag and returns the new server state.
    async fn toggle_favorite(&self, product_id: ProductId) -> Result<FavoriteState>;

    /// Asks the service to refresh its catalog from the original shop.
    async fn import_products(&self) -> Result<ImportReceipt>;
}

/// Catalog service HTTP client.
pub struct CatalogClient {
    client: Client,
    base_url: String,
    images: ImageSettings,
}

impl CatalogClient {
    /// Creates a client for the configured API URL.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config, config.api_url.clone())
    }

    /// Creates a client with a custom base URL (for testing).
    pub fn with_base_url(config: &Config, base_url: String) -> Result<Self> {
        let mut builder = Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut images = ImageSettings::from_config(config);
        images.local_origin = origin_of(&base_url).map(str::to_string);

        Ok(Self { client, base_url, images })
    }

    /// Returns the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the settings used to build image candidates.
    pub fn image_settings(&self) -> &ImageSettings {
        &self.images
    }

    async fn get(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request")?;

        Self::body(response).await
    }

    async fn post(&self, url: &str) -> Result<String> {
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .send()
            .await
            .context("Failed to send request")?;

        Self::body(response).await
    }

    async fn body(response: wreq::Response) -> Result<String> {
        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            anyhow::bail!("Catalog service returned status: {}", status);
        }

        response.text().await.context("Failed to read response body")
    }
}

#[async_trait]
impl CatalogService for CatalogClient {
    async fn list_page(&self, page: u32, per_page: u32) -> Result<Page> {
        let url = format!("{}/products?page={}&per_page={}", self.base_url, page, per_page);

        info!("Fetching products page {} ({} per page)", page, per_page);
        let body = self.get(&url).await?;
        decode_page(&body, page, per_page, &self.images)
    }

    async fn toggle_favorite(&self, product_id: ProductId) -> Result<FavoriteState> {
        let url = format!("{}/products/{}/favorite", self.base_url, product_id);

        info!("Toggling favorite for product {}", product_id);
        let body = self.post(&url).await?;
        decode_favorite(&body, product_id)
    }

    async fn import_products(&self) -> Result<ImportReceipt> {
        let url = format!("{}/products/import", self.base_url);

        info!("Triggering product import");
        let body = self.post(&url).await?;
        decode_import(&body)
    }
}

#[async_trait]
impl ImageProbe for CatalogClient {
    async fn loads(&self, url: &str) -> bool {
        let url = if url.starts_with("//") { format!("https:{}", url) } else { url.to_string() };

        match self.client.get(url.as_str()).header("Accept", "image/*").send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Image request failed for {}: {}", url, e);
                false
            }
        }
    }
}
