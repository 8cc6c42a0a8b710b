//! Domain models for catalog products, pages, and favorite state, plus the
//! normalization from the catalog service's loosely-typed JSON.

use crate::images::{ImageSettings, ImageSource};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, warn};

/// Stable product identifier assigned by the catalog service.
pub type ProductId = u64;

/// A catalog product as held in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier
    pub id: ProductId,
    /// Product name
    pub name: String,
    /// Normalized price, `None` when the service sent nothing usable
    pub price: Option<Decimal>,
    /// Image sources in fallback priority order
    pub image_candidates: Vec<ImageSource>,
    /// Favorite flag, may be transiently stale during a toggle
    pub is_favorite: bool,
}

impl Product {
    /// Returns the price formatted with two decimals, or `N/A`.
    pub fn price_label(&self) -> String {
        match self.price {
            Some(price) => format!("{:.2}", price),
            None => "N/A".to_string(),
        }
    }

    /// Returns the kind of the highest-priority image source.
    pub fn primary_image_kind(&self) -> &'static str {
        self.image_candidates.first().map(ImageSource::kind).unwrap_or("none")
    }
}

/// One page of the product listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Products in response order
    pub products: Vec<Product>,
    /// Page number the service says it returned
    pub current_page: u32,
    /// Last page number the service knows about
    pub last_page: u32,
    /// Page size the service applied
    pub per_page: u32,
    /// Total products in the catalog
    pub total: u64,
}

impl Page {
    /// True when the service reports pages after this one.
    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// Authoritative favorite state returned by a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteState {
    pub product_id: ProductId,
    pub is_favorite: bool,
}

/// Acknowledgement of a bulk import request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReceipt {
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    data: Vec<Value>,
    #[serde(default)]
    current_page: Option<Value>,
    #[serde(default)]
    last_page: Option<Value>,
    #[serde(default)]
    per_page: Option<Value>,
    #[serde(default)]
    total: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireProduct {
    id: Value,
    #[serde(default)]
    name: Value,
    #[serde(default)]
    price: Value,
    #[serde(default)]
    image_url: Option<String>,
    // Laravel's withExists names the column favorite_exists
    #[serde(default)]
    favorite_exists: Option<Value>,
    #[serde(default)]
    is_favorite: Option<Value>,
    #[serde(default)]
    has_local_image: Option<Value>,
    #[serde(default)]
    local_image_url: Option<String>,
    #[serde(default)]
    local_image_path: Option<String>,
    #[serde(default)]
    original_data: Option<Value>,
}

impl WireProduct {
    fn into_product(self, images: &ImageSettings) -> Option<Product> {
        let id = coerce_u64(&self.id)?;

        let name = match self.name {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };

        let price = normalize_price(&self.price);
        if price.is_none() && !self.price.is_null() {
            debug!("Product {} has unparseable price {}", id, self.price);
        }

        let is_favorite =
            self.favorite_exists.or(self.is_favorite).map(|v| coerce_bool(&v)).unwrap_or(false);

        let has_local = self.has_local_image.as_ref().map(coerce_bool);
        let explicit_local = self.local_image_url.or(self.local_image_path);
        let (local, remote) = match (has_local, explicit_local) {
            (Some(false), _) => (None, self.image_url),
            (_, Some(local)) => (Some(local), self.image_url),
            // The flag alone means image_url already points at the stored copy
            (Some(true), None) => (self.image_url, None),
            (None, None) => (None, self.image_url),
        };

        let original_pic = self.original_data.as_ref().and_then(original_pic);

        let image_candidates =
            images.candidates(local.as_deref(), remote.as_deref(), original_pic.as_deref());

        Some(Product { id, name, price, image_candidates, is_favorite })
    }
}

/// Decodes a listing response body into a [`Page`].
///
/// Individual rows that cannot be decoded are skipped; only a body that is
/// not a page envelope at all is an error. Missing pagination fields are
/// treated as "this is the last page".
pub fn decode_page(
    body: &str,
    requested_page: u32,
    requested_size: u32,
    images: &ImageSettings,
) -> Result<Page> {
    let envelope: PageEnvelope =
        serde_json::from_str(body).context("Unexpected product listing response")?;

    let mut products = Vec::with_capacity(envelope.data.len());
    for row in envelope.data {
        match serde_json::from_value::<WireProduct>(row) {
            Ok(wire) => match wire.into_product(images) {
                Some(product) => products.push(product),
                None => warn!("Skipping product row without a usable id"),
            },
            Err(e) => warn!("Skipping malformed product row: {}", e),
        }
    }

    let current_page = envelope.current_page.as_ref().and_then(coerce_u32);
    let last_page = envelope.last_page.as_ref().and_then(coerce_u32);
    if current_page.is_none() || last_page.is_none() {
        warn!("Page {} response lacks current_page/last_page, treating as last page", requested_page);
    }
    let current_page = current_page.unwrap_or(requested_page);
    let last_page = last_page.unwrap_or(current_page);

    let per_page = envelope.per_page.as_ref().and_then(coerce_u32).unwrap_or(requested_size);
    let total =
        envelope.total.as_ref().and_then(coerce_u64).unwrap_or(products.len() as u64);

    Ok(Page { products, current_page, last_page, per_page, total })
}

/// Decodes a favorite toggle response.
pub fn decode_favorite(body: &str, requested: ProductId) -> Result<FavoriteState> {
    #[derive(Deserialize)]
    struct Wire {
        #[serde(default)]
        product_id: Option<Value>,
        #[serde(default)]
        is_favorite: Option<Value>,
    }

    let wire: Wire = serde_json::from_str(body).context("Unexpected favorite response")?;
    let Some(is_favorite) = wire.is_favorite.as_ref().map(coerce_bool) else {
        anyhow::bail!("Favorite response for product {} lacks is_favorite", requested);
    };

    let product_id = wire.product_id.as_ref().and_then(coerce_u64).unwrap_or(requested);
    if product_id != requested {
        warn!("Favorite response names product {} but {} was toggled", product_id, requested);
    }

    Ok(FavoriteState { product_id: requested, is_favorite })
}

/// Decodes an import response.
pub fn decode_import(body: &str) -> Result<ImportReceipt> {
    #[derive(Deserialize)]
    struct Wire {
        #[serde(default)]
        message: Option<String>,
    }

    let wire: Wire = serde_json::from_str(body).context("Unexpected import response")?;
    Ok(ImportReceipt { message: wire.message.unwrap_or_else(|| "Import started".to_string()) })
}

/// Normalizes a price that may arrive as a number or a numeric string.
pub fn normalize_price(value: &Value) -> Option<Decimal> {
    let price = match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(|f| Decimal::from_str(&format!("{:.4}", f)).ok()))?,
        Value::String(s) => parse_price_text(s)?,
        _ => return None,
    };

    Some(price.round_dp(2))
}

/// Parses a textual price such as `"19.99"`, `"€ 19,99"` or `"1.299,00"`.
fn parse_price_text(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    // Ranges like "10-20" keep the lower bound
    let first = text.split('-').find(|part| part.chars().any(|c| c.is_ascii_digit()))?;

    let cleaned: String =
        first.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        // 1.299,00
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        // 1,299.00
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        // 1,299,000
        (None, Some(_)) if cleaned.matches(',').count() > 1 => cleaned.replace(',', ""),
        // 19,99
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    let price = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -price } else { price })
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_u32(value: &Value) -> Option<u32> {
    coerce_u64(value).and_then(|n| u32::try_from(n).ok())
}

/// Extracts the relative picture path from the raw original-site metadata,
/// which the service sends either as an object or as a JSON-encoded string.
fn original_pic(data: &Value) -> Option<String> {
    let pic = match data {
        Value::Object(map) => map.get("pic").cloned(),
        Value::String(raw) => serde_json::from_str::<Value>(raw).ok()?.get("pic").cloned(),
        _ => None,
    }?;

    match pic {
        Value::String(path) if !path.trim().is_empty() => Some(path.trim().to_string()),
        _ => None,
    }
}
