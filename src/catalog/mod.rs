//! Catalog service client and data models.

pub mod client;
pub mod models;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{CatalogClient, CatalogService};
pub use models::{FavoriteState, ImportReceipt, Page, Product, ProductId};
