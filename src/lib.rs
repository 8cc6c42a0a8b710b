//! catalog-feed - Incremental product catalog browser
//!
//! Pages through a catalog service's product listing, keeps favorite flags in
//! sync with optimistic updates, and falls back through image sources until
//! one loads.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod feed;
pub mod format;
pub mod images;

pub use catalog::{CatalogClient, CatalogService, Page, Product, ProductId};
pub use config::Config;
pub use feed::{FavoriteSynchronizer, FeedError, ImportTrigger, PaginationController};
pub use images::{ImageResolver, ImageSource};
