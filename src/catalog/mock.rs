//! Scripted catalog service for unit tests.
//!
//! Each call pops the next scripted reply. A gated reply stays pending until
//! the test sends the outcome through the returned sender, which is how
//! tests hold a request in flight.

use super::client::CatalogService;
use super::models::{FavoriteState, ImportReceipt, Page, Product, ProductId};
use crate::images::ImageSource;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

pub(crate) type Gate<T> = oneshot::Sender<Result<T, String>>;

enum Reply<T> {
    Ready(Result<T, String>),
    Gated(oneshot::Receiver<Result<T, String>>),
}

async fn resolve<T>(reply: Option<Reply<T>>, what: &str) -> Result<T> {
    match reply {
        Some(Reply::Ready(result)) => result.map_err(anyhow::Error::msg),
        Some(Reply::Gated(rx)) => match rx.await {
            Ok(result) => result.map_err(anyhow::Error::msg),
            Err(_) => anyhow::bail!("{} gate dropped", what),
        },
        None => anyhow::bail!("no scripted {} reply", what),
    }
}

fn gated<T>(queue: &Mutex<VecDeque<Reply<T>>>) -> Gate<T> {
    let (tx, rx) = oneshot::channel();
    queue.lock().unwrap().push_back(Reply::Gated(rx));
    tx
}

#[derive(Default)]
pub(crate) struct MockCatalog {
    pages: Mutex<VecDeque<Reply<Page>>>,
    toggles: Mutex<VecDeque<Reply<FavoriteState>>>,
    imports: Mutex<VecDeque<Reply<ImportReceipt>>>,
    page_requests: Mutex<Vec<(u32, u32)>>,
    toggle_requests: Mutex<Vec<ProductId>>,
    import_calls: AtomicU32,
}

impl MockCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_page(&self, page: Page) {
        self.pages.lock().unwrap().push_back(Reply::Ready(Ok(page)));
    }

    pub(crate) fn push_page_error(&self, message: &str) {
        self.pages.lock().unwrap().push_back(Reply::Ready(Err(message.to_string())));
    }

    pub(crate) fn gate_page(&self) -> Gate<Page> {
        gated(&self.pages)
    }

    pub(crate) fn push_toggle(&self, product_id: ProductId, is_favorite: bool) {
        self.toggles
            .lock()
            .unwrap()
            .push_back(Reply::Ready(Ok(FavoriteState { product_id, is_favorite })));
    }

    pub(crate) fn push_toggle_error(&self, message: &str) {
        self.toggles.lock().unwrap().push_back(Reply::Ready(Err(message.to_string())));
    }

    pub(crate) fn gate_toggle(&self) -> Gate<FavoriteState> {
        gated(&self.toggles)
    }

    pub(crate) fn push_import(&self, message: &str) {
        self.imports
            .lock()
            .unwrap()
            .push_back(Reply::Ready(Ok(ImportReceipt { message: message.to_string() })));
    }

    pub(crate) fn push_import_error(&self, message: &str) {
        self.imports.lock().unwrap().push_back(Reply::Ready(Err(message.to_string())));
    }

    pub(crate) fn gate_import(&self) -> Gate<ImportReceipt> {
        gated(&self.imports)
    }

    pub(crate) fn page_requests(&self) -> Vec<(u32, u32)> {
        self.page_requests.lock().unwrap().clone()
    }

    pub(crate) fn toggle_requests(&self) -> Vec<ProductId> {
        self.toggle_requests.lock().unwrap().clone()
    }

    pub(crate) fn import_calls(&self) -> u32 {
        self.import_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogService for MockCatalog {
    async fn list_page(&self, page: u32, per_page: u32) -> Result<Page> {
        self.page_requests.lock().unwrap().push((page, per_page));
        let reply = self.pages.lock().unwrap().pop_front();
        resolve(reply, "page").await
    }

    async fn toggle_favorite(&self, product_id: ProductId) -> Result<FavoriteState> {
        self.toggle_requests.lock().unwrap().push(product_id);
        let reply = self.toggles.lock().unwrap().pop_front();
        resolve(reply, "toggle").await
    }

    async fn import_products(&self) -> Result<ImportReceipt> {
        self.import_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.imports.lock().unwrap().pop_front();
        resolve(reply, "import").await
    }
}

/// Builds a product with a single remote image.
pub(crate) fn product(id: ProductId, is_favorite: bool) -> Product {
    Product {
        id,
        name: format!("Product {}", id),
        price: Some(Decimal::new(1999, 2)),
        image_candidates: vec![ImageSource::Remote(format!("https://cdn.test/{}.jpg", id))],
        is_favorite,
    }
}

/// Builds a page holding products `ids` with the given pagination signal.
pub(crate) fn page_of(ids: std::ops::Range<ProductId>, current_page: u32, last_page: u32) -> Page {
    let products: Vec<Product> = ids.map(|id| product(id, false)).collect();
    Page { per_page: products.len() as u32, total: 0, products, current_page, last_page }
}
