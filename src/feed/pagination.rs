//! Incremental pagination over the catalog listing.
//!
//! The controller owns the feed and its page cursor. At most one page fetch
//! is in flight at a time; triggers that arrive meanwhile are dropped. Every
//! reset bumps a generation counter and a fetch that completes under an older
//! generation is discarded instead of appended.

use super::error::{describe, FeedError};
use crate::catalog::{CatalogService, Page, Product, ProductId};
use anyhow::Result;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Two-tier page size: a larger first page, smaller pages after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizePolicy {
    first: u32,
    subsequent: u32,
}

impl PageSizePolicy {
    pub fn new(first: u32, subsequent: u32) -> Self {
        Self { first: first.max(1), subsequent: subsequent.max(1) }
    }

    /// Returns the page size to request for `page`.
    pub fn size_for(&self, page: u32) -> u32 {
        if page <= 1 {
            self.first
        } else {
            self.subsequent
        }
    }
}

impl Default for PageSizePolicy {
    fn default() -> Self {
        Self::new(20, 10)
    }
}

/// Snapshot of the controller's page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    next_page: u32,
    has_more: bool,
    in_flight: bool,
    generation: u64,
}

impl PageCursor {
    fn new() -> Self {
        Self { next_page: 1, has_more: true, in_flight: false, generation: 0 }
    }

    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Why a `load_next` call did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A fetch is already outstanding
    InFlight,
    /// The service reported no more pages, or a fetch failed
    Exhausted,
}

/// Result of a `load_next` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was appended to the feed
    Appended { page: u32, count: usize, has_more: bool },
    /// Nothing was requested
    Skipped(SkipReason),
    /// The response arrived after a reset and was dropped
    Discarded,
}

#[derive(Debug)]
struct FeedState {
    products: Vec<Product>,
    cursor: PageCursor,
}

struct FetchTicket {
    page: u32,
    per_page: u32,
    generation: u64,
}

fn lock(state: &Mutex<FeedState>) -> MutexGuard<'_, FeedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight flag when a fetch ends, including when the fetching
/// future is dropped before completion.
struct InFlight<'a> {
    state: &'a Mutex<FeedState>,
    generation: u64,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a Mutex<FeedState>, generation: u64) -> Self {
        Self { state, generation, finished: false }
    }

    fn finish<R>(mut self, apply: impl FnOnce(&mut FeedState) -> R) -> R {
        self.finished = true;
        let mut state = lock(self.state);
        // After a reset the flag belongs to the new generation
        if state.cursor.generation == self.generation {
            state.cursor.in_flight = false;
        }
        apply(&mut state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = lock(self.state);
        if state.cursor.generation == self.generation {
            debug!("Page fetch dropped before completion");
            state.cursor.in_flight = false;
        }
    }
}

/// Owns the accumulated feed and drives page fetches.
pub struct PaginationController<C: CatalogService + ?Sized> {
    client: Arc<C>,
    policy: PageSizePolicy,
    state: Mutex<FeedState>,
}

impl<C: CatalogService + ?Sized> PaginationController<C> {
    /// Creates an empty controller positioned before page 1.
    pub fn new(client: Arc<C>, policy: PageSizePolicy) -> Self {
        let state = FeedState { products: Vec::new(), cursor: PageCursor::new() };
        Self { client, policy, state: Mutex::new(state) }
    }

    /// Returns the catalog service the controller fetches from.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn policy(&self) -> PageSizePolicy {
        self.policy
    }

    /// Fetches and appends the next page.
    ///
    /// A no-op while a fetch is in flight or after the last page. A failed
    /// fetch stops pagination and returns the error; it is not retried.
    pub async fn load_next(&self) -> Result<LoadOutcome, FeedError> {
        let ticket = match self.begin() {
            Ok(ticket) => ticket,
            Err(reason) => return Ok(LoadOutcome::Skipped(reason)),
        };

        let guard = InFlight::new(&self.state, ticket.generation);
        let response = self.client.list_page(ticket.page, ticket.per_page).await;
        guard.finish(|state| Self::apply(state, &ticket, response))
    }

    /// Clears the feed and rewinds to page 1 without fetching.
    ///
    /// A fetch still outstanding from before the reset is discarded when it
    /// completes.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.products.clear();
        state.cursor = PageCursor {
            next_page: 1,
            has_more: true,
            in_flight: false,
            generation: state.cursor.generation + 1,
        };
        info!("Feed reset (generation {})", state.cursor.generation);
    }

    /// Resets the feed and fetches the first page again.
    pub async fn reload(&self) -> Result<LoadOutcome, FeedError> {
        self.reset();
        self.load_next().await
    }

    /// Sets the favorite flag of every loaded product with `product_id`.
    ///
    /// Returns false when the product is not in the feed.
    pub fn update_favorite_flag(&self, product_id: ProductId, value: bool) -> bool {
        let mut state = self.lock();
        let mut found = false;
        for product in state.products.iter_mut().filter(|p| p.id == product_id) {
            product.is_favorite = value;
            found = true;
        }
        if !found {
            debug!("Favorite update for product {} not in feed", product_id);
        }
        found
    }

    pub fn favorite_flag(&self, product_id: ProductId) -> Option<bool> {
        self.lock().products.iter().find(|p| p.id == product_id).map(|p| p.is_favorite)
    }

    /// Returns a copy of the feed.
    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    /// Runs `f` over the feed without copying it.
    pub fn with_products<R>(&self, f: impl FnOnce(&[Product]) -> R) -> R {
        f(&self.lock().products)
    }

    pub fn product(&self, product_id: ProductId) -> Option<Product> {
        self.lock().products.iter().find(|p| p.id == product_id).cloned()
    }

    /// Returns the row index of a product in the feed.
    pub fn position_of(&self, product_id: ProductId) -> Option<usize> {
        self.lock().products.iter().position(|p| p.id == product_id)
    }

    /// Returns the id of the last loaded product while more pages remain.
    pub fn sentinel(&self) -> Option<ProductId> {
        let state = self.lock();
        if state.cursor.has_more {
            state.products.last().map(|p| p.id)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.lock().products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().products.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.lock().cursor.has_more
    }

    pub fn is_fetching(&self) -> bool {
        self.lock().cursor.in_flight
    }

    pub fn cursor(&self) -> PageCursor {
        self.lock().cursor
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        lock(&self.state)
    }

    fn begin(&self) -> Result<FetchTicket, SkipReason> {
        let mut state = self.lock();
        let cursor = &mut state.cursor;

        if cursor.in_flight {
            debug!("Page {} already in flight, dropping trigger", cursor.next_page);
            return Err(SkipReason::InFlight);
        }
        if !cursor.has_more {
            debug!("No more pages, dropping trigger");
            return Err(SkipReason::Exhausted);
        }

        cursor.in_flight = true;
        Ok(FetchTicket {
            page: cursor.next_page,
            per_page: self.policy.size_for(cursor.next_page),
            generation: cursor.generation,
        })
    }

    fn apply(
        state: &mut FeedState,
        ticket: &FetchTicket,
        response: Result<Page>,
    ) -> Result<LoadOutcome, FeedError> {
        if state.cursor.generation != ticket.generation {
            debug!(
                "Discarding page {} from generation {} (now {})",
                ticket.page, ticket.generation, state.cursor.generation
            );
            return Ok(LoadOutcome::Discarded);
        }

        match response {
            Ok(page) => {
                let has_more = page.has_more();
                let count = page.products.len();
                state.products.extend(page.products);
                state.cursor.has_more = has_more;
                state.cursor.next_page += 1;

                debug!(
                    "Appended {} products from page {} (server page {}/{}, has_more: {})",
                    count, ticket.page, page.current_page, page.last_page, has_more
                );
                Ok(LoadOutcome::Appended { page: ticket.page, count, has_more })
            }
            Err(e) => {
                state.cursor.has_more = false;
                warn!("Failed to load page {}: {:#}", ticket.page, e);
                Err(FeedError::LoadPage { page: ticket.page, message: describe(&e) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::mock::{page_of, product, MockCatalog};
    use tokio_test::{assert_pending, assert_ready, task};

    fn controller(mock: &Arc<MockCatalog>) -> PaginationController<MockCatalog> {
        PaginationController::new(Arc::clone(mock), PageSizePolicy::default())
    }

    fn ids(ctrl: &PaginationController<MockCatalog>) -> Vec<ProductId> {
        ctrl.with_products(|products| products.iter().map(|p| p.id).collect())
    }

    #[test]
    fn test_page_size_policy_tiers() {
        let policy = PageSizePolicy::default();
        assert_eq!(policy.size_for(1), 20);
        assert_eq!(policy.size_for(2), 10);
        assert_eq!(policy.size_for(17), 10);

        let policy = PageSizePolicy::new(0, 0);
        assert_eq!(policy.size_for(1), 1);
        assert_eq!(policy.size_for(2), 1);
    }

    #[tokio::test]
    async fn test_initial_state() {
        let mock = Arc::new(MockCatalog::new());
        let ctrl = controller(&mock);

        assert!(ctrl.is_empty());
        assert!(ctrl.has_more());
        assert!(!ctrl.is_fetching());
        assert_eq!(ctrl.cursor().next_page(), 1);
        assert_eq!(ctrl.cursor().generation(), 0);
        assert!(ctrl.sentinel().is_none());
    }

    #[tokio::test]
    async fn test_two_tier_scenario() {
        let mock = Arc::new(MockCatalog::new());
        mock.push_page(page_of(1..21, 1, 5));
        mock.push_page(page_of(21..31, 5, 5));
        let ctrl = controller(&mock);

        let outcome = ctrl.load_next().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended { page: 1, count: 20, has_more: true });
        assert!(ctrl.has_more());
        assert_eq!(ctrl.cursor().next_page(), 2);
        assert_eq!(ctrl.sentinel(), Some(20));

        let outcome = ctrl.load_next().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended { page: 2, count: 10, has_more: false });
        assert!(!ctrl.has_more());
        assert_eq!(ctrl.cursor().next_page(), 3);
        assert_eq!(ctrl.len(), 30);
        assert!(ctrl.sentinel().is_none());

        assert_eq!(mock.page_requests(), vec![(1, 20), (2, 10)]);
    }

    #[tokio::test]
    async fn test_has_more_ignores_response_length() {
        let mock = Arc::new(MockCatalog::new());
        // Short page but the server says more remain
        mock.push_page(page_of(1..4, 1, 2));
        // Full page that happens to be the last
        mock.push_page(page_of(4..14, 2, 2));
        let ctrl = controller(&mock);

        ctrl.load_next().await.unwrap();
        assert!(ctrl.has_more());

        ctrl.load_next().await.unwrap();
        assert!(!ctrl.has_more());
    }

    #[tokio::test]
    async fn test_exhausted_is_noop() {
        let mock = Arc::new(MockCatalog::new());
        mock.push_page(page_of(1..3, 1, 1));
        let ctrl = controller(&mock);

        ctrl.load_next().await.unwrap();
        let outcome = ctrl.load_next().await.unwrap();

        assert_eq!(outcome, LoadOutcome::Skipped(SkipReason::Exhausted));
        assert_eq!(mock.page_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_triggers_while_in_flight_send_one_request() {
        let mock = Arc::new(MockCatalog::new());
        let gate = mock.gate_page();
        let ctrl = controller(&mock);

        let mut first = task::spawn(ctrl.load_next());
        assert_pending!(first.poll());
        assert!(ctrl.is_fetching());

        for _ in 0..5 {
            let outcome = ctrl.load_next().await.unwrap();
            assert_eq!(outcome, LoadOutcome::Skipped(SkipReason::InFlight));
        }
        assert_eq!(mock.page_requests(), vec![(1, 20)]);

        gate.send(Ok(page_of(1..21, 1, 3))).unwrap();
        assert!(first.is_woken());
        let outcome = assert_ready!(first.poll()).unwrap();

        assert_eq!(outcome, LoadOutcome::Appended { page: 1, count: 20, has_more: true });
        assert!(!ctrl.is_fetching());
    }

    #[tokio::test]
    async fn test_failure_stops_pagination() {
        let mock = Arc::new(MockCatalog::new());
        mock.push_page(page_of(1..21, 1, 3));
        mock.push_page_error("Catalog service returned status: 502 Bad Gateway");
        let ctrl = controller(&mock);

        ctrl.load_next().await.unwrap();
        let err = ctrl.load_next().await.unwrap_err();

        assert_eq!(
            err,
            FeedError::LoadPage {
                page: 2,
                message: "Catalog service returned status: 502 Bad Gateway".to_string()
            }
        );
        assert!(!ctrl.has_more());
        assert!(!ctrl.is_fetching());
        assert_eq!(ctrl.len(), 20);
        assert_eq!(ctrl.cursor().next_page(), 2);

        // No automatic retry
        let outcome = ctrl.load_next().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Skipped(SkipReason::Exhausted));
        assert_eq!(mock.page_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_discards_late_response() {
        let mock = Arc::new(MockCatalog::new());
        let gate = mock.gate_page();
        let ctrl = controller(&mock);

        let mut stale = task::spawn(ctrl.load_next());
        assert_pending!(stale.poll());

        ctrl.reset();
        assert_eq!(ctrl.len(), 0);

        gate.send(Ok(page_of(1..21, 1, 3))).unwrap();
        let outcome = assert_ready!(stale.poll()).unwrap();

        assert_eq!(outcome, LoadOutcome::Discarded);
        assert_eq!(ctrl.len(), 0);
        let cursor = ctrl.cursor();
        assert_eq!(cursor.next_page(), 1);
        assert!(cursor.has_more());
        assert!(!cursor.in_flight());
        assert_eq!(cursor.generation(), 1);
    }

    #[tokio::test]
    async fn test_reset_discards_late_failure() {
        let mock = Arc::new(MockCatalog::new());
        let gate = mock.gate_page();
        let ctrl = controller(&mock);

        let mut stale = task::spawn(ctrl.load_next());
        assert_pending!(stale.poll());
        ctrl.reset();

        gate.send(Err("connection reset".to_string())).unwrap();
        let outcome = assert_ready!(stale.poll());

        assert_eq!(outcome, Ok(LoadOutcome::Discarded));
        assert!(ctrl.has_more());
    }

    #[tokio::test]
    async fn test_stale_completion_leaves_new_fetch_in_flight() {
        let mock = Arc::new(MockCatalog::new());
        let stale_gate = mock.gate_page();
        let fresh_gate = mock.gate_page();
        let ctrl = controller(&mock);

        let mut stale = task::spawn(ctrl.load_next());
        assert_pending!(stale.poll());

        ctrl.reset();
        let mut fresh = task::spawn(ctrl.load_next());
        assert_pending!(fresh.poll());
        assert_eq!(mock.page_requests(), vec![(1, 20), (1, 20)]);

        stale_gate.send(Ok(page_of(100..120, 1, 3))).unwrap();
        assert_eq!(assert_ready!(stale.poll()), Ok(LoadOutcome::Discarded));
        assert!(ctrl.is_fetching());
        assert_eq!(
            ctrl.load_next().await.unwrap(),
            LoadOutcome::Skipped(SkipReason::InFlight)
        );

        fresh_gate.send(Ok(page_of(1..21, 1, 3))).unwrap();
        assert!(assert_ready!(fresh.poll()).is_ok());
        assert_eq!(ids(&ctrl), (1..21).collect::<Vec<_>>());
        assert!(!ctrl.is_fetching());
    }

    #[tokio::test]
    async fn test_dropped_fetch_clears_in_flight() {
        let mock = Arc::new(MockCatalog::new());
        let _gate = mock.gate_page();
        mock.push_page(page_of(1..21, 1, 2));
        let ctrl = controller(&mock);

        let mut abandoned = task::spawn(ctrl.load_next());
        assert_pending!(abandoned.poll());
        drop(abandoned);

        assert!(!ctrl.is_fetching());
        let outcome = ctrl.load_next().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended { page: 1, count: 20, has_more: true });
    }

    #[tokio::test]
    async fn test_reload_fetches_first_page_again() {
        let mock = Arc::new(MockCatalog::new());
        mock.push_page(page_of(1..21, 1, 4));
        mock.push_page(page_of(21..31, 2, 4));
        mock.push_page(page_of(50..70, 1, 2));
        let ctrl = controller(&mock);

        ctrl.load_next().await.unwrap();
        ctrl.load_next().await.unwrap();
        let outcome = ctrl.reload().await.unwrap();

        assert_eq!(outcome, LoadOutcome::Appended { page: 1, count: 20, has_more: true });
        assert_eq!(ids(&ctrl), (50..70).collect::<Vec<_>>());
        assert_eq!(ctrl.cursor().generation(), 1);
        assert_eq!(mock.page_requests(), vec![(1, 20), (2, 10), (1, 20)]);
    }

    #[tokio::test]
    async fn test_reload_after_failure_resumes_pagination() {
        let mock = Arc::new(MockCatalog::new());
        mock.push_page_error("down");
        mock.push_page(page_of(1..21, 1, 2));
        let ctrl = controller(&mock);

        assert!(ctrl.load_next().await.is_err());
        assert!(!ctrl.has_more());

        ctrl.reload().await.unwrap();
        assert!(ctrl.has_more());
        assert_eq!(ctrl.len(), 20);
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_response_order() {
        let mock = Arc::new(MockCatalog::new());
        mock.push_page(page_of(1..4, 1, 2));
        mock.push_page(page_of(3..6, 2, 2));
        let ctrl = controller(&mock);

        ctrl.load_next().await.unwrap();
        ctrl.load_next().await.unwrap();

        assert_eq!(ids(&ctrl), vec![1, 2, 3, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_update_favorite_flag() {
        let mock = Arc::new(MockCatalog::new());
        let mut page = page_of(1..4, 1, 1);
        page.products.push(product(42, false));
        mock.push_page(page);
        let ctrl = controller(&mock);
        ctrl.load_next().await.unwrap();

        assert!(ctrl.update_favorite_flag(42, true));
        assert_eq!(ctrl.favorite_flag(42), Some(true));
        assert_eq!(ctrl.favorite_flag(1), Some(false));

        assert!(!ctrl.update_favorite_flag(999, true));
        assert_eq!(ctrl.favorite_flag(999), None);
        assert_eq!(ctrl.position_of(42), Some(3));
    }
}
