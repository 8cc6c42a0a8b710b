//! Optimistic favorite toggling with rollback.

use super::error::{describe, FeedError};
use super::pagination::PaginationController;
use crate::catalog::{CatalogService, ProductId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A toggle waiting for the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteMutation {
    pub product_id: ProductId,
    pub previous_value: bool,
    pub requested_value: bool,
}

/// Applies favorite toggles to the feed before the server answers, then
/// settles on the server's value or rolls back.
///
/// Toggles on the same product are not serialized: each one captures its own
/// previous value, and the last response to arrive wins.
pub struct FavoriteSynchronizer<C: CatalogService + ?Sized> {
    feed: Arc<PaginationController<C>>,
}

impl<C: CatalogService + ?Sized> Clone for FavoriteSynchronizer<C> {
    fn clone(&self) -> Self {
        Self { feed: Arc::clone(&self.feed) }
    }
}

impl<C: CatalogService + ?Sized> FavoriteSynchronizer<C> {
    pub fn new(feed: Arc<PaginationController<C>>) -> Self {
        Self { feed }
    }

    /// Flips a product's favorite flag and returns the server's final value.
    pub async fn toggle(&self, product_id: ProductId) -> Result<bool, FeedError> {
        let previous_value =
            self.feed.favorite_flag(product_id).ok_or(FeedError::UnknownProduct(product_id))?;
        let mutation =
            FavoriteMutation { product_id, previous_value, requested_value: !previous_value };

        self.feed.update_favorite_flag(product_id, mutation.requested_value);

        match self.feed.client().toggle_favorite(product_id).await {
            Ok(state) => {
                if state.is_favorite != mutation.requested_value {
                    debug!(
                        "Server kept product {} favorite={} against requested {}",
                        product_id, state.is_favorite, mutation.requested_value
                    );
                }
                self.feed.update_favorite_flag(product_id, state.is_favorite);
                info!("Product {} favorite={}", product_id, state.is_favorite);
                Ok(state.is_favorite)
            }
            Err(e) => {
                warn!("Favorite toggle for product {} failed, rolling back: {:#}", product_id, e);
                self.feed.update_favorite_flag(product_id, mutation.previous_value);
                Err(FeedError::ToggleFavorite { product_id, message: describe(&e) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::mock::{page_of, product, MockCatalog};
    use crate::catalog::FavoriteState;
    use crate::feed::pagination::PageSizePolicy;
    use tokio_test::{assert_pending, assert_ready, task};

    async fn loaded_feed(mock: &Arc<MockCatalog>) -> Arc<PaginationController<MockCatalog>> {
        let mut page = page_of(1..5, 1, 3);
        page.products.push(product(42, false));
        page.products.push(product(43, true));
        mock.push_page(page);

        let feed = Arc::new(PaginationController::new(Arc::clone(mock), PageSizePolicy::default()));
        feed.load_next().await.unwrap();
        feed
    }

    #[tokio::test]
    async fn test_toggle_is_optimistic_then_confirmed() {
        let mock = Arc::new(MockCatalog::new());
        let feed = loaded_feed(&mock).await;
        let gate = mock.gate_toggle();
        let sync = FavoriteSynchronizer::new(Arc::clone(&feed));

        let mut toggle = task::spawn(sync.toggle(42));
        assert_pending!(toggle.poll());
        // Flipped before any response arrives
        assert_eq!(feed.favorite_flag(42), Some(true));

        gate.send(Ok(FavoriteState { product_id: 42, is_favorite: true })).unwrap();
        assert_eq!(assert_ready!(toggle.poll()), Ok(true));
        assert_eq!(feed.favorite_flag(42), Some(true));
        assert_eq!(mock.toggle_requests(), vec![42]);
    }

    #[tokio::test]
    async fn test_toggle_failure_rolls_back() {
        let mock = Arc::new(MockCatalog::new());
        let feed = loaded_feed(&mock).await;
        let gate = mock.gate_toggle();
        let sync = FavoriteSynchronizer::new(Arc::clone(&feed));

        let mut toggle = task::spawn(sync.toggle(42));
        assert_pending!(toggle.poll());
        assert_eq!(feed.favorite_flag(42), Some(true));

        gate.send(Err("Catalog service returned status: 500".to_string())).unwrap();
        let err = assert_ready!(toggle.poll()).unwrap_err();

        assert!(matches!(err, FeedError::ToggleFavorite { product_id: 42, .. }));
        assert_eq!(feed.favorite_flag(42), Some(false));
    }

    #[tokio::test]
    async fn test_toggle_off_and_rollback_to_true() {
        let mock = Arc::new(MockCatalog::new());
        let feed = loaded_feed(&mock).await;
        mock.push_toggle_error("timeout");
        let sync = FavoriteSynchronizer::new(Arc::clone(&feed));

        assert!(sync.toggle(43).await.is_err());
        assert_eq!(feed.favorite_flag(43), Some(true));
    }

    #[tokio::test]
    async fn test_server_value_wins_over_requested() {
        let mock = Arc::new(MockCatalog::new());
        let feed = loaded_feed(&mock).await;
        mock.push_toggle(42, false);
        let sync = FavoriteSynchronizer::new(Arc::clone(&feed));

        assert_eq!(sync.toggle(42).await, Ok(false));
        assert_eq!(feed.favorite_flag(42), Some(false));
    }

    #[tokio::test]
    async fn test_rapid_double_toggle_last_response_wins() {
        let mock = Arc::new(MockCatalog::new());
        let feed = loaded_feed(&mock).await;
        let first_gate = mock.gate_toggle();
        let second_gate = mock.gate_toggle();
        let sync = FavoriteSynchronizer::new(Arc::clone(&feed));

        let mut first = task::spawn(sync.toggle(42));
        assert_pending!(first.poll());
        assert_eq!(feed.favorite_flag(42), Some(true));

        let mut second = task::spawn(sync.toggle(42));
        assert_pending!(second.poll());
        assert_eq!(feed.favorite_flag(42), Some(false));
        assert_eq!(mock.toggle_requests(), vec![42, 42]);

        second_gate.send(Ok(FavoriteState { product_id: 42, is_favorite: false })).unwrap();
        assert_eq!(assert_ready!(second.poll()), Ok(false));

        first_gate.send(Ok(FavoriteState { product_id: 42, is_favorite: true })).unwrap();
        assert_eq!(assert_ready!(first.poll()), Ok(true));

        assert_eq!(feed.favorite_flag(42), Some(true));
    }

    #[tokio::test]
    async fn test_unknown_product_sends_nothing() {
        let mock = Arc::new(MockCatalog::new());
        let feed = loaded_feed(&mock).await;
        let sync = FavoriteSynchronizer::new(feed);

        assert_eq!(sync.toggle(999).await, Err(FeedError::UnknownProduct(999)));
        assert!(mock.toggle_requests().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_resolving_after_reset_is_harmless() {
        let mock = Arc::new(MockCatalog::new());
        let feed = loaded_feed(&mock).await;
        let gate = mock.gate_toggle();
        let sync = FavoriteSynchronizer::new(Arc::clone(&feed));

        let mut toggle = task::spawn(sync.toggle(42));
        assert_pending!(toggle.poll());
        feed.reset();

        gate.send(Err("offline".to_string())).unwrap();
        assert!(assert_ready!(toggle.poll()).is_err());
        assert!(feed.is_empty());
    }
}
