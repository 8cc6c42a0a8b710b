//! Errors reported by the feed controller.

use crate::catalog::ProductId;
use thiserror::Error;

/// Failures the feed recovers from locally and reports upward.
///
/// By the time one of these is returned the feed is already back in a safe
/// state: a failed page stops pagination, a failed toggle is rolled back,
/// a failed import changes nothing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Listing request failed; pagination stopped
    #[error("Failed to load page {page}: {message}")]
    LoadPage { page: u32, message: String },

    /// Favorite toggle failed; the optimistic flag was rolled back
    #[error("Failed to toggle favorite for product {product_id}: {message}")]
    ToggleFavorite { product_id: ProductId, message: String },

    /// Toggle requested for a product that is not in the feed
    #[error("Product {0} is not in the feed")]
    UnknownProduct(ProductId),

    /// Import request failed
    #[error("Failed to import products: {0}")]
    Import(String),
}

impl FeedError {
    /// Returns the single line shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            FeedError::LoadPage { page: 1, .. } => {
                "Failed to load products. Please try again.".to_string()
            }
            FeedError::LoadPage { .. } => {
                "Could not load more products. Reload to try again.".to_string()
            }
            FeedError::ToggleFavorite { product_id, .. } => {
                format!("Could not update favorite for product {}.", product_id)
            }
            FeedError::UnknownProduct(id) => format!("Product {} is not loaded.", id),
            FeedError::Import(_) => "Failed to import products. Please try again.".to_string(),
        }
    }
}

/// Flattens an error chain into one line for [`FeedError`] messages.
pub(crate) fn describe(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_details() {
        let err = FeedError::LoadPage { page: 3, message: "status: 502".to_string() };
        assert_eq!(err.to_string(), "Failed to load page 3: status: 502");

        let err = FeedError::ToggleFavorite { product_id: 42, message: "timeout".to_string() };
        assert!(err.to_string().contains("product 42"));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            FeedError::Import("500".to_string()).user_message(),
            "Failed to import products. Please try again."
        );
        assert!(FeedError::UnknownProduct(7).user_message().contains('7'));
        assert!(!FeedError::LoadPage { page: 1, message: "x".to_string() }
            .user_message()
            .contains('x'));
        assert_eq!(
            FeedError::LoadPage { page: 3, message: "x".to_string() }.user_message(),
            "Could not load more products. Reload to try again."
        );
    }

    #[test]
    fn test_describe_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("Failed to send request");
        assert_eq!(describe(&err), "Failed to send request: connection refused");
    }
}
