//! Image candidate construction and the fallback resolver.

pub mod candidates;
pub mod resolver;

use async_trait::async_trait;

pub use candidates::{ImageSettings, ImageSource};
pub use resolver::{DisplayedImage, ImageResolver, ImageState};

/// Trait for checking whether an image URL loads - enables mocking for tests.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// Returns true if the image at `url` can be fetched.
    async fn loads(&self, url: &str) -> bool;
}
