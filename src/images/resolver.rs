//! Per-product image fallback state machine.

use super::candidates::{ImageSettings, ImageSource};
use super::ImageProbe;
use crate::catalog::Product;
use tracing::debug;

/// Resolution state of a product image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    /// Displaying the candidate at this index
    Candidate(usize),
    /// Every candidate failed, the placeholder is displayed
    Exhausted,
}

/// What the presentation layer should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayedImage<'a> {
    Source(&'a ImageSource),
    Placeholder(&'a str),
}

impl<'a> DisplayedImage<'a> {
    pub fn url(&self) -> &'a str {
        match *self {
            DisplayedImage::Source(source) => source.url(),
            DisplayedImage::Placeholder(url) => url,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, DisplayedImage::Placeholder(_))
    }
}

/// Steps through a product's image candidates on load failure, ending at a
/// generated placeholder that is never fetched.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    candidates: Vec<ImageSource>,
    placeholder: String,
    state: ImageState,
    loading: bool,
}

impl ImageResolver {
    /// Creates a resolver over candidates in priority order.
    ///
    /// With no candidates the resolver starts exhausted.
    pub fn new(candidates: Vec<ImageSource>, placeholder: impl Into<String>) -> Self {
        let state =
            if candidates.is_empty() { ImageState::Exhausted } else { ImageState::Candidate(0) };
        Self { candidates, placeholder: placeholder.into(), loading: state != ImageState::Exhausted, state }
    }

    /// Creates a resolver for a product.
    pub fn for_product(product: &Product, settings: &ImageSettings) -> Self {
        Self::new(product.image_candidates.clone(), settings.placeholder(&product.name))
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == ImageState::Exhausted
    }

    /// True while the displayed candidate has neither loaded nor failed.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the image to display in the current state.
    pub fn current(&self) -> DisplayedImage<'_> {
        match self.state {
            ImageState::Candidate(i) => DisplayedImage::Source(&self.candidates[i]),
            ImageState::Exhausted => DisplayedImage::Placeholder(&self.placeholder),
        }
    }

    /// Records that the displayed candidate failed to load and moves to the
    /// next one. Failures reported once exhausted are ignored.
    pub fn on_load_failure(&mut self) -> ImageState {
        self.state = match self.state {
            ImageState::Candidate(i) if i + 1 < self.candidates.len() => {
                self.loading = true;
                ImageState::Candidate(i + 1)
            }
            ImageState::Candidate(_) | ImageState::Exhausted => {
                self.loading = false;
                ImageState::Exhausted
            }
        };
        self.state
    }

    /// Records that the displayed image loaded.
    pub fn on_load_success(&mut self) {
        self.loading = false;
    }

    /// Drives the state machine by probing each candidate in turn until one
    /// loads or all have failed. Returns the URL that ends up displayed.
    pub async fn resolve_with<P: ImageProbe + ?Sized>(&mut self, probe: &P) -> &str {
        while let ImageState::Candidate(i) = self.state {
            if !self.loading {
                break;
            }
            let url = self.candidates[i].url();
            if probe.loads(url).await {
                debug!("Image candidate {} loaded: {}", i, url);
                self.on_load_success();
            } else {
                debug!("Image candidate {} failed: {}", i, url);
                self.on_load_failure();
            }
        }
        self.current().url()
    }
}
