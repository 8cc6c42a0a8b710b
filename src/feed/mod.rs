//! Feed controller: pagination, favorites, import and scroll triggering.

pub mod error;
pub mod favorites;
pub mod import;
pub mod pagination;
pub mod scroll;
pub mod viewport;

pub use error::FeedError;
pub use favorites::{FavoriteMutation, FavoriteSynchronizer};
pub use import::{ImportOutcome, ImportReport, ImportTrigger};
pub use pagination::{LoadOutcome, PageCursor, PageSizePolicy, PaginationController, SkipReason};
pub use scroll::{ProximityMargin, ScrollTrigger, SubscriptionId, VisibilityEvent, VisibilityObserver};
pub use viewport::{Viewport, ViewportObserver};
