//! CLI command implementations.

pub mod browse;
pub mod favorite;
pub mod import;
pub mod list;

pub use browse::BrowseCommand;
pub use favorite::FavoriteCommand;
pub use import::ImportCommand;
pub use list::ListCommand;
