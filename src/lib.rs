//! Keeps a bookmark tree sorted by title, URL or service.
//!
//! [`orchestrator::SortOrchestrator`] is the entry point: it reads the
//! options and the tree, lets [`engine::compute_moves`] plan the moves and
//! applies them through a [`store::BookmarkStore`].
//! [`triggers::TriggerLayer`] starts passes when the tree or the options
//! change.

pub mod bookmarks;
pub mod browsers;
pub mod compare;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod messages;
pub mod moves;
pub mod options;
pub mod orchestrator;
pub mod scheduler;
pub mod store;
pub mod triggers;
pub mod url_factor;
pub mod watcher;

pub use bookmarks::BookmarkNode;
pub use error::{SortError, StoreError};
pub use options::ExtensionOptions;
pub use orchestrator::{SortOrchestrator, SortOutcome};
