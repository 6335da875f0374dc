//! Bookmark stores.
//!
//! A store owns the bookmark tree. The sorter only reads snapshots and asks
//! the store to move nodes.

mod chromium;
mod memory;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::bookmarks::{BookmarkEvent, BookmarkNode};
use crate::error::StoreError;

pub use chromium::ChromiumBookmarkFile;
pub use memory::MemoryStore;

#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Full snapshot of the tree, rooted at the reserved root node.
    async fn read_tree(&self) -> Result<BookmarkNode, StoreError>;

    /// Place `node_id` at `index` among its current siblings. The node is
    /// removed first, so `index` is its final position.
    async fn move_node(&self, node_id: &str, index: usize) -> Result<(), StoreError>;

    /// Persist pending changes. Stores that write through do nothing.
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Change notifications.
    fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent>;
}

/// Move `node_id` inside `root`, shared by the in-memory stores.
pub(crate) fn move_in_tree(root: &mut BookmarkNode, node_id: &str, index: usize) -> Result<(), StoreError> {
    if root.id == node_id {
        return Err(StoreError::RootNotMovable(node_id.to_string()));
    }

    let parent = root
        .find_parent_mut(node_id)
        .ok_or_else(|| StoreError::NodeNotFound(node_id.to_string()))?;
    let children = parent
        .children
        .as_mut()
        .ok_or_else(|| StoreError::NodeNotFound(node_id.to_string()))?;
    let current = children
        .iter()
        .position(|child| child.id == node_id)
        .ok_or_else(|| StoreError::NodeNotFound(node_id.to_string()))?;

    let node = children.remove(current);
    let index = index.min(children.len());
    children.insert(index, node);
    Ok(())
}
