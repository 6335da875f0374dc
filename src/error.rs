use thiserror::Error;

/// Errors reported by a bookmark store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bookmark node not found: {0}")]
    NodeNotFound(String),

    #[error("node {0} is the tree root and cannot be moved")]
    RootNotMovable(String),

    #[error("malformed bookmarks file: {0}")]
    Malformed(String),

    #[error("move rejected for node {node_id}: {reason}")]
    Rejected { node_id: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("file watch failed: {0}")]
    Watch(#[from] notify::Error),
}

/// Errors that abort a sort pass.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("failed to read bookmark tree: {0}")]
    ReadTree(#[source] StoreError),

    #[error("failed to move node {node_id} to index {index}: {source}")]
    Move {
        node_id: String,
        index: usize,
        #[source]
        source: StoreError,
    },

    #[error("failed to persist bookmark tree: {0}")]
    Flush(#[source] StoreError),
}
