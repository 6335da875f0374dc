use futures::future::try_join_all;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::SortError;
use crate::store::BookmarkStore;

/// Request to place a node at `index` among its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOperation {
    pub node_id: String,
    pub parent_id: String,
    pub index: usize,
}

impl MoveOperation {
    pub fn new(node_id: impl Into<String>, parent_id: impl Into<String>, index: usize) -> Self {
        Self {
            node_id: node_id.into(),
            parent_id: parent_id.into(),
            index,
        }
    }
}

/// Issue all moves against `store` and wait for every one of them.
///
/// Parents are processed concurrently; moves under one parent are issued in
/// the order they were planned. The first failure rejects the whole batch.
pub async fn apply_moves(store: &dyn BookmarkStore, moves: &[MoveOperation]) -> Result<usize, SortError> {
    if moves.is_empty() {
        debug!("No moves to apply");
        return Ok(0);
    }

    let batches = group_by_parent(moves);
    info!("🔀 Applying {} moves across {} folders", moves.len(), batches.len());

    let tasks = batches.into_iter().map(|(parent_id, batch)| async move {
        for op in &batch {
            store
                .move_node(&op.node_id, op.index)
                .await
                .map_err(|source| SortError::Move {
                    node_id: op.node_id.clone(),
                    index: op.index,
                    source,
                })?;
        }
        debug!("Folder {} reordered with {} moves", parent_id, batch.len());
        Ok::<usize, SortError>(batch.len())
    });

    let applied = try_join_all(tasks).await?;
    Ok(applied.into_iter().sum())
}

fn group_by_parent(moves: &[MoveOperation]) -> Vec<(&str, Vec<&MoveOperation>)> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut batches: Vec<(&str, Vec<&MoveOperation>)> = Vec::new();

    for op in moves {
        let slot = *positions.entry(op.parent_id.as_str()).or_insert_with(|| {
            batches.push((op.parent_id.as_str(), Vec::new()));
            batches.len() - 1
        });
        batches[slot].1.push(op);
    }

    batches
}
