use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;

use super::{move_in_tree, BookmarkStore};
use crate::bookmarks::{BookmarkEvent, BookmarkNode, ChangeKind};
use crate::error::StoreError;

/// In-memory bookmark store.
///
/// Emits a `Moved` event for every move, like a browser does, and exposes
/// mutators that stand in for edits made by the user.
pub struct MemoryStore {
    tree: Mutex<BookmarkNode>,
    moves_applied: Mutex<usize>,
    events: broadcast::Sender<BookmarkEvent>,
}

impl MemoryStore {
    pub fn new(root: BookmarkNode) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            tree: Mutex::new(root),
            moves_applied: Mutex::new(0),
            events,
        }
    }

    /// Number of moves applied since creation.
    pub fn moves_applied(&self) -> usize {
        *lock(&self.moves_applied)
    }

    /// Copy of the current tree.
    pub fn snapshot(&self) -> BookmarkNode {
        lock(&self.tree).clone()
    }

    /// Append `node` to the folder `parent_id`.
    pub fn insert(&self, parent_id: &str, mut node: BookmarkNode) -> Result<(), StoreError> {
        let node_id = node.id.clone();
        {
            let mut tree = lock(&self.tree);
            let parent = find_folder_mut(&mut tree, parent_id)?;
            node.parent_id = Some(parent_id.to_string());
            parent.children.get_or_insert_with(Vec::new).push(node);
        }
        self.emit(ChangeKind::Created, &node_id);
        Ok(())
    }

    /// Remove `node_id` and everything below it.
    pub fn remove(&self, node_id: &str) -> Result<(), StoreError> {
        {
            let mut tree = lock(&self.tree);
            let parent = tree
                .find_parent_mut(node_id)
                .ok_or_else(|| StoreError::NodeNotFound(node_id.to_string()))?;
            if let Some(children) = parent.children.as_mut() {
                children.retain(|child| child.id != node_id);
            }
        }
        self.emit(ChangeKind::Removed, node_id);
        Ok(())
    }

    /// Rename `node_id`.
    pub fn rename(&self, node_id: &str, title: &str) -> Result<(), StoreError> {
        {
            let mut tree = lock(&self.tree);
            let node = find_node_mut(&mut tree, node_id)?;
            node.title = title.to_string();
        }
        self.emit(ChangeKind::Changed, node_id);
        Ok(())
    }

    fn emit(&self, kind: ChangeKind, node_id: &str) {
        // Nobody listening is not an error.
        let _ = self.events.send(BookmarkEvent::new(kind, node_id));
    }
}

#[async_trait]
impl BookmarkStore for MemoryStore {
    async fn read_tree(&self) -> Result<BookmarkNode, StoreError> {
        Ok(self.snapshot())
    }

    async fn move_node(&self, node_id: &str, index: usize) -> Result<(), StoreError> {
        move_in_tree(&mut lock(&self.tree), node_id, index)?;
        *lock(&self.moves_applied) += 1;
        debug!("Moved {} to index {}", node_id, index);
        self.emit(ChangeKind::Moved, node_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent> {
        self.events.subscribe()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn find_node_mut<'a>(node: &'a mut BookmarkNode, id: &str) -> Result<&'a mut BookmarkNode, StoreError> {
    if node.id == id {
        return Ok(node);
    }
    node.children
        .as_mut()
        .and_then(|children| children.iter_mut().find_map(|child| find_node_mut(child, id).ok()))
        .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))
}

fn find_folder_mut<'a>(root: &'a mut BookmarkNode, id: &str) -> Result<&'a mut BookmarkNode, StoreError> {
    let node = find_node_mut(root, id)?;
    if !node.is_folder() {
        return Err(StoreError::Rejected {
            node_id: id.to_string(),
            reason: "not a folder".to_string(),
        });
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::ROOT_NODE_ID;

    fn store() -> MemoryStore {
        MemoryStore::new(BookmarkNode::folder(
            ROOT_NODE_ID,
            "",
            vec![BookmarkNode::folder(
                "1",
                "bar",
                vec![
                    BookmarkNode::bookmark("a", "a", "https://a.com/"),
                    BookmarkNode::bookmark("b", "b", "https://b.com/"),
                    BookmarkNode::bookmark("c", "c", "https://c.com/"),
                ],
            )],
        ))
    }

    #[tokio::test]
    async fn test_move_is_final_position() {
        let store = store();
        store.move_node("a", 2).await.unwrap();
        assert_eq!(store.snapshot().find("1").unwrap().child_ids(), vec!["b", "c", "a"]);

        store.move_node("a", 99).await.unwrap();
        assert_eq!(store.snapshot().find("1").unwrap().child_ids(), vec!["b", "c", "a"]);
        assert_eq!(store.moves_applied(), 2);
    }

    #[tokio::test]
    async fn test_move_errors() {
        let store = store();
        assert!(matches!(store.move_node("zzz", 0).await, Err(StoreError::NodeNotFound(_))));
        assert!(matches!(store.move_node(ROOT_NODE_ID, 0).await, Err(StoreError::RootNotMovable(_))));
        assert_eq!(store.moves_applied(), 0);
    }

    #[tokio::test]
    async fn test_events() {
        let store = store();
        let mut rx = store.subscribe();

        store.move_node("c", 0).await.unwrap();
        store.insert("1", BookmarkNode::bookmark("d", "d", "https://d.com/")).unwrap();
        store.rename("d", "Delta").unwrap();
        store.remove("a").unwrap();

        let kinds: Vec<_> = (0..4).map(|_| rx.try_recv().unwrap().kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Moved, ChangeKind::Created, ChangeKind::Changed, ChangeKind::Removed]
        );

        let tree = store.snapshot();
        assert_eq!(tree.find("1").unwrap().child_ids(), vec!["c", "b", "d"]);
        assert_eq!(tree.find("d").unwrap().parent_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_insert_into_leaf_rejected() {
        let store = store();
        let err = store.insert("a", BookmarkNode::bookmark("x", "x", "https://x.com/"));
        assert!(matches!(err, Err(StoreError::Rejected { .. })));
    }
}
