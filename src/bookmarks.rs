use serde::{Deserialize, Serialize};

/// Reserved id of the tree root.
pub const ROOT_NODE_ID: &str = "0";

/// Id of the bookmarks bar folder in Chromium-family trees.
pub const BOOKMARK_BAR_NODE_ID: &str = "1";

/// A node of the bookmark tree.
///
/// A node is either a leaf (has a `url`) or a container (has `children`),
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BookmarkNode>>,
}

impl BookmarkNode {
    /// Build a container. Children get their `parent_id` set to `id`.
    pub fn folder(id: impl Into<String>, title: impl Into<String>, children: Vec<BookmarkNode>) -> Self {
        let id = id.into();
        let children = children
            .into_iter()
            .map(|mut child| {
                child.parent_id = Some(id.clone());
                child
            })
            .collect();

        Self {
            id,
            parent_id: None,
            title: title.into(),
            url: None,
            children: Some(children),
        }
    }

    /// Build a leaf.
    pub fn bookmark(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            title: title.into(),
            url: Some(url.into()),
            children: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> &[BookmarkNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Depth-first search for a node by id.
    pub fn find(&self, id: &str) -> Option<&BookmarkNode> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }

    /// Find the container whose direct children include `id`.
    pub fn find_parent_mut(&mut self, id: &str) -> Option<&mut BookmarkNode> {
        let is_parent = self.children().iter().any(|child| child.id == id);
        if is_parent {
            return Some(self);
        }
        self.children
            .as_mut()?
            .iter_mut()
            .find_map(|child| child.find_parent_mut(id))
    }

    /// Ids of the direct children, in order.
    pub fn child_ids(&self) -> Vec<&str> {
        self.children().iter().map(|c| c.id.as_str()).collect()
    }

    /// Number of leaves below this node.
    pub fn count_bookmarks(&self) -> usize {
        match &self.children {
            Some(children) => children.iter().map(BookmarkNode::count_bookmarks).sum(),
            None => 1,
        }
    }
}

/// Kinds of change notifications emitted by a bookmark store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Removed,
    Changed,
    Moved,
    ChildrenReordered,
    ImportEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkEvent {
    pub kind: ChangeKind,
    pub node_id: String,
}

impl BookmarkEvent {
    pub fn new(kind: ChangeKind, node_id: impl Into<String>) -> Self {
        Self {
            kind,
            node_id: node_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BookmarkNode {
        BookmarkNode::folder(
            ROOT_NODE_ID,
            "",
            vec![BookmarkNode::folder(
                "1",
                "Bookmarks bar",
                vec![
                    BookmarkNode::bookmark("10", "Rust", "https://www.rust-lang.org/"),
                    BookmarkNode::folder("11", "Docs", vec![BookmarkNode::bookmark("12", "std", "https://doc.rust-lang.org/std/")]),
                ],
            )],
        )
    }

    #[test]
    fn test_folder_sets_parent_ids() {
        let root = sample();
        let bar = root.find("1").unwrap();
        assert_eq!(bar.parent_id.as_deref(), Some(ROOT_NODE_ID));
        assert_eq!(root.find("12").unwrap().parent_id.as_deref(), Some("11"));
    }

    #[test]
    fn test_leaf_xor_container() {
        let root = sample();
        let leaf = root.find("10").unwrap();
        assert!(!leaf.is_folder());
        assert!(leaf.url.is_some());
        assert!(root.find("11").unwrap().url.is_none());
    }

    #[test]
    fn test_find_parent_mut() {
        let mut root = sample();
        assert_eq!(root.find_parent_mut("12").map(|p| p.id.clone()), Some("11".to_string()));
        assert_eq!(root.find_parent_mut("1").map(|p| p.id.clone()), Some(ROOT_NODE_ID.to_string()));
        assert!(root.find_parent_mut(ROOT_NODE_ID).is_none());
    }

    #[test]
    fn test_count_bookmarks() {
        assert_eq!(sample().count_bookmarks(), 2);
    }

    #[test]
    fn test_serde_omits_absent_fields() {
        let leaf = BookmarkNode::bookmark("5", "Example", "https://example.com/");
        let json = serde_json::to_value(&leaf).unwrap();
        assert!(json.get("children").is_none());
        assert!(json.get("parent_id").is_none());
    }
}
