use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::BookmarkStore;
use crate::bookmarks::{BookmarkEvent, BookmarkNode, ChangeKind, ROOT_NODE_ID};
use crate::error::StoreError;
use crate::watcher::{watch_file, FileFingerprint};

/// Permanent folders, in the order they appear under the root.
const ROOT_FOLDERS: &[&str] = &["bookmark_bar", "other", "synced"];

#[derive(Default)]
struct Document {
    json: Option<Value>,
    dirty: bool,
    backed_up: bool,
}

/// Chromium-family `Bookmarks` JSON file (Chrome, Brave, Edge, ...).
///
/// Moves are applied to an in-memory copy of the document and written back
/// by [`BookmarkStore::flush`]. Fields this crate does not understand
/// (`guid`, `date_added`, `meta_info`, ...) are kept as they are.
pub struct ChromiumBookmarkFile {
    path: PathBuf,
    document: Mutex<Document>,
    fingerprint: Arc<FileFingerprint>,
    events: broadcast::Sender<BookmarkEvent>,
}

impl ChromiumBookmarkFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("bookmarks file not found: {}", path.display()),
            )));
        }

        let (events, _) = broadcast::channel(64);
        Ok(Self {
            fingerprint: Arc::new(FileFingerprint::new(&path)),
            path,
            document: Mutex::new(Document::default()),
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Watch the file for edits made by the browser. Our own writes are not
    /// reported.
    pub fn watch(&self) -> Result<JoinHandle<()>, StoreError> {
        let events = self.events.clone();
        let handle = watch_file(self.fingerprint.clone(), move || {
            let _ = events.send(BookmarkEvent::new(ChangeKind::Changed, ROOT_NODE_ID));
        })?;
        Ok(handle)
    }

    /// Drop the in-memory document so the next access reads the file again.
    fn discard(doc: &mut Document) {
        doc.json = None;
        doc.dirty = false;
    }

    fn backup_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Bookmarks".to_string());
        self.path.with_file_name(format!("{}.bak", name))
    }

    fn load(&self) -> Result<Value, StoreError> {
        let data = std::fs::read_to_string(&self.path)?;
        let json: Value = serde_json::from_str(&data)?;
        if !json.get("roots").map(Value::is_object).unwrap_or(false) {
            return Err(StoreError::Malformed("missing \"roots\" object".to_string()));
        }
        Ok(json)
    }

    fn document(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, doc: &mut Document) -> Result<(), StoreError> {
        if !doc.backed_up {
            let backup = self.backup_path();
            std::fs::copy(&self.path, &backup)?;
            info!("💾 Backup created: {:?}", backup);
            doc.backed_up = true;
        }

        match doc.json.as_ref() {
            Some(json) => self.write(json),
            None => Ok(()),
        }
    }

    fn write(&self, json: &Value) -> Result<(), StoreError> {
        let mut json = json.clone();
        // The checksum covers the old order; Chromium accepts a file without one.
        if let Some(obj) = json.as_object_mut() {
            obj.remove("checksum");
        }

        let data = serde_json::to_string_pretty(&json)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &data)?;
        // Known before the rename so the watcher never reports our own write.
        self.fingerprint.record(data.as_bytes());
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl BookmarkStore for ChromiumBookmarkFile {
    async fn read_tree(&self) -> Result<BookmarkNode, StoreError> {
        let mut doc = self.document();
        // Every pass starts from the file on disk; moves that were never
        // flushed belong to a pass that failed.
        if doc.dirty {
            warn!("⚠️  Discarding unflushed moves for {:?}", self.path);
        }
        Self::discard(&mut doc);

        let json = self.load()?;
        let tree = to_tree(&json)?;
        doc.json = Some(json);
        debug!("Read {} bookmarks from {:?}", tree.count_bookmarks(), self.path);
        Ok(tree)
    }

    async fn move_node(&self, node_id: &str, index: usize) -> Result<(), StoreError> {
        let mut doc = self.document();
        if doc.json.is_none() {
            doc.json = Some(self.load()?);
        }
        let json = doc
            .json
            .as_mut()
            .ok_or_else(|| StoreError::Malformed("document not loaded".to_string()))?;

        if let Err(e) = move_in_document(json, node_id, index) {
            Self::discard(&mut doc);
            return Err(e);
        }
        doc.dirty = true;
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let mut doc = self.document();
        if !doc.dirty {
            return Ok(());
        }

        if let Err(e) = self.persist(&mut doc) {
            warn!("⚠️  Write to {:?} failed, reloading on next read: {}", self.path, e);
            Self::discard(&mut doc);
            return Err(e);
        }

        doc.dirty = false;
        info!("✅ Wrote sorted bookmarks to {:?}", self.path);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent> {
        self.events.subscribe()
    }
}

fn node_id(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

fn root_folders(json: &Value) -> Vec<&Value> {
    let Some(roots) = json.get("roots").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut folders: Vec<&Value> = ROOT_FOLDERS.iter().filter_map(|key| roots.get(*key)).collect();
    folders.extend(
        roots
            .iter()
            .filter(|(key, value)| !ROOT_FOLDERS.contains(&key.as_str()) && value.is_object())
            .map(|(_, value)| value),
    );
    folders
}

fn to_tree(json: &Value) -> Result<BookmarkNode, StoreError> {
    let children = root_folders(json)
        .into_iter()
        .map(|folder| to_node(folder, ROOT_NODE_ID))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BookmarkNode {
        id: ROOT_NODE_ID.to_string(),
        parent_id: None,
        title: String::new(),
        url: None,
        children: Some(children),
    })
}

fn to_node(value: &Value, parent_id: &str) -> Result<BookmarkNode, StoreError> {
    let id = node_id(value)
        .ok_or_else(|| StoreError::Malformed("bookmark node without id".to_string()))?
        .to_string();
    let title = value.get("name").and_then(Value::as_str).unwrap_or("").to_string();

    if value.get("type").and_then(Value::as_str) == Some("url") {
        let url = value.get("url").and_then(Value::as_str).unwrap_or("").to_string();
        return Ok(BookmarkNode {
            id,
            parent_id: Some(parent_id.to_string()),
            title,
            url: Some(url),
            children: None,
        });
    }

    let children = value
        .get("children")
        .and_then(Value::as_array)
        .map(|children| children.iter().map(|child| to_node(child, &id)).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    Ok(BookmarkNode {
        id,
        parent_id: Some(parent_id.to_string()),
        title,
        url: None,
        children: Some(children),
    })
}

fn move_in_document(json: &mut Value, node_id_to_move: &str, index: usize) -> Result<(), StoreError> {
    if node_id_to_move == ROOT_NODE_ID || is_root_folder(json, node_id_to_move) {
        return Err(StoreError::RootNotMovable(node_id_to_move.to_string()));
    }

    let roots = json
        .get_mut("roots")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| StoreError::Malformed("missing \"roots\" object".to_string()))?;

    let children = roots
        .values_mut()
        .find_map(|folder| children_containing(folder, node_id_to_move))
        .ok_or_else(|| StoreError::NodeNotFound(node_id_to_move.to_string()))?;

    let current = children
        .iter()
        .position(|child| node_id(child) == Some(node_id_to_move))
        .ok_or_else(|| StoreError::NodeNotFound(node_id_to_move.to_string()))?;
    let node = children.remove(current);
    let index = index.min(children.len());
    children.insert(index, node);
    Ok(())
}

fn is_root_folder(json: &Value, id: &str) -> bool {
    root_folders(json).iter().any(|folder| node_id(folder) == Some(id))
}

fn children_containing<'a>(node: &'a mut Value, id: &str) -> Option<&'a mut Vec<Value>> {
    let children = node.get_mut("children")?.as_array_mut()?;
    if children.iter().any(|child| node_id(child) == Some(id)) {
        return Some(children);
    }
    children.iter_mut().find_map(|child| children_containing(child, id))
}
