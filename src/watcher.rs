use notify::{Event, EventKind, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Content hash of a file, used to tell external edits from our own writes.
pub struct FileFingerprint {
    path: PathBuf,
    last: Mutex<Option<String>>,
}

impl FileFingerprint {
    /// Start tracking `path` from its current content.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last = Self::compute(&path);
        Self {
            path,
            last: Mutex::new(last),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-256 of the file, `None` if it cannot be read.
    pub fn compute(path: &Path) -> Option<String> {
        let data = std::fs::read(path).ok()?;
        Some(digest(&data))
    }

    /// Record `data` as the known content, before it lands on disk.
    pub fn record(&self, data: &[u8]) {
        *self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(digest(data));
    }

    /// True if the content differs from the last recorded hash. Records the
    /// new hash.
    pub fn has_changed(&self) -> bool {
        let current = Self::compute(&self.path);
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last == current {
            return false;
        }
        *last = current;
        true
    }
}

fn digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Whether `event` may have changed the file named `file_name`.
fn touches(event: &Event, file_name: &std::ffi::OsStr) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|path| path.file_name() == Some(file_name))
}

/// Watch the fingerprinted file and call `on_change` when its content
/// changes.
///
/// The parent directory is watched rather than the file itself, so
/// replacements by rename (ours and the browser's) keep being seen. Events
/// whose content matches the recorded hash are ignored, which filters out
/// duplicate events and writes announced with [`FileFingerprint::record`].
///
/// The watcher lives inside the returned task; abort it to stop watching.
pub fn watch_file<F>(fingerprint: Arc<FileFingerprint>, on_change: F) -> notify::Result<JoinHandle<()>>
where
    F: Fn() + Send + Sync + 'static,
{
    let path = fingerprint.path().to_path_buf();
    let file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .ok_or_else(|| notify::Error::generic(&format!("not a file path: {}", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let _ = tx.send(event);
        }
        Err(e) => {
            error!("❌ File watcher error: {}", e);
        }
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!("👀 Watching {:?}", path);

    Ok(tokio::spawn(async move {
        let _watcher = watcher;
        while let Some(event) = rx.recv().await {
            if !touches(&event, &file_name) {
                continue;
            }
            if fingerprint.has_changed() {
                debug!("Detected change in {:?} ({:?})", fingerprint.path(), event.kind);
                on_change();
            }
        }
    }))
}
