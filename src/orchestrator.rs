use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::bookmarks::BookmarkNode;
use crate::engine::compute_moves;
use crate::error::SortError;
use crate::indicator::{Status, StatusIndicator};
use crate::moves::{apply_moves, MoveOperation};
use crate::options::{ExtensionOptions, OptionsStore};
use crate::store::BookmarkStore;

/// Delay before "Done" is replaced by the resting status.
pub const DEFAULT_INDICATOR_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortState {
    Idle,
    Sorting,
}

/// Summary of a completed pass.
#[derive(Debug, Clone)]
pub struct SortReport {
    pub run_id: Uuid,
    pub bookmarks: usize,
    pub moves_applied: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum SortOutcome {
    Completed(SortReport),
    /// Another pass was already running.
    Skipped,
}

/// Moves a pass would apply, without applying them.
#[derive(Debug, Clone)]
pub struct SortPlan {
    pub options: ExtensionOptions,
    pub tree: BookmarkNode,
    pub moves: Vec<MoveOperation>,
}

/// Runs sort passes one at a time and keeps the status indicator current.
pub struct SortOrchestrator {
    store: Arc<dyn BookmarkStore>,
    options: Arc<dyn OptionsStore>,
    indicator: Arc<dyn StatusIndicator>,
    state: Mutex<SortState>,
    reset_timer: Mutex<Option<JoinHandle<()>>>,
    indicator_delay: Duration,
}

/// Holds the orchestrator in `Sorting`; dropping it returns to `Idle`.
struct SortingGuard<'a> {
    state: &'a Mutex<SortState>,
}

impl Drop for SortingGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = SortState::Idle;
    }
}

impl SortOrchestrator {
    pub fn new(
        store: Arc<dyn BookmarkStore>,
        options: Arc<dyn OptionsStore>,
        indicator: Arc<dyn StatusIndicator>,
    ) -> Self {
        Self {
            store,
            options,
            indicator,
            state: Mutex::new(SortState::Idle),
            reset_timer: Mutex::new(None),
            indicator_delay: DEFAULT_INDICATOR_DELAY,
        }
    }

    pub fn with_indicator_delay(mut self, delay: Duration) -> Self {
        self.indicator_delay = delay;
        self
    }

    pub fn state(&self) -> SortState {
        *lock(&self.state)
    }

    pub fn is_sorting(&self) -> bool {
        self.state() == SortState::Sorting
    }

    pub fn options_store(&self) -> &Arc<dyn OptionsStore> {
        &self.options
    }

    /// Sort the whole tree. Returns `Skipped` without doing anything when a
    /// pass is already running.
    pub async fn sort_bookmarks(&self) -> Result<SortOutcome, SortError> {
        let Some(guard) = self.try_begin() else {
            debug!("Sort already in progress, ignoring request");
            return Ok(SortOutcome::Skipped);
        };

        self.cancel_reset_timer();
        self.indicator.set(Status::Busy);

        let run_id = Uuid::new_v4();
        let result = self.run_pass(run_id).instrument(info_span!("sort", %run_id)).await;
        drop(guard);

        match result {
            Ok((report, auto)) => {
                self.indicator.set(Status::Done);
                self.arm_reset_timer(Status::idle(auto));
                Ok(SortOutcome::Completed(report))
            }
            Err(e) => {
                error!("❌ Sort failed: {}", e);
                Err(e)
            }
        }
    }

    /// Compute the moves of a pass without applying them.
    pub async fn plan(&self) -> Result<SortPlan, SortError> {
        let options = self.options.read_options().await;
        let tree = self.store.read_tree().await.map_err(SortError::ReadTree)?;
        let moves = compute_moves(&tree, &options);
        Ok(SortPlan { options, tree, moves })
    }

    async fn run_pass(&self, run_id: Uuid) -> Result<(SortReport, bool), SortError> {
        let started_at = Utc::now();
        let SortPlan { options, tree, moves } = self.plan().await?;
        info!("🔄 Sorting {} bookmarks ({})", tree.count_bookmarks(), options.description());

        let moves_applied = apply_moves(self.store.as_ref(), &moves).await?;
        self.store.flush().await.map_err(SortError::Flush)?;

        let report = SortReport {
            run_id,
            bookmarks: tree.count_bookmarks(),
            moves_applied,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "✅ Sort complete: {} moves in {} ms",
            report.moves_applied,
            (report.finished_at - report.started_at).num_milliseconds()
        );
        Ok((report, options.auto))
    }

    fn try_begin(&self) -> Option<SortingGuard<'_>> {
        let mut state = lock(&self.state);
        if *state == SortState::Sorting {
            return None;
        }
        *state = SortState::Sorting;
        Some(SortingGuard { state: &self.state })
    }

    fn cancel_reset_timer(&self) {
        if let Some(handle) = lock(&self.reset_timer).take() {
            handle.abort();
        }
    }

    fn arm_reset_timer(&self, resting: Status) {
        let indicator = self.indicator.clone();
        let delay = self.indicator_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            indicator.set(resting);
        });

        if let Some(previous) = lock(&self.reset_timer).replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for SortOrchestrator {
    fn drop(&mut self) {
        self.cancel_reset_timer();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
