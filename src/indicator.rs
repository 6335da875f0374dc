use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// Short status shown to the user while sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Busy,
    Done,
    /// Idle with automatic sorting on.
    Auto,
    /// Idle with automatic sorting off.
    Blank,
}

impl Status {
    pub fn text(&self) -> &'static str {
        match self {
            Status::Busy => "...",
            Status::Done => "Done",
            Status::Auto => "Auto",
            Status::Blank => "",
        }
    }

    /// Resting status for the given `auto` setting.
    pub fn idle(auto: bool) -> Self {
        if auto {
            Status::Auto
        } else {
            Status::Blank
        }
    }
}

pub trait StatusIndicator: Send + Sync {
    fn set(&self, status: Status);
}

/// Terminal spinner.
pub struct SpinnerIndicator {
    pb: ProgressBar,
}

impl SpinnerIndicator {
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { pb }
    }
}

impl Default for SpinnerIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusIndicator for SpinnerIndicator {
    fn set(&self, status: Status) {
        match status {
            Status::Busy => {
                self.pb.enable_steady_tick(Duration::from_millis(100));
                self.pb.set_message("🔄 Sorting bookmarks ...");
            }
            Status::Done => {
                self.pb.disable_steady_tick();
                self.pb.set_message("✅ Done");
            }
            Status::Auto => self.pb.set_message("⏰ Auto"),
            Status::Blank => self.pb.finish_and_clear(),
        }
    }
}

/// Writes status changes to the log.
pub struct LogIndicator;

impl StatusIndicator for LogIndicator {
    fn set(&self, status: Status) {
        info!("Status: {:?} {:?}", status, status.text());
    }
}

/// Remembers every status it was given.
#[derive(Default)]
pub struct RecordingIndicator {
    history: Mutex<Vec<Status>>,
}

impl RecordingIndicator {
    pub fn history(&self) -> Vec<Status> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn current(&self) -> Option<Status> {
        self.history().last().copied()
    }
}

impl StatusIndicator for RecordingIndicator {
    fn set(&self, status: Status) {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(status);
    }
}
