//! Trigger layer: turns bookmark changes, user requests, saved options and
//! scheduled ticks into sort passes.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bookmarks::BookmarkEvent;
use crate::messages::RuntimeMessage;
use crate::orchestrator::{SortOrchestrator, SortOutcome};

/// Something that may start a sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// The bookmark tree changed.
    BookmarkChanged(BookmarkEvent),
    /// The user explicitly asked for a sort.
    UserAction,
    /// A runtime message, e.g. options were saved.
    Message(RuntimeMessage),
    /// A cron tick.
    Scheduled,
}

impl Trigger {
    /// Whether this trigger only sorts when automatic sorting is on.
    pub fn requires_auto(&self) -> bool {
        match self {
            Trigger::BookmarkChanged(_) | Trigger::Message(RuntimeMessage::Saved) => true,
            Trigger::UserAction | Trigger::Scheduled => false,
        }
    }
}

pub struct TriggerLayer {
    orchestrator: Arc<SortOrchestrator>,
}

impl TriggerLayer {
    pub fn new(orchestrator: Arc<SortOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Decide whether `trigger` should start a pass, reading the current
    /// `auto` setting when it matters.
    pub async fn should_sort(&self, trigger: &Trigger) -> bool {
        if !trigger.requires_auto() {
            return true;
        }
        self.orchestrator.options_store().read_options().await.auto
    }

    /// Handle one trigger, waiting for the pass it starts.
    pub async fn handle(&self, trigger: Trigger) -> Option<SortOutcome> {
        if !self.should_sort(&trigger).await {
            debug!("Ignoring {:?}: automatic sorting is off", trigger);
            return None;
        }

        debug!("Sorting after {:?}", trigger);
        match self.orchestrator.sort_bookmarks().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("❌ Sort after {:?} failed: {}", trigger, e);
                None
            }
        }
    }

    /// Start a pass for `trigger` in the background, so triggers that arrive
    /// meanwhile reach the orchestrator and are dropped by its guard.
    pub fn dispatch(self: &Arc<Self>, trigger: Trigger) -> JoinHandle<Option<SortOutcome>> {
        let layer = self.clone();
        tokio::spawn(async move { layer.handle(trigger).await })
    }

    /// Listen to all sources until every one of them is closed.
    pub async fn run(
        self: Arc<Self>,
        mut bookmark_events: broadcast::Receiver<BookmarkEvent>,
        mut messages: broadcast::Receiver<RuntimeMessage>,
        mut requests: mpsc::Receiver<Trigger>,
    ) {
        info!("👂 Listening for bookmark changes");
        let mut events_open = true;
        let mut messages_open = true;
        let mut requests_open = true;

        while events_open || messages_open || requests_open {
            let trigger = tokio::select! {
                event = bookmark_events.recv(), if events_open => match event {
                    Ok(event) => Trigger::BookmarkChanged(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("⚠️  Missed {} bookmark events", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        events_open = false;
                        continue;
                    }
                },
                message = messages.recv(), if messages_open => match message {
                    Ok(message) => Trigger::Message(message),
                    Err(broadcast::error::RecvError::Lagged(_)) => Trigger::Message(RuntimeMessage::Saved),
                    Err(broadcast::error::RecvError::Closed) => {
                        messages_open = false;
                        continue;
                    }
                },
                request = requests.recv(), if requests_open => match request {
                    Some(trigger) => trigger,
                    None => {
                        requests_open = false;
                        continue;
                    }
                },
            };

            if self.orchestrator.is_sorting() {
                debug!("Dropping {:?}: sort in progress", trigger);
                continue;
            }
            self.dispatch(trigger);
        }

        info!("🛑 All trigger sources closed");
    }
}
