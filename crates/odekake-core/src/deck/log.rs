//! Fire-and-forget swipe logging.
//!
//! The deck hands entries to a [`SwipeLogDispatcher`], which pushes them onto
//! an unbounded channel and returns immediately. A blocking worker drains the
//! channel into a [`SwipeLogSink`]; write failures are logged and dropped.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;

/// Decision recorded in the swipe log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwipeAction {
    Like,
    Nope,
    /// Read back from stored logs. The deck logs a save as `Like`.
    Save,
}

impl SwipeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeAction::Like => "LIKE",
            SwipeAction::Nope => "NOPE",
            SwipeAction::Save => "SAVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LIKE" => Some(SwipeAction::Like),
            "NOPE" => Some(SwipeAction::Nope),
            "SAVE" => Some(SwipeAction::Save),
            _ => None,
        }
    }
}

impl fmt::Display for SwipeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeLogEntry {
    pub event_id: String,
    pub action: SwipeAction,
    pub anon_id: String,
    pub interest: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl SwipeLogEntry {
    pub fn new(
        event_id: impl Into<String>,
        action: SwipeAction,
        anon_id: impl Into<String>,
        interest: Option<u8>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            action,
            anon_id: anon_id.into(),
            interest,
            created_at: Utc::now(),
        }
    }
}

/// Append-only destination for swipe log entries.
pub trait SwipeLogSink {
    fn append_swipe_log(&self, entry: &SwipeLogEntry) -> Result<()>;
}

/// Non-blocking front of the swipe log.
#[derive(Debug, Clone)]
pub struct SwipeLogDispatcher {
    tx: Option<mpsc::UnboundedSender<SwipeLogEntry>>,
}

impl SwipeLogDispatcher {
    /// Start a worker that writes dispatched entries to `sink`.
    ///
    /// Must be called from within a Tokio runtime. The worker ends once
    /// every clone of the dispatcher is closed or dropped.
    pub fn spawn<S>(sink: S) -> (Self, JoinHandle<()>)
    where
        S: SwipeLogSink + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<SwipeLogEntry>();
        let handle = tokio::task::spawn_blocking(move || {
            while let Some(entry) = rx.blocking_recv() {
                match sink.append_swipe_log(&entry) {
                    Ok(()) => debug!(event_id = %entry.event_id, action = %entry.action, "swipe logged"),
                    Err(err) => warn!(
                        event_id = %entry.event_id,
                        action = %entry.action,
                        error = %err,
                        "swipe log write failed"
                    ),
                }
            }
        });
        (Self { tx: Some(tx) }, handle)
    }

    /// A dispatcher that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queue an entry. Never blocks, never fails.
    pub fn dispatch(&self, entry: SwipeLogEntry) {
        match &self.tx {
            Some(tx) => {
                if let Err(err) = tx.send(entry) {
                    warn!(event_id = %err.0.event_id, "swipe log worker is gone, entry dropped");
                }
            }
            None => debug!(event_id = %entry.event_id, "swipe logging disabled"),
        }
    }

    /// Stop accepting entries so the worker can drain and exit.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        entries: Arc<Mutex<Vec<SwipeLogEntry>>>,
        fail_on: Option<&'static str>,
    }

    impl SwipeLogSink for RecordingSink {
        fn append_swipe_log(&self, entry: &SwipeLogEntry) -> Result<()> {
            if self.fail_on == Some(entry.event_id.as_str()) {
                return Err(CoreError::Custom("store offline".into()));
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    #[test]
    fn action_names() {
        assert_eq!(SwipeAction::parse("like"), Some(SwipeAction::Like));
        assert_eq!(SwipeAction::parse("SAVE"), Some(SwipeAction::Save));
        assert_eq!(SwipeAction::parse("maybe"), None);
        let json = serde_json::to_value(SwipeLogEntry::new("e", SwipeAction::Nope, "anon", Some(0))).unwrap();
        assert_eq!(json["action"], "NOPE");
        assert_eq!(json["eventId"], "e");
    }

    #[tokio::test]
    async fn worker_writes_in_order_and_survives_failures() {
        let sink = RecordingSink {
            fail_on: Some("b"),
            ..RecordingSink::default()
        };
        let entries = sink.entries.clone();
        let (mut dispatcher, handle) = SwipeLogDispatcher::spawn(sink);

        for id in ["a", "b", "c"] {
            dispatcher.dispatch(SwipeLogEntry::new(id, SwipeAction::Like, "anon", Some(50)));
        }
        dispatcher.close();
        handle.await.unwrap();

        let ids: Vec<String> = entries.lock().unwrap().iter().map(|e| e.event_id.clone()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn disabled_dispatcher_is_a_no_op() {
        let dispatcher = SwipeLogDispatcher::disabled();
        dispatcher.dispatch(SwipeLogEntry::new("a", SwipeAction::Nope, "anon", Some(0)));
    }
}
