//! Swipe deck state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Loading -> Active { cursor } -> Exhausted
//!    \______________________________/
//!        (fetch failure or no events)
//! ```
//!
//! The queue is fixed when the session starts; decisions only move the
//! cursor. Saving writes through [`SavedEvents`] and every decision is
//! handed to the [`SwipeLogDispatcher`] without waiting for the write.

use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::log::{SwipeAction, SwipeLogDispatcher, SwipeLogEntry};
use super::saved::SavedEvents;
use crate::event::ScoredEvent;
use crate::geo::{distance_km, GeoPoint, LocationProvider};
use crate::scoring::{rank_events, EventScorer, PersonaMode};
use crate::storage::{EventSource, KvStore};

/// Interest level every card starts at.
pub const DEFAULT_INTEREST: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DeckState {
    Loading,
    Active { cursor: usize },
    Exhausted,
}

/// What the user did with the top card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckAction {
    /// Keep the event (logged as LIKE).
    Save,
    /// Pass on the event (logged as NOPE).
    Skip,
}

/// Result of one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckOutcome {
    pub event_id: String,
    pub action: DeckAction,
    /// Interest sent with the log entry.
    pub interest: u8,
    /// False when the event was already saved.
    pub newly_saved: bool,
    pub exhausted: bool,
}

/// One pass through the ranked deck.
pub struct SwipeSession<S: KvStore> {
    queue: Vec<ScoredEvent>,
    cursor: usize,
    pending_interest: u8,
    state: DeckState,
    saved: SavedEvents<S>,
    log: SwipeLogDispatcher,
    anon_id: String,
    location: Option<Box<dyn LocationProvider>>,
    /// First location obtained; reused for the rest of the session.
    origin: Option<GeoPoint>,
    last_error: Option<String>,
}

impl<S: KvStore> SwipeSession<S> {
    pub fn new(saved: SavedEvents<S>, log: SwipeLogDispatcher, anon_id: impl Into<String>) -> Self {
        Self {
            queue: Vec::new(),
            cursor: 0,
            pending_interest: DEFAULT_INTEREST,
            state: DeckState::Loading,
            saved,
            log,
            anon_id: anon_id.into(),
            location: None,
            origin: None,
            last_error: None,
        }
    }

    /// Attach a device location source for distance badges.
    pub fn with_location(mut self, provider: Box<dyn LocationProvider>) -> Self {
        self.location = Some(provider);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> DeckState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn pending_interest(&self) -> u8 {
        self.pending_interest
    }

    pub fn queue(&self) -> &[ScoredEvent] {
        &self.queue
    }

    /// Top card, if the deck is active.
    pub fn current(&self) -> Option<&ScoredEvent> {
        match self.state {
            DeckState::Active { cursor } => self.queue.get(cursor),
            _ => None,
        }
    }

    /// The card under the top card.
    pub fn peek_next(&self) -> Option<&ScoredEvent> {
        match self.state {
            DeckState::Active { cursor } => self.queue.get(cursor + 1),
            _ => None,
        }
    }

    /// Cards left including the top card.
    pub fn remaining(&self) -> usize {
        match self.state {
            DeckState::Active { cursor } => self.queue.len().saturating_sub(cursor),
            _ => 0,
        }
    }

    pub fn saved(&self) -> &SavedEvents<S> {
        &self.saved
    }

    pub fn saved_mut(&mut self) -> &mut SavedEvents<S> {
        &mut self.saved
    }

    /// Why the last start failed, if it did.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the deck ended because fetching failed.
    pub fn needs_retry(&self) -> bool {
        self.state == DeckState::Exhausted && self.last_error.is_some()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Fetch, rank and show the first card. Also used to retry.
    pub fn start<R: RngCore>(
        &mut self,
        source: &dyn EventSource,
        scorer: &mut EventScorer<R>,
        mode: Option<PersonaMode>,
    ) -> DeckState {
        self.state = DeckState::Loading;
        self.queue.clear();
        self.cursor = 0;
        self.pending_interest = DEFAULT_INTEREST;
        self.last_error = None;

        match source.list_published_events() {
            Ok(events) => {
                self.queue = rank_events(events, mode, scorer);
                self.state = if self.queue.is_empty() {
                    DeckState::Exhausted
                } else {
                    DeckState::Active { cursor: 0 }
                };
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch events for the deck");
                self.last_error = Some(err.to_string());
                self.state = DeckState::Exhausted;
            }
        }

        debug!(state = ?self.state, cards = self.queue.len(), "deck started");
        self.state
    }

    /// Set the interest for the top card, clamped to 0..=100.
    pub fn set_interest(&mut self, value: i32) {
        if !matches!(self.state, DeckState::Active { .. }) {
            return;
        }
        self.pending_interest = value.clamp(0, 100) as u8;
    }

    /// Apply a decision to the top card and advance.
    ///
    /// Returns `None` when there is no top card.
    pub fn decide(&mut self, action: DeckAction) -> Option<DeckOutcome> {
        let DeckState::Active { cursor } = self.state else {
            return None;
        };
        let card = self.queue.get(cursor)?;
        let event_id = card.event.id.clone();

        let (log_action, interest, newly_saved) = match action {
            DeckAction::Save => {
                let interest = self.pending_interest;
                let added = self.saved.insert_if_absent(&card.event, interest, Utc::now());
                (SwipeAction::Like, interest, added)
            }
            DeckAction::Skip => (SwipeAction::Nope, 0, false),
        };

        self.log.dispatch(SwipeLogEntry::new(
            event_id.as_str(),
            log_action,
            self.anon_id.as_str(),
            Some(interest),
        ));

        self.cursor = cursor + 1;
        self.pending_interest = DEFAULT_INTEREST;
        self.state = if self.cursor < self.queue.len() {
            DeckState::Active { cursor: self.cursor }
        } else {
            DeckState::Exhausted
        };

        debug!(event_id = %event_id, action = ?action, state = ?self.state, "deck decision");
        Some(DeckOutcome {
            event_id,
            action,
            interest,
            newly_saved,
            exhausted: self.state == DeckState::Exhausted,
        })
    }

    /// Attach the distance from the device to `card`, when both are known.
    pub fn enrich(&mut self, card: &mut ScoredEvent) {
        let Some(origin) = self.origin() else {
            return;
        };
        if let Some((lat, lng)) = card.event.coordinates() {
            card.distance = Some(distance_km(origin.lat, origin.lng, lat, lng));
        }
    }

    /// Top card with distance attached.
    pub fn current_enriched(&mut self) -> Option<ScoredEvent> {
        let mut card = self.current()?.clone();
        self.enrich(&mut card);
        Some(card)
    }

    /// Close the log channel so the worker can drain.
    pub fn finish(&mut self) {
        self.log.close();
    }

    fn origin(&mut self) -> Option<GeoPoint> {
        if self.origin.is_none() {
            self.origin = self.location.as_ref().and_then(|p| p.current_location());
        }
        self.origin
    }
}
