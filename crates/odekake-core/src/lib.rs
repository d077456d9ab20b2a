//! # Odekake Core Library
//!
//! Core logic for a location-based event discovery app: a ranked swipe deck
//! of local events, tuned by who the user is today ("mode"), with a small
//! random nudge so surprising events still surface.
//!
//! The `odekake` CLI is a thin layer over this crate; every operation is
//! available here first.
//!
//! ## Architecture
//!
//! - **Event boundary**: loosely shaped data-store records are normalized into
//!   a strict [`Event`] before anything else sees them
//! - **Scoring**: persona-weighted additive bonuses plus a serendipity draw
//!   from an injected random source
//! - **Deck**: the swipe session state machine, saved events in a key-value
//!   store and fire-and-forget swipe logging
//! - **Storage**: SQLite data store and TOML configuration
//!
//! ## Key Components
//!
//! - [`EventScorer`] / [`rank_events`]: persona scoring and ranking
//! - [`SwipeSession`]: deck state machine
//! - [`SavedEvents`]: the user's kept events
//! - [`CalendarEntry`]: calendar export
//! - [`Database`]: events, swipe log and client state
//! - [`Config`]: application configuration

pub mod calendar;
pub mod deck;
pub mod error;
pub mod event;
pub mod geo;
pub mod recommend;
pub mod scoring;
pub mod storage;

pub use calendar::{to_calendar_url, CalendarEntry};
pub use deck::{
    DeckAction, DeckOutcome, DeckState, SavedEvent, SavedEvents, SwipeAction, SwipeLogDispatcher,
    SwipeLogEntry, SwipeSession,
};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use event::{normalize_event, Event, EventStatus, ScoredEvent};
pub use geo::{distance_km, GeoPoint, LocationProvider};
pub use recommend::recommend;
pub use scoring::{normalized_price, rank_events, EventScorer, PersonaMode, ScoreBreakdown};
pub use storage::{Config, Database, EventSource, KvStore};
