//! The swipe deck: session state machine, saved events and swipe logging.

mod log;
mod saved;
mod session;

pub use log::{SwipeAction, SwipeLogDispatcher, SwipeLogEntry, SwipeLogSink};
pub use saved::{share_text, SavedEvent, SavedEvents, SAVED_EVENTS_KEY};
pub use session::{DeckAction, DeckOutcome, DeckState, SwipeSession, DEFAULT_INTEREST};
