//! The event record and the boundary that produces it.

mod model;
mod normalize;

pub use model::{Event, EventStatus, ScoredEvent};
pub use normalize::{
    normalize_all, normalize_event, parse_timestamp, parse_timestamp_str, NormalizeOptions,
    DEFAULT_UTC_OFFSET_MINUTES,
};
