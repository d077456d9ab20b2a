//! "You might also like" list for the event detail view.

use crate::event::Event;

/// Number of recommendations shown under an event.
pub const RECOMMENDATION_LIMIT: usize = 3;

const SAME_DAY_AFFINITY: u32 = 10;
const SAME_AREA_AFFINITY: u32 = 5;

/// Affinity of `candidate` to `current`: same local calendar day, same area.
pub fn affinity(current: &Event, candidate: &Event) -> u32 {
    let mut score = 0;
    if candidate.local_date() == current.local_date() {
        score += SAME_DAY_AFFINITY;
    }
    // two events without an area do not share one
    if candidate.area.is_some() && candidate.area == current.area {
        score += SAME_AREA_AFFINITY;
    }
    score
}

/// Up to [`RECOMMENDATION_LIMIT`] events related to `current`.
pub fn recommend(current: &Event, pool: &[Event]) -> Vec<Event> {
    recommend_n(current, pool, RECOMMENDATION_LIMIT)
}

/// Same as [`recommend`] with a custom limit. Equal affinities keep pool
/// order.
pub fn recommend_n(current: &Event, pool: &[Event], limit: usize) -> Vec<Event> {
    let mut candidates: Vec<(u32, &Event)> = pool
        .iter()
        .filter(|e| e.id != current.id)
        .map(|e| (affinity(current, e), e))
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    candidates
        .into_iter()
        .take(limit)
        .map(|(_, e)| e.clone())
        .collect()
}
