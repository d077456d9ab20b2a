use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

/// Publication state of an event in the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    #[default]
    Draft,
    Published,
}

/// A curated local event, as owned by the data store.
///
/// `start_at` keeps the event's own UTC offset: ordering compares instants,
/// while `local_hour()` and `local_date()` read the venue's wall clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description_short: String,
    #[serde(default)]
    pub curator_note: Option<String>,
    #[serde(default)]
    pub venue_name: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    pub start_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub price_text: Option<String>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub indoor: bool,
    #[serde(default)]
    pub kids_ok: bool,
    #[serde(default)]
    pub after18: bool,
    #[serde(default)]
    pub near_station: bool,
    #[serde(default)]
    pub weekday_night: bool,
    #[serde(default)]
    pub food_drink: bool,
    #[serde(default)]
    pub social: bool,
    #[serde(default)]
    pub photogenic: bool,
    #[serde(default)]
    pub english_support: bool,
    #[serde(default)]
    pub stroller_ok: bool,
    #[serde(default)]
    pub nursing_room: bool,
    #[serde(default)]
    pub diaper_changing: bool,
    #[serde(default)]
    pub parking: bool,
    #[serde(default)]
    pub discount: bool,
    #[serde(default)]
    pub wildcard: bool,
    #[serde(default)]
    pub duration_min: Option<u32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
}

impl Event {
    /// A published event with every flag off and no optional fields.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description_short: String::new(),
            curator_note: None,
            venue_name: None,
            area: None,
            start_at,
            lat: None,
            lng: None,
            price_text: None,
            is_free: false,
            indoor: false,
            kids_ok: false,
            after18: false,
            near_station: false,
            weekday_night: false,
            food_drink: false,
            social: false,
            photogenic: false,
            english_support: false,
            stroller_ok: false,
            nursing_room: false,
            diaper_changing: false,
            parking: false,
            discount: false,
            wildcard: false,
            duration_min: None,
            image_url: None,
            status: EventStatus::Published,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == EventStatus::Published
    }

    /// Hour of day at the venue.
    pub fn local_hour(&self) -> u32 {
        self.start_at.hour()
    }

    /// Calendar day at the venue.
    pub fn local_date(&self) -> NaiveDate {
        self.start_at.date_naive()
    }

    /// Both coordinates, when the event has them.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    pub fn has_curator_note(&self) -> bool {
        self.curator_note
            .as_deref()
            .is_some_and(|note| !note.trim().is_empty())
    }
}

/// An event with the fields the ranking pipeline derives for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvent {
    #[serde(flatten)]
    pub event: Event,
    pub score: i32,
    /// Kilometres from the device, one decimal. Unset when either side
    /// has no coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl ScoredEvent {
    pub fn new(event: Event, score: i32) -> Self {
        Self {
            event,
            score,
            distance: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.event.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn local_hour_uses_event_offset() {
        let event = Event::new("e1", "Night walk", at("2026-03-01T19:30:00+09:00"));
        assert_eq!(event.local_hour(), 19);
        assert_eq!(event.local_date(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn serializes_camel_case_with_upper_status() {
        let mut event = Event::new("e1", "Ramen", at("2026-03-01T12:00:00+09:00"));
        event.kids_ok = true;
        event.description_short = "Bowls".into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kidsOk"], true);
        assert_eq!(json["descriptionShort"], "Bowls");
        assert_eq!(json["status"], "PUBLISHED");
        assert_eq!(json["startAt"], "2026-03-01T12:00:00+09:00");
    }

    #[test]
    fn blank_curator_note_does_not_count() {
        let mut event = Event::new("e1", "Ramen", at("2026-03-01T12:00:00+09:00"));
        assert!(!event.has_curator_note());
        event.curator_note = Some("  ".into());
        assert!(!event.has_curator_note());
        event.curator_note = Some("Go early".into());
        assert!(event.has_curator_note());
    }

    #[test]
    fn scored_event_flattens_event_fields() {
        let event = Event::new("e1", "Ramen", at("2026-03-01T12:00:00+09:00"));
        let json = serde_json::to_value(ScoredEvent::new(event, 40)).unwrap();
        assert_eq!(json["id"], "e1");
        assert_eq!(json["score"], 40);
        assert!(json.get("distance").is_none());
    }
}
