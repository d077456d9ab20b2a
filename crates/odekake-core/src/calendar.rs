//! Calendar export: Google Calendar template links and iCalendar files.
//!
//! Events are exported as a fixed two-hour block starting at the event's
//! start. Saved snapshots may carry a start that no longer parses; those
//! export at the current time rather than failing.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::event::{parse_timestamp, Event, NormalizeOptions};

/// Public page of an event; the event id is appended.
pub const DEFAULT_EVENT_BASE_URL: &str = "https://kagoshima-odekakes.vercel.app/event/";

const GOOGLE_CALENDAR_RENDER_URL: &str = "https://www.google.com/calendar/render";
const ICS_LINE_LIMIT: usize = 75;

/// Exported length of every event.
pub fn default_duration() -> Duration {
    Duration::hours(2)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Description, venue and link, one per paragraph.
    pub details: String,
    /// Venue name, empty when unknown.
    pub location: String,
    pub url: String,
}

impl CalendarEntry {
    pub fn from_event(event: &Event, event_base_url: &str) -> Self {
        Self::build(
            &event.id,
            &event.title,
            &event.description_short,
            event.venue_name.as_deref(),
            event.start_at.with_timezone(&Utc),
            event_base_url,
        )
    }

    /// Build from an untyped record such as a saved snapshot. A missing or
    /// unparsable `startAt` exports at the current time.
    pub fn from_record(record: &Value, event_base_url: &str) -> Self {
        let text = |key: &str| match record.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let start = record
            .get("startAt")
            .and_then(|v| parse_timestamp(v, NormalizeOptions::default().default_offset))
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let venue = text("venueName");

        Self::build(
            &text("id"),
            &text("title"),
            &text("descriptionShort"),
            Some(venue.as_str()).filter(|v| !v.is_empty()),
            start,
            event_base_url,
        )
    }

    fn build(
        id: &str,
        title: &str,
        description: &str,
        venue: Option<&str>,
        start: DateTime<Utc>,
        event_base_url: &str,
    ) -> Self {
        let url = format!("{event_base_url}{id}");
        let location = venue.unwrap_or_default().to_string();
        let details = format!("{description}\n\n場所: {location}\nURL: {url}")
            .trim()
            .to_string();
        Self {
            title: title.to_string(),
            start,
            // clamps to the start at the end of chrono's range
            end: start.checked_add_signed(default_duration()).unwrap_or(start),
            details,
            location,
            url,
        }
    }

    /// Google Calendar "add event" link.
    pub fn google_url(&self) -> String {
        let dates = format!("{}/{}", compact_utc(self.start), compact_utc(self.end));
        let params = [
            ("action", "TEMPLATE"),
            ("text", self.title.as_str()),
            ("dates", dates.as_str()),
            ("details", self.details.as_str()),
            ("location", self.location.as_str()),
        ];
        match Url::parse_with_params(GOOGLE_CALENDAR_RENDER_URL, &params) {
            Ok(url) => url.into(),
            Err(_) => GOOGLE_CALENDAR_RENDER_URL.to_string(),
        }
    }

    /// A single-event iCalendar document with CRLF line endings.
    pub fn to_ics(&self, uid: &str, stamp: DateTime<Utc>) -> String {
        let lines = [
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            "PRODID:-//odekake//event export//JA".to_string(),
            "CALSCALE:GREGORIAN".to_string(),
            "BEGIN:VEVENT".to_string(),
            format!("UID:{}", escape_ics(uid)),
            format!("DTSTAMP:{}", compact_utc(stamp)),
            format!("DTSTART:{}", compact_utc(self.start)),
            format!("DTEND:{}", compact_utc(self.end)),
            format!("SUMMARY:{}", escape_ics(&self.title)),
            format!("DESCRIPTION:{}", escape_ics(&self.details)),
            format!("LOCATION:{}", escape_ics(&self.location)),
            format!("URL:{}", self.url),
            "END:VEVENT".to_string(),
            "END:VCALENDAR".to_string(),
        ];
        lines.iter().map(|l| fold_ics_line(l)).collect()
    }
}

/// Calendar link for an event with the public event page as the link.
pub fn to_calendar_url(event: &Event) -> String {
    CalendarEntry::from_event(event, DEFAULT_EVENT_BASE_URL).google_url()
}

/// Parse a start timestamp, falling back to the current time.
pub fn parse_start_or_now(text: &str) -> DateTime<Utc> {
    crate::event::parse_timestamp_str(text, NormalizeOptions::default().default_offset)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// `20260301T010000Z`: ISO 8601 basic form, whole seconds, UTC.
fn compact_utc(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
        .replace(['-', ':'], "")
}

fn escape_ics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

// Content lines are limited to 75 octets; continuations start with a space.
fn fold_ics_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > ICS_LINE_LIMIT {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out.push_str("\r\n");
    out
}
