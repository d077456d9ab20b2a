//! Boundary between loosely shaped data-store records and [`Event`].
//!
//! Records arrive as untyped JSON objects: flags may be missing or null,
//! `startAt` may be an ISO string with or without an offset, a bare date or
//! a serialized Date (epoch milliseconds). Everything is settled here so the
//! scoring and deck code only ever sees the strict type.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::{Map, Value};
use tracing::warn;

use super::model::{Event, EventStatus};
use crate::error::ValidationError;

/// Offset used for timestamps that carry none (Japan Standard Time).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 9 * 60;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Offset applied to naive timestamps and epoch milliseconds.
    pub default_offset: FixedOffset,
}

impl NormalizeOptions {
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let default_offset = FixedOffset::east_opt(minutes.saturating_mul(60))
            .or_else(|| FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60))
            .expect("JST is a valid offset");
        Self { default_offset }
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::with_offset_minutes(DEFAULT_UTC_OFFSET_MINUTES)
    }
}

/// Parse a textual timestamp. Strings with an offset keep it; naive ones
/// are placed in `default_offset`.
pub fn parse_timestamp_str(text: &str, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return default_offset.from_local_datetime(&naive).single();
        }
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    default_offset
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()
}

/// Parse a `startAt`-style value: a string (see [`parse_timestamp_str`]) or
/// epoch milliseconds.
pub fn parse_timestamp(value: &Value, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::String(text) => parse_timestamp_str(text, default_offset),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis).map(|dt| dt.with_timezone(&default_offset))
        }
        _ => None,
    }
}

/// Map one untyped record to an [`Event`].
///
/// # Errors
/// Rejects records without an id, a title or a usable `startAt`.
pub fn normalize_event(record: &Value, options: &NormalizeOptions) -> Result<Event, ValidationError> {
    let obj = record
        .as_object()
        .ok_or_else(|| ValidationError::NotAnObject(kind_of(record).to_string()))?;

    let id = identifier(obj, "id").ok_or_else(|| ValidationError::MissingField("id".into()))?;
    let title = text(obj, "title").ok_or_else(|| ValidationError::MissingField("title".into()))?;
    let start_raw = obj
        .get("startAt")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ValidationError::MissingField("startAt".into()))?;
    let start_at = parse_timestamp(start_raw, options.default_offset).ok_or_else(|| {
        ValidationError::InvalidValue {
            field: "startAt".into(),
            message: format!("unparsable timestamp {start_raw}"),
        }
    })?;

    let status = match obj.get("status").and_then(Value::as_str) {
        Some(s) if s.trim().eq_ignore_ascii_case("published") => EventStatus::Published,
        _ => EventStatus::Draft,
    };

    Ok(Event {
        id,
        title,
        description_short: text(obj, "descriptionShort").unwrap_or_default(),
        curator_note: text(obj, "curatorNote"),
        venue_name: text(obj, "venueName"),
        area: text(obj, "area"),
        start_at,
        lat: coordinate(obj, "lat"),
        lng: coordinate(obj, "lng"),
        price_text: text(obj, "priceText"),
        is_free: flag(obj, "isFree"),
        indoor: flag(obj, "indoor"),
        kids_ok: flag(obj, "kidsOk"),
        after18: flag(obj, "after18"),
        near_station: flag(obj, "nearStation"),
        weekday_night: flag(obj, "weekdayNight"),
        food_drink: flag(obj, "foodDrink"),
        social: flag(obj, "social"),
        photogenic: flag(obj, "photogenic"),
        english_support: flag(obj, "englishSupport"),
        stroller_ok: flag(obj, "strollerOk"),
        nursing_room: flag(obj, "nursingRoom"),
        diaper_changing: flag(obj, "diaperChanging"),
        parking: flag(obj, "parking"),
        discount: flag(obj, "discount"),
        wildcard: flag(obj, "wildcard"),
        duration_min: duration(obj, "durationMin"),
        image_url: text(obj, "imageUrl"),
        status,
    })
}

/// Normalize a batch, keeping the valid records. Rejects are logged.
pub fn normalize_all<'a, I>(records: I, options: &NormalizeOptions) -> Vec<Event>
where
    I: IntoIterator<Item = &'a Value>,
{
    records
        .into_iter()
        .filter_map(|record| match normalize_event(record, options) {
            Ok(event) => Some(event),
            Err(err) => {
                let id = record.get("id").map(|v| v.to_string()).unwrap_or_default();
                warn!(record_id = %id, error = %err, "dropping malformed event record");
                None
            }
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn identifier(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Number(n) => Some(n.to_string()),
        _ => text(obj, key),
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let s = obj.get(key)?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn flag(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn coordinate(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match obj.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn duration(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    match obj.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use serde_json::json;

    fn opts() -> NormalizeOptions {
        NormalizeOptions::default()
    }

    #[test]
    fn normalizes_full_record() {
        let record = json!({
            "id": "evt-1",
            "title": " 桜島ナイトウォーク ",
            "descriptionShort": "Lava trail at night",
            "curatorNote": "",
            "startAt": "2026-03-01T19:00:00+09:00",
            "venueName": "桜島ビジターセンター",
            "area": "桜島",
            "lat": 31.5932,
            "lng": "130.6010",
            "priceText": "3000円",
            "isFree": false,
            "kidsOk": true,
            "photogenic": true,
            "wildcard": null,
            "durationMin": 90,
            "status": "PUBLISHED"
        });
        let event = normalize_event(&record, &opts()).unwrap();
        assert_eq!(event.title, "桜島ナイトウォーク");
        assert_eq!(event.curator_note, None);
        assert_eq!(event.lng, Some(130.6010));
        assert!(event.kids_ok && event.photogenic);
        assert!(!event.wildcard);
        assert_eq!(event.duration_min, Some(90));
        assert!(event.is_published());
        assert_eq!(event.local_hour(), 19);
    }

    #[test]
    fn naive_timestamps_use_default_offset() {
        let record = json!({"id": "a", "title": "T", "startAt": "2026-03-01T10:30:00"});
        let event = normalize_event(&record, &opts()).unwrap();
        assert_eq!(event.start_at.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(event.local_hour(), 10);
        assert_eq!(event.status, EventStatus::Draft);
    }

    #[test]
    fn epoch_millis_are_accepted() {
        // 2026-03-01T01:00:00Z == 10:00 JST
        let record = json!({"id": 7, "title": "T", "startAt": 1_772_326_800_000_i64});
        let event = normalize_event(&record, &opts()).unwrap();
        assert_eq!(event.id, "7");
        assert_eq!(event.start_at.hour(), 10);
    }

    #[test]
    fn date_only_is_midnight() {
        let ts = parse_timestamp_str("2026-03-01", opts().default_offset).unwrap();
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn rejects_missing_id_and_bad_start() {
        let no_id = json!({"title": "T", "startAt": "2026-03-01"});
        assert_eq!(
            normalize_event(&no_id, &opts()),
            Err(ValidationError::MissingField("id".into()))
        );

        let bad_start = json!({"id": "a", "title": "T", "startAt": "not-a-date"});
        assert!(matches!(
            normalize_event(&bad_start, &opts()),
            Err(ValidationError::InvalidValue { .. })
        ));

        assert!(matches!(
            normalize_event(&json!([1, 2]), &opts()),
            Err(ValidationError::NotAnObject(_))
        ));
    }

    #[test]
    fn malformed_optional_fields_default() {
        let record = json!({
            "id": "a", "title": "T", "startAt": "2026-03-01T12:00:00Z",
            "lat": "north", "lng": null, "durationMin": -5, "indoor": "yes"
        });
        let event = normalize_event(&record, &opts()).unwrap();
        assert_eq!(event.coordinates(), None);
        assert_eq!(event.duration_min, None);
        assert!(!event.indoor);
    }

    #[test]
    fn normalize_all_skips_rejects() {
        let records = vec![
            json!({"id": "a", "title": "A", "startAt": "2026-03-01T12:00:00Z"}),
            json!({"id": "b", "startAt": "2026-03-01T12:00:00Z"}),
        ];
        let events = normalize_all(&records, &opts());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "a");
    }
}
