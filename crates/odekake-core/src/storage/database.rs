//! SQLite-backed data store.
//!
//! Provides persistent storage for:
//! - Event records (JSON payloads, read back through the normalization boundary)
//! - The append-only swipe log
//! - Key-value store for client state (saved events)

use std::path::Path;

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{data_dir, KvStore};
use crate::deck::{SwipeAction, SwipeLogEntry, SwipeLogSink};
use crate::error::{CoreError, DatabaseError, Result};
use crate::event::{normalize_all, normalize_event, Event, EventStatus, NormalizeOptions};

/// Where the deck gets its events from.
pub trait EventSource {
    /// All events eligible for ranking.
    fn list_published_events(&self) -> Result<Vec<Event>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeCounts {
    pub likes: u64,
    pub nopes: u64,
    pub saves: u64,
}

/// SQLite database for events, swipe logs and client state.
pub struct Database {
    conn: Connection,
    normalize: NormalizeOptions,
}

impl Database {
    /// Open the database at `~/.config/odekake/odekake.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("odekake.db"))
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn,
            normalize: NormalizeOptions::default(),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            normalize: NormalizeOptions::default(),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Use a different boundary setup when reading event payloads.
    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events (
                id          TEXT PRIMARY KEY,
                payload     TEXT NOT NULL,
                status      TEXT NOT NULL,
                start_at    TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS swipe_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id    TEXT NOT NULL,
                action      TEXT NOT NULL,
                anon_id     TEXT NOT NULL,
                interest    INTEGER,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_status_start ON events(status, start_at);
            CREATE INDEX IF NOT EXISTS idx_swipe_log_event ON swipe_log(event_id);",
        )?;
        Ok(())
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Insert or replace an event.
    ///
    /// # Errors
    /// Returns an error if the payload cannot be encoded or the write fails.
    pub fn upsert_event(&self, event: &Event) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        let status = match event.status {
            EventStatus::Published => "PUBLISHED",
            EventStatus::Draft => "DRAFT",
        };
        self.conn.execute(
            "INSERT INTO events (id, payload, status, start_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
               payload = excluded.payload,
               status = excluded.status,
               start_at = excluded.start_at,
               updated_at = excluded.updated_at",
            params![
                event.id,
                payload,
                status,
                event.start_at.with_timezone(&Utc).to_rfc3339(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Look up one event by id (any status).
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored payload is not a
    /// valid event record.
    pub fn get_event(&self, id: &str) -> Result<Option<Event>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM events WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(payload) = payload else {
            return Ok(None);
        };
        let record: serde_json::Value = serde_json::from_str(&payload)?;
        Ok(Some(normalize_event(&record, &self.normalize)?))
    }

    /// Every stored event (any status), soonest first. Malformed rows are
    /// skipped.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn list_events(&self) -> Result<Vec<Event>> {
        self.load_events("SELECT payload FROM events ORDER BY start_at ASC")
    }

    fn load_events(&self, sql: &str) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(sql)?;
        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let records: Vec<serde_json::Value> = payloads
            .iter()
            .filter_map(|payload| match serde_json::from_str(payload) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(error = %err, "skipping event row with invalid JSON");
                    None
                }
            })
            .collect();
        Ok(normalize_all(&records, &self.normalize))
    }

    pub fn event_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Insert a handful of sample events when the table is empty.
    /// Returns how many were inserted.
    ///
    /// # Errors
    /// Returns an error if the count or an insert fails.
    pub fn seed_if_empty(&self) -> Result<usize> {
        if self.event_count()? > 0 {
            return Ok(0);
        }
        let events = sample_events(Utc::now());
        for event in &events {
            self.upsert_event(event)?;
        }
        debug!(count = events.len(), "seeded sample events");
        Ok(events.len())
    }

    // ── Swipe log ────────────────────────────────────────────────────

    /// Most recent swipe log entries, newest first.
    pub fn recent_swipes(&self, limit: usize) -> Result<Vec<SwipeLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, action, anon_id, interest, created_at
             FROM swipe_log ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (event_id, action, anon_id, interest, created_at) = row?;
            let Some(action) = SwipeAction::parse(&action) else {
                warn!(action = %action, "skipping swipe row with unknown action");
                continue;
            };
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            out.push(SwipeLogEntry {
                event_id,
                action,
                anon_id,
                interest: interest.and_then(|v| u8::try_from(v).ok()),
                created_at,
            });
        }
        Ok(out)
    }

    /// Totals per action.
    pub fn swipe_counts(&self) -> Result<SwipeCounts> {
        let mut stmt = self
            .conn
            .prepare("SELECT action, COUNT(*) FROM swipe_log GROUP BY action")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = SwipeCounts::default();
        for row in rows {
            let (action, count) = row?;
            let count = count.max(0) as u64;
            match SwipeAction::parse(&action) {
                Some(SwipeAction::Like) => counts.likes = count,
                Some(SwipeAction::Nope) => counts.nopes = count,
                Some(SwipeAction::Save) => counts.saves = count,
                None => {}
            }
        }
        Ok(counts)
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl EventSource for Database {
    fn list_published_events(&self) -> Result<Vec<Event>> {
        let events = self
            .load_events(
                "SELECT payload FROM events WHERE status = 'PUBLISHED' ORDER BY start_at ASC",
            )
            .map_err(|e| CoreError::Fetch(e.to_string()))?;
        Ok(events.into_iter().filter(Event::is_published).collect())
    }
}

impl SwipeLogSink for Database {
    fn append_swipe_log(&self, entry: &SwipeLogEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO swipe_log (event_id, action, anon_id, interest, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.event_id,
                entry.action.as_str(),
                entry.anon_id,
                entry.interest.map(i64::from),
                entry.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

impl KvStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv_get(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Ok(self.kv_set(key, value)?)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn sample_events(now: DateTime<Utc>) -> Vec<Event> {
    let jst = FixedOffset::east_opt(9 * 3600).expect("JST is a valid offset");
    let today = now.with_timezone(&jst).date_naive();
    let at = |days: i64, hour: u32| -> DateTime<FixedOffset> {
        (today + Duration::days(days))
            .and_hms_opt(hour, 0, 0)
            .and_then(|naive| jst.from_local_datetime(&naive).single())
            .unwrap_or_else(|| now.with_timezone(&jst))
    };

    let mut night_walk = Event::new("seed-sakurajima-night-walk", "桜島ナイトウォーク", at(2, 19));
    night_walk.description_short =
        "溶岩なぎさ遊歩道をガイドと一緒に夜間散策。静寂に包まれた桜島の迫力を体感できるツアーです。".into();
    night_walk.curator_note = Some("対岸に見える鹿児島市街の夜景は息をのむ美しさです。".into());
    night_walk.venue_name = Some("桜島ビジターセンター".into());
    night_walk.area = Some("桜島".into());
    night_walk.lat = Some(31.5932);
    night_walk.lng = Some(130.6010);
    night_walk.price_text = Some("3000円".into());
    night_walk.kids_ok = true;
    night_walk.photogenic = true;
    night_walk.english_support = true;
    night_walk.after18 = true;

    let mut ramen = Event::new("seed-ramen-championship", "鹿児島ラーメン王決定戦", at(1, 11));
    ramen.description_short = "県内各地から選りすぐりの人気ラーメン店が集結。".into();
    ramen.curator_note = Some("全店舗食べ比べチケットがお得です。".into());
    ramen.venue_name = Some("天文館公園".into());
    ramen.area = Some("天文館".into());
    ramen.lat = Some(31.591);
    ramen.lng = Some(130.555);
    ramen.price_text = Some("入場無料 (ラーメン一杯900円)".into());
    ramen.is_free = true;
    ramen.food_drink = true;
    ramen.social = true;
    ramen.kids_ok = true;

    let mut kiriko = Event::new("seed-satsuma-kiriko", "薩摩切子カット体験ワークショップ", at(3, 14));
    kiriko.description_short = "伝統工芸・薩摩切子のカット体験。オリジナルコースターを作れます。".into();
    kiriko.venue_name = Some("磯工芸館".into());
    kiriko.area = Some("磯エリア".into());
    kiriko.lat = Some(31.6175);
    kiriko.lng = Some(130.5780);
    kiriko.price_text = Some("4500円".into());
    kiriko.indoor = true;
    kiriko.photogenic = true;
    kiriko.english_support = true;
    kiriko.duration_min = Some(90);

    let mut craft_beer = Event::new("seed-station-craft-beer", "中央駅クラフトビールナイト", at(1, 18));
    craft_beer.description_short = "九州のブルワリーが集まる平日夜のビアガーデン。".into();
    craft_beer.venue_name = Some("アミュプラザ鹿児島 屋上".into());
    craft_beer.area = Some("中央駅".into());
    craft_beer.lat = Some(31.5840);
    craft_beer.lng = Some(130.5416);
    craft_beer.price_text = Some("1杯700円〜".into());
    craft_beer.after18 = true;
    craft_beer.near_station = true;
    craft_beer.food_drink = true;
    craft_beer.weekday_night = true;
    craft_beer.social = true;
    craft_beer.duration_min = Some(120);

    let mut kids_science = Event::new("seed-kids-science", "親子でサイエンスショー", at(4, 10));
    kids_science.description_short = "液体窒素や静電気の実験を間近で楽しめる親子向けショー。".into();
    kids_science.venue_name = Some("かごしま市立科学館".into());
    kids_science.area = Some("鴨池".into());
    kids_science.lat = Some(31.5658);
    kids_science.lng = Some(130.5580);
    kids_science.price_text = Some("大人400円 / 子供150円".into());
    kids_science.indoor = true;
    kids_science.kids_ok = true;
    kids_science.stroller_ok = true;
    kids_science.nursing_room = true;
    kids_science.parking = true;
    kids_science.duration_min = Some(45);

    let mut castle_hill = Event::new("seed-shiroyama-sunrise", "城山展望台 朝焼けフォトウォーク", at(5, 6));
    castle_hill.description_short = "朝焼けに染まる桜島を撮影する早朝の散策会。".into();
    castle_hill.venue_name = Some("城山公園展望台".into());
    castle_hill.area = Some("城山".into());
    castle_hill.lat = Some(31.5977);
    castle_hill.lng = Some(130.5505);
    castle_hill.price_text = Some("無料".into());
    castle_hill.is_free = true;
    castle_hill.photogenic = true;
    castle_hill.social = true;
    castle_hill.discount = true;
    castle_hill.wildcard = true;

    vec![night_walk, ramen, kiriko, craft_beer, kids_science, castle_hill]
}
