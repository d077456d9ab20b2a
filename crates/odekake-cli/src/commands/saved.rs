use chrono::Utc;
use clap::Subcommand;
use odekake_core::deck::{share_text, SAVED_EVENTS_KEY};
use odekake_core::{CalendarEntry, Config, KvStore, SavedEvents};

use super::{open_database, print_json, CliResult};

#[derive(Subcommand)]
pub enum SavedAction {
    /// List saved events
    List,
    /// Remove a saved event
    Remove {
        /// Event id
        id: String,
    },
    /// Remove every saved event
    Clear,
    /// Calendar link (or .ics document) for a saved event
    Calendar {
        /// Event id
        id: String,
        /// Print an iCalendar document instead of a Google Calendar link
        #[arg(long)]
        ics: bool,
    },
    /// Share text for a saved event
    Share {
        /// Event id
        id: String,
    },
}

pub fn run(action: SavedAction) -> CliResult {
    let config = Config::load()?;
    let db = open_database(&config)?;

    match action {
        SavedAction::List => {
            let saved = SavedEvents::load(&db);
            print_json(&saved.list())?;
        }
        SavedAction::Remove { id } => {
            let mut saved = SavedEvents::load(&db);
            if !saved.remove(&id) {
                return Err(format!("not saved: {id}").into());
            }
            println!("removed {id}");
        }
        SavedAction::Clear => {
            let mut saved = SavedEvents::load(&db);
            let count = saved.len();
            saved.clear();
            println!("cleared {count} saved events");
        }
        SavedAction::Calendar { id, ics } => {
            // read the raw snapshot so even one with a broken start date exports
            let raw = db.get(SAVED_EVENTS_KEY)?.unwrap_or_else(|| "[]".to_string());
            let records: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap_or_default();
            let record = records
                .iter()
                .find(|r| match r.get("id") {
                    Some(serde_json::Value::String(s)) => *s == id,
                    Some(serde_json::Value::Number(n)) => n.to_string() == id,
                    _ => false,
                })
                .ok_or_else(|| format!("not saved: {id}"))?;
            let entry = CalendarEntry::from_record(record, &config.calendar.event_base_url);
            if ics {
                print!("{}", entry.to_ics(&format!("{id}@odekake"), Utc::now()));
            } else {
                println!("{}", entry.google_url());
            }
        }
        SavedAction::Share { id } => {
            let saved = SavedEvents::load(&db);
            let item = saved.get(&id).ok_or_else(|| format!("not saved: {id}"))?;
            println!("{}", share_text(&item.event, &config.calendar.event_base_url));
        }
    }
    Ok(())
}
