use clap::Subcommand;
use odekake_core::recommend::recommend as related_events;
use odekake_core::scoring::rank_explained;
use odekake_core::{CalendarEntry, Config, EventSource};
use serde_json::json;

use super::{open_database, print_json, resolve_mode, scorer, CliResult};

#[derive(Subcommand)]
pub enum EventsAction {
    /// Insert sample Kagoshima events into an empty store
    Seed,
    /// List stored events, soonest first
    List {
        /// Include drafts
        #[arg(long)]
        all: bool,
    },
    /// Rank published events for a persona
    Rank {
        /// Persona mode; defaults to config
        #[arg(long)]
        mode: Option<String>,
        /// Show the bonuses behind each score
        #[arg(long)]
        explain: bool,
        /// Fix the serendipity draw
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show one event with distance, related events and a calendar link
    Show {
        /// Event id
        id: String,
    },
}

pub fn run(action: EventsAction) -> CliResult {
    let config = Config::load()?;
    let db = open_database(&config)?;

    match action {
        EventsAction::Seed => {
            let inserted = db.seed_if_empty()?;
            println!("seeded {inserted} events");
        }
        EventsAction::List { all } => {
            let events = if all {
                db.list_events()?
            } else {
                db.list_published_events()?
            };
            print_json(&events)?;
        }
        EventsAction::Rank {
            mode,
            explain,
            seed,
        } => {
            let mode = resolve_mode(mode.as_deref(), &config);
            let mut scorer = scorer(&config, seed);
            let ranked = rank_explained(db.list_published_events()?, mode, &mut scorer);
            let home = config.location.point();

            let rows: Vec<serde_json::Value> = ranked
                .into_iter()
                .map(|(mut scored, breakdown)| {
                    if let (Some(home), Some((lat, lng))) = (home, scored.event.coordinates()) {
                        scored.distance = Some(odekake_core::distance_km(home.lat, home.lng, lat, lng));
                    }
                    if explain {
                        json!({
                            "id": scored.event.id,
                            "title": scored.event.title,
                            "score": scored.score,
                            "distance": scored.distance,
                            "terms": breakdown.terms,
                        })
                    } else {
                        json!({
                            "id": scored.event.id,
                            "title": scored.event.title,
                            "score": scored.score,
                            "distance": scored.distance,
                        })
                    }
                })
                .collect();
            print_json(&rows)?;
        }
        EventsAction::Show { id } => {
            let event = db.get_event(&id)?.ok_or_else(|| format!("event not found: {id}"))?;
            let distance = config
                .location
                .point()
                .zip(event.coordinates())
                .map(|(home, (lat, lng))| odekake_core::distance_km(home.lat, home.lng, lat, lng));
            let related: Vec<serde_json::Value> =
                related_events(&event, &db.list_published_events()?)
                    .into_iter()
                    .map(|e| json!({ "id": e.id, "title": e.title, "startAt": e.start_at }))
                    .collect();
            let calendar_url =
                CalendarEntry::from_event(&event, &config.calendar.event_base_url).google_url();

            print_json(&json!({
                "event": event,
                "distance": distance,
                "recommendations": related,
                "calendarUrl": calendar_url,
            }))?;
        }
    }
    Ok(())
}

/// `odekake recommend <id>`
pub fn recommend(id: &str) -> CliResult {
    let config = Config::load()?;
    let db = open_database(&config)?;
    let event = db.get_event(id)?.ok_or_else(|| format!("event not found: {id}"))?;
    print_json(&related_events(&event, &db.list_published_events()?))
}
