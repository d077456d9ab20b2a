//! Interactive swipe deck on stdin.
//!
//! Commands, one per line:
//! - `s` skip the top card
//! - `k [n]` keep (save) it, optionally with interest `n`
//! - `i n` set interest for the top card
//! - `q` quit

use std::io::{self, BufRead, Write};

use odekake_core::deck::DEFAULT_INTEREST;
use odekake_core::geo::{FixedLocation, NoLocation};
use odekake_core::{
    Config, Database, DeckAction, DeckState, KvStore, SavedEvents, ScoredEvent, SwipeLogDispatcher,
    SwipeSession,
};

use super::{open_database, resolve_mode, scorer, CliResult};

pub fn run(mode: Option<String>, seed: Option<u64>) -> CliResult {
    let config = Config::load()?;
    let db = open_database(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let guard = runtime.enter();

    // the log worker writes through its own connection
    let (log, worker) = SwipeLogDispatcher::spawn(Database::open()?);
    let location: Box<dyn odekake_core::LocationProvider> = match config.location.point() {
        Some(home) => Box::new(FixedLocation(home)),
        None => Box::new(NoLocation),
    };
    let mut session = SwipeSession::new(SavedEvents::load(&db), log, config.deck.anon_id.clone())
        .with_location(location);

    let mode = resolve_mode(mode.as_deref(), &config);
    session.start(&db, &mut scorer(&config, seed), mode);

    let stdin = io::stdin();
    let stdout = io::stdout();
    drive(&mut session, stdin.lock(), stdout.lock())?;

    session.finish();
    drop(session);
    drop(guard);
    runtime.block_on(worker)?;
    Ok(())
}

/// Run the command loop until the deck is exhausted, input ends or `q`.
pub fn drive<S, I, O>(session: &mut SwipeSession<S>, input: I, mut out: O) -> CliResult
where
    S: KvStore,
    I: BufRead,
    O: Write,
{
    if let Some(err) = session.last_error() {
        writeln!(out, "could not load events: {err}")?;
        return Ok(());
    }
    show_top(session, &mut out)?;

    // no read once the deck is exhausted
    let mut lines = input.lines();
    while matches!(session.state(), DeckState::Active { .. }) {
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let mut words = line.split_whitespace();
        let outcome = match (words.next(), words.next()) {
            (Some("q"), _) => break,
            (Some("s"), _) => session.decide(DeckAction::Skip),
            (Some("k"), value) => {
                if let Some(value) = value {
                    match value.parse::<i32>() {
                        Ok(n) => session.set_interest(n),
                        Err(_) => {
                            writeln!(out, "interest must be a number")?;
                            continue;
                        }
                    }
                }
                session.decide(DeckAction::Save)
            }
            (Some("i"), Some(value)) => {
                match value.parse::<i32>() {
                    Ok(n) => {
                        session.set_interest(n);
                        writeln!(out, "interest {}", session.pending_interest())?;
                    }
                    Err(_) => writeln!(out, "interest must be a number")?,
                }
                continue;
            }
            (None, _) => continue,
            _ => {
                writeln!(out, "commands: s | k [n] | i n | q")?;
                continue;
            }
        };

        if let Some(outcome) = outcome {
            match outcome.action {
                DeckAction::Save if outcome.newly_saved => {
                    writeln!(out, "saved {} (interest {})", outcome.event_id, outcome.interest)?
                }
                DeckAction::Save => writeln!(out, "already saved {}", outcome.event_id)?,
                DeckAction::Skip => writeln!(out, "skipped {}", outcome.event_id)?,
            }
        }
        show_top(session, &mut out)?;
    }
    Ok(())
}

fn show_top<S: KvStore, O: Write>(session: &mut SwipeSession<S>, out: &mut O) -> CliResult {
    let total = session.queue().len();
    let position = session.cursor() + 1;
    match session.current_enriched() {
        Some(card) => writeln!(out, "[{position}/{total}] {}", describe(&card))?,
        None => writeln!(out, "no more events ({} saved)", session.saved().len())?,
    }
    if session.pending_interest() != DEFAULT_INTEREST {
        writeln!(out, "interest {}", session.pending_interest())?;
    }
    Ok(())
}

fn describe(card: &ScoredEvent) -> String {
    let e = &card.event;
    let mut parts = vec![
        format!("{} ({})", e.title, e.id),
        e.start_at.format("%m/%d %H:%M").to_string(),
    ];
    if let Some(area) = &e.area {
        parts.push(area.clone());
    }
    if let Some(km) = card.distance {
        parts.push(format!("{km:.1} km"));
    }
    parts.push(format!("score {}", card.score));
    parts.join(" | ")
}
