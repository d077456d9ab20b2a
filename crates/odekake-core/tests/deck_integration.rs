//! Integration tests for a full deck pass over the SQLite store.

use odekake_core::deck::SAVED_EVENTS_KEY;
use odekake_core::geo::FixedLocation;
use odekake_core::{
    CalendarEntry, Database, DeckAction, DeckState, EventScorer, GeoPoint, KvStore, PersonaMode,
    SavedEvents, SwipeAction, SwipeLogDispatcher, SwipeSession,
};

#[tokio::test]
async fn test_deck_pass_saves_and_logs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odekake.db");

    let db = Database::open_at(&path).unwrap();
    let seeded = db.seed_if_empty().unwrap();
    assert!(seeded >= 3);

    // the log worker gets its own connection
    let (log, worker) = SwipeLogDispatcher::spawn(Database::open_at(&path).unwrap());
    let mut deck = SwipeSession::new(SavedEvents::load(&db), log, "test-anon")
        .with_location(Box::new(FixedLocation(GeoPoint::new(31.5966, 130.5571))));

    let mut scorer = EventScorer::seeded(1);
    assert_eq!(
        deck.start(&db, &mut scorer, Some(PersonaMode::Worker)),
        DeckState::Active { cursor: 0 }
    );
    assert_eq!(deck.remaining(), seeded);
    let top = deck.current_enriched().unwrap();
    assert!(top.distance.is_some());

    deck.set_interest(75);
    let saved = deck.decide(DeckAction::Save).unwrap();
    assert_eq!(saved.event_id, top.event.id);
    deck.decide(DeckAction::Skip).unwrap();
    while deck.decide(DeckAction::Skip).is_some() {}
    assert_eq!(deck.state(), DeckState::Exhausted);

    deck.finish();
    drop(deck);
    worker.await.unwrap();

    let counts = db.swipe_counts().unwrap();
    assert_eq!(counts.likes, 1);
    assert_eq!(counts.nopes as usize, seeded - 1);
    let recent = db.recent_swipes(seeded).unwrap();
    let like = recent.iter().find(|e| e.action == SwipeAction::Like).unwrap();
    assert_eq!(like.interest, Some(75));
    assert_eq!(like.anon_id, "test-anon");

    let reloaded = SavedEvents::load(&db);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get(&top.event.id).unwrap().interest, 75);

    let raw = db.get(SAVED_EVENTS_KEY).unwrap().unwrap();
    let records: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    let entry = CalendarEntry::from_record(&records[0], "https://example.com/event/");
    assert_eq!(entry.title, top.event.title);
    assert_eq!(entry.start, top.event.start_at.with_timezone(&chrono::Utc));
}

#[test]
fn test_corrupt_saved_list_in_database_is_reset() {
    let db = Database::open_memory().unwrap();
    db.set(SAVED_EVENTS_KEY, "{not json").unwrap();
    let saved = SavedEvents::load(&db);
    assert!(saved.is_empty());
    assert_eq!(db.get(SAVED_EVENTS_KEY).unwrap().as_deref(), Some("[]"));
}
