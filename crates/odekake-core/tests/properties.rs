//! Property tests for pricing, scoring, ranking, distance and recommendations.

use chrono::{DateTime, Duration, FixedOffset};
use odekake_core::recommend::{recommend, RECOMMENDATION_LIMIT};
use odekake_core::scoring::{ScoringConfig, UNKNOWN_PRICE};
use odekake_core::{distance_km, normalized_price, rank_events, Event, EventScorer, PersonaMode};
use proptest::prelude::*;
use rand::rngs::mock::StepRng;

fn base() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-03-01T00:00:00+09:00").unwrap()
}

fn arb_mode() -> impl Strategy<Value = Option<PersonaMode>> {
    prop_oneof![
        Just(None),
        Just(Some(PersonaMode::Housewife)),
        Just(Some(PersonaMode::Worker)),
        Just(Some(PersonaMode::Student)),
        Just(Some(PersonaMode::Tourist)),
    ]
}

prop_compose! {
    fn arb_event(id: usize)(
        minutes in 0i64..(14 * 24 * 60),
        flags in proptest::collection::vec(any::<bool>(), 16),
        price in proptest::option::of("[0-9]{0,5}円?|無料|free|要問合せ"),
        area in proptest::option::of(prop_oneof![Just("天文館"), Just("桜島"), Just("中央駅")]),
        duration in proptest::option::of(0u32..300),
        note in proptest::option::of("[a-z ]{0,8}"),
    ) -> Event {
        let mut e = Event::new(format!("e{id}"), format!("event {id}"), base() + Duration::minutes(minutes));
        e.is_free = flags[0];
        e.indoor = flags[1];
        e.kids_ok = flags[2];
        e.after18 = flags[3];
        e.near_station = flags[4];
        e.weekday_night = flags[5];
        e.food_drink = flags[6];
        e.social = flags[7];
        e.photogenic = flags[8];
        e.english_support = flags[9];
        e.stroller_ok = flags[10];
        e.nursing_room = flags[11];
        e.diaper_changing = flags[12];
        e.parking = flags[13];
        e.discount = flags[14];
        e.wildcard = flags[15];
        e.price_text = price;
        e.area = area.map(String::from);
        e.duration_min = duration;
        e.curator_note = note;
        e
    }
}

fn arb_events() -> impl Strategy<Value = Vec<Event>> {
    (0usize..12).prop_flat_map(|n| (0..n).map(arb_event).collect::<Vec<_>>())
}

fn never_hit() -> EventScorer<StepRng> {
    EventScorer::with_rng(StepRng::new(u64::MAX, 0), ScoringConfig::default())
}

proptest! {
    #[test]
    fn free_markers_price_at_zero(prefix in "[^0-9]{0,6}", suffix in ".{0,6}", marker in prop_oneof![Just("無料"), Just("FREE"), Just("Free")]) {
        let text = format!("{prefix}{marker}{suffix}");
        prop_assert_eq!(normalized_price(Some(&text)), 0);
    }

    #[test]
    fn digitless_text_is_unknown_price(text in "[^0-9無]{1,12}") {
        prop_assume!(!text.to_lowercase().contains("free"));
        prop_assert_eq!(normalized_price(Some(&text)), UNKNOWN_PRICE);
    }

    #[test]
    fn score_without_wildcard_is_deterministic(event in arb_event(0), mode in arb_mode(), seed_a in any::<u64>(), seed_b in any::<u64>()) {
        let mut event = event;
        event.wildcard = false;
        let a = EventScorer::seeded(seed_a).score(&event, mode);
        let b = EventScorer::seeded(seed_b).score(&event, mode);
        prop_assert_eq!(a, b);
        prop_assert!(a >= 0);
    }

    #[test]
    fn distance_to_self_is_zero(lat in -90.0f64..90.0, lng in -180.0f64..180.0) {
        prop_assert_eq!(distance_km(lat, lng, lat, lng), 0.0);
    }

    #[test]
    fn distance_is_symmetric(a in (-90.0f64..90.0, -180.0f64..180.0), b in (-90.0f64..90.0, -180.0f64..180.0)) {
        let d1 = distance_km(a.0, a.1, b.0, b.1);
        let d2 = distance_km(b.0, b.1, a.0, a.1);
        prop_assert!((d1 - d2).abs() <= 0.1 + 1e-9);
        prop_assert!(d1 >= 0.0);
    }

    #[test]
    fn ranking_is_sorted(events in arb_events(), mode in arb_mode()) {
        let count = events.len();
        let ranked = rank_events(events, mode, &mut never_hit());
        prop_assert_eq!(ranked.len(), count);
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.score > b.score || (a.score == b.score && a.event.start_at <= b.event.start_at));
        }
    }

    #[test]
    fn recommendations_exclude_current(events in arb_events(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!events.is_empty());
        let current = &events[pick.index(events.len())];
        let recs = recommend(current, &events);
        prop_assert!(recs.len() <= RECOMMENDATION_LIMIT);
        prop_assert_eq!(recs.len(), (events.len() - 1).min(RECOMMENDATION_LIMIT));
        prop_assert!(recs.iter().all(|e| e.id != current.id));
    }
}
