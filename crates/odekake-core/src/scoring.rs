//! Persona-weighted event scoring and ranking.
//!
//! Every event starts at zero and collects additive bonuses:
//!
//! | Term        | Condition                                   | Points |
//! |-------------|---------------------------------------------|--------|
//! | serendipity | `wildcard`, with probability 0.3 per call    | 50     |
//! | persona     | flags matching the selected [`PersonaMode`]  | varies |
//! | curator     | non-empty curator note                       | 5      |
//!
//! The serendipity draw comes from an injected random source, so a seeded
//! scorer reproduces the same ranking while the app scorer reshuffles
//! wildcards on every request.

use std::fmt;
use std::str::FromStr;

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::{Event, ScoredEvent};

/// Marker that means "free" in Japanese price texts.
pub const FREE_MARKER: &str = "無料";

/// Price assumed when a price text has no number in it.
pub const UNKNOWN_PRICE: u64 = 1000;

/// User persona that selects which bonuses apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaMode {
    Housewife,
    Worker,
    Student,
    Tourist,
}

impl PersonaMode {
    pub const ALL: [PersonaMode; 4] = [
        PersonaMode::Housewife,
        PersonaMode::Worker,
        PersonaMode::Student,
        PersonaMode::Tourist,
    ];

    /// Parse a mode name. Unknown names yield `None`, which scores with no
    /// persona bonus.
    pub fn parse(name: &str) -> Option<Self> {
        name.trim().parse().ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaMode::Housewife => "housewife",
            PersonaMode::Worker => "worker",
            PersonaMode::Student => "student",
            PersonaMode::Tourist => "tourist",
        }
    }
}

impl fmt::Display for PersonaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonaMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PersonaMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown persona mode: {s}"))
    }
}

/// Turn a free-form price text into a yen amount.
///
/// Empty or missing text and anything marked free is 0. Otherwise the first
/// run of ASCII digits is the price ("3,000円" reads as 3). Text without
/// digits is [`UNKNOWN_PRICE`].
pub fn normalized_price(price_text: Option<&str>) -> u64 {
    let Some(text) = price_text.filter(|t| !t.is_empty()) else {
        return 0;
    };
    if text.to_lowercase().contains("free") || text.contains(FREE_MARKER) {
        return 0;
    }
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return UNKNOWN_PRICE;
    }
    digits.parse().unwrap_or(u64::MAX)
}

/// One named bonus in a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTerm {
    pub name: String,
    pub points: i32,
}

/// Every bonus an event collected, for explaining a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub mode: Option<PersonaMode>,
    pub terms: Vec<ScoreTerm>,
}

impl ScoreBreakdown {
    fn new(mode: Option<PersonaMode>) -> Self {
        Self {
            mode,
            terms: Vec::new(),
        }
    }

    fn add_if(&mut self, condition: bool, name: &str, points: i32) {
        if condition {
            self.terms.push(ScoreTerm {
                name: name.to_string(),
                points,
            });
        }
    }

    /// Sum of all terms.
    pub fn total(&self) -> i32 {
        self.terms.iter().map(|t| t.points).sum()
    }

    /// Largest single contribution.
    pub fn top_term(&self) -> Option<&ScoreTerm> {
        self.terms.iter().max_by_key(|t| t.points)
    }
}

/// Tunables of the scoring engine (the `[scoring]` config table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Areas that count as central for tourists.
    #[serde(default = "default_central_areas")]
    pub central_areas: Vec<String>,
    #[serde(default = "default_wildcard_probability")]
    pub wildcard_probability: f64,
    #[serde(default = "default_wildcard_bonus")]
    pub wildcard_bonus: i32,
    /// Fixes the random source when set.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_central_areas() -> Vec<String> {
    ["Tenmonkan", "Chuo Station", "天文館", "中央駅"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_wildcard_probability() -> f64 {
    0.3
}
fn default_wildcard_bonus() -> i32 {
    50
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            central_areas: default_central_areas(),
            wildcard_probability: default_wildcard_probability(),
            wildcard_bonus: default_wildcard_bonus(),
            seed: None,
        }
    }
}

/// Scores events for a persona.
///
/// Owns its random source; `&mut self` keeps draws sequential. Use one
/// scorer per thread when scoring in parallel.
pub struct EventScorer<R = Mcg128Xsl64> {
    rng: R,
    config: ScoringConfig,
}

impl EventScorer<Mcg128Xsl64> {
    /// Deterministic scorer with default tunables.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(Mcg128Xsl64::seed_from_u64(seed), ScoringConfig::default())
    }

    /// Scorer seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::with_rng(Mcg128Xsl64::from_entropy(), ScoringConfig::default())
    }

    /// Scorer for a config table; seeded when `config.seed` is set.
    pub fn from_config(config: ScoringConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self::with_rng(rng, config)
    }
}

impl<R: RngCore> EventScorer<R> {
    pub fn with_rng(rng: R, config: ScoringConfig) -> Self {
        Self { rng, config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score an event and keep every bonus as a named term.
    pub fn explain(&mut self, event: &Event, mode: Option<PersonaMode>) -> ScoreBreakdown {
        let mut breakdown = ScoreBreakdown::new(mode);

        if event.wildcard {
            let hit = self.rng.gen_bool(self.wildcard_probability());
            breakdown.add_if(hit, "serendipity", self.config.wildcard_bonus);
        }

        match mode {
            Some(PersonaMode::Housewife) => self.housewife(event, &mut breakdown),
            Some(PersonaMode::Worker) => self.worker(event, &mut breakdown),
            Some(PersonaMode::Student) => self.student(event, &mut breakdown),
            Some(PersonaMode::Tourist) => self.tourist(event, &mut breakdown),
            None => {}
        }

        breakdown.add_if(event.has_curator_note(), "curator_note", 5);
        breakdown
    }

    /// Total score for an event.
    pub fn score(&mut self, event: &Event, mode: Option<PersonaMode>) -> i32 {
        self.explain(event, mode).total()
    }

    fn wildcard_probability(&self) -> f64 {
        let p = self.config.wildcard_probability;
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn housewife(&self, event: &Event, b: &mut ScoreBreakdown) {
        let hour = event.local_hour();
        b.add_if(event.kids_ok, "kids_ok", 20);
        b.add_if(event.indoor, "indoor", 10);
        b.add_if(event.stroller_ok, "stroller_ok", 10);
        b.add_if(event.nursing_room || event.diaper_changing, "baby_care", 15);
        b.add_if(event.parking, "parking", 10);
        b.add_if(
            event.is_free || normalized_price(event.price_text.as_deref()) < 1000,
            "affordable",
            15,
        );
        b.add_if(short_duration(event, 119), "short", 5);
        b.add_if((10..=16).contains(&hour), "daytime", 10);
    }

    fn worker(&self, event: &Event, b: &mut ScoreBreakdown) {
        b.add_if(event.after18, "after18", 25);
        b.add_if(event.near_station, "near_station", 15);
        b.add_if(short_duration(event, 90), "short", 10);
        b.add_if(event.food_drink, "food_drink", 15);
        b.add_if(event.weekday_night, "weekday_night", 20);
        b.add_if(event.local_hour() >= 17, "evening", 15);
    }

    fn student(&self, event: &Event, b: &mut ScoreBreakdown) {
        b.add_if(event.is_free, "free", 25);
        b.add_if(normalized_price(event.price_text.as_deref()) < 2000, "cheap", 10);
        b.add_if(event.social, "social", 20);
        b.add_if(event.photogenic, "photogenic", 15);
        b.add_if(event.discount, "discount", 15);
    }

    fn tourist(&self, event: &Event, b: &mut ScoreBreakdown) {
        let central = event
            .area
            .as_deref()
            .is_some_and(|area| self.config.central_areas.iter().any(|c| c == area));
        b.add_if(central, "central", 10);
        b.add_if(event.english_support, "english_support", 15);
        b.add_if(event.photogenic, "photogenic", 15);
    }
}

// A zero duration means "not entered" upstream, so it earns nothing.
fn short_duration(event: &Event, max_minutes: u32) -> bool {
    event
        .duration_min
        .is_some_and(|d| d > 0 && d <= max_minutes)
}

/// Rank events for a persona: published only, score descending, then
/// soonest start first. The sort is stable, so full ties keep input order.
pub fn rank_events<R: RngCore>(
    events: Vec<Event>,
    mode: Option<PersonaMode>,
    scorer: &mut EventScorer<R>,
) -> Vec<ScoredEvent> {
    rank_explained(events, mode, scorer)
        .into_iter()
        .map(|(scored, _)| scored)
        .collect()
}

/// [`rank_events`] keeping the breakdown that produced each score.
pub fn rank_explained<R: RngCore>(
    events: Vec<Event>,
    mode: Option<PersonaMode>,
    scorer: &mut EventScorer<R>,
) -> Vec<(ScoredEvent, ScoreBreakdown)> {
    let mut scored: Vec<(ScoredEvent, ScoreBreakdown)> = events
        .into_iter()
        .filter(Event::is_published)
        .map(|event| {
            let breakdown = scorer.explain(&event, mode);
            (ScoredEvent::new(event, breakdown.total()), breakdown)
        })
        .collect();

    scored.sort_by(|(a, _), (b, _)| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.event.start_at.cmp(&b.event.start_at))
    });

    debug!(
        mode = mode.map(|m| m.as_str()).unwrap_or("none"),
        count = scored.len(),
        "ranked events"
    );
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventStatus;
    use chrono::DateTime;
    use rand::rngs::mock::StepRng;

    fn event_at(id: &str, start: &str) -> Event {
        Event::new(id, id, DateTime::parse_from_rfc3339(start).unwrap())
    }

    fn always_hit() -> EventScorer<StepRng> {
        EventScorer::with_rng(StepRng::new(0, 0), ScoringConfig::default())
    }

    fn never_hit() -> EventScorer<StepRng> {
        EventScorer::with_rng(StepRng::new(u64::MAX, 0), ScoringConfig::default())
    }

    #[test]
    fn test_normalized_price() {
        assert_eq!(normalized_price(None), 0);
        assert_eq!(normalized_price(Some("")), 0);
        assert_eq!(normalized_price(Some("FREE entry")), 0);
        assert_eq!(normalized_price(Some("入場無料 (ラーメン一杯900円)")), 0);
        assert_eq!(normalized_price(Some("1500円")), 1500);
        assert_eq!(normalized_price(Some("大人 800円 / 子供 400円")), 800);
        assert_eq!(normalized_price(Some("3,000円")), 3);
        assert_eq!(normalized_price(Some("要問合せ")), UNKNOWN_PRICE);
        assert_eq!(normalized_price(Some("99999999999999999999999")), u64::MAX);
    }

    #[test]
    fn test_persona_mode_parse() {
        assert_eq!(PersonaMode::parse("Worker"), Some(PersonaMode::Worker));
        assert_eq!(PersonaMode::parse(" tourist "), Some(PersonaMode::Tourist));
        assert_eq!(PersonaMode::parse("retiree"), None);
        assert_eq!(PersonaMode::Student.to_string(), "student");
    }

    #[test]
    fn test_worker_scenario() {
        let mut event = event_at("w", "2026-03-02T19:00:00+09:00");
        event.after18 = true;
        event.near_station = true;
        event.weekday_night = true;
        event.food_drink = true;

        let mut scorer = never_hit();
        assert_eq!(scorer.score(&event, Some(PersonaMode::Worker)), 90);

        event.curator_note = Some("仕事帰りにぴったり".into());
        assert_eq!(scorer.score(&event, Some(PersonaMode::Worker)), 95);
    }

    #[test]
    fn test_student_scenario() {
        let mut event = event_at("s", "2026-03-02T13:00:00+09:00");
        event.is_free = true;
        event.price_text = Some("無料".into());
        event.photogenic = true;

        let breakdown = never_hit().explain(&event, Some(PersonaMode::Student));
        assert_eq!(breakdown.total(), 50);
        assert_eq!(breakdown.top_term().unwrap().name, "free");
    }

    #[test]
    fn test_housewife_all_bonuses() {
        let mut event = event_at("h", "2026-03-02T11:00:00+09:00");
        event.kids_ok = true;
        event.indoor = true;
        event.stroller_ok = true;
        event.diaper_changing = true;
        event.parking = true;
        event.price_text = Some("500円".into());
        event.duration_min = Some(60);

        let score = never_hit().score(&event, Some(PersonaMode::Housewife));
        assert_eq!(score, 20 + 10 + 10 + 15 + 10 + 15 + 5 + 10);
    }

    #[test]
    fn test_housewife_boundaries() {
        let mut event = event_at("h", "2026-03-02T16:59:00+09:00");
        event.price_text = Some("1000円".into());
        event.duration_min = Some(120);
        // hour 16 is still daytime; 1000 yen is not < 1000; 120 min is not < 120
        assert_eq!(never_hit().score(&event, Some(PersonaMode::Housewife)), 10);

        event.start_at = DateTime::parse_from_rfc3339("2026-03-02T17:00:00+09:00").unwrap();
        event.duration_min = Some(0);
        assert_eq!(never_hit().score(&event, Some(PersonaMode::Housewife)), 0);
    }

    #[test]
    fn test_hour_is_read_at_the_venue() {
        // 10:00 UTC is 19:00 in Kagoshima
        let event = event_at("w", "2026-03-02T10:00:00Z");
        let local = Event {
            start_at: event.start_at.with_timezone(&chrono::FixedOffset::east_opt(9 * 3600).unwrap()),
            ..event.clone()
        };
        assert_eq!(never_hit().score(&event, Some(PersonaMode::Worker)), 0);
        assert_eq!(never_hit().score(&local, Some(PersonaMode::Worker)), 15);
    }

    #[test]
    fn test_tourist_central_area() {
        let mut event = event_at("t", "2026-03-02T10:00:00+09:00");
        event.area = Some("天文館".into());
        event.english_support = true;
        assert_eq!(never_hit().score(&event, Some(PersonaMode::Tourist)), 25);

        event.area = Some("桜島".into());
        assert_eq!(never_hit().score(&event, Some(PersonaMode::Tourist)), 15);
    }

    #[test]
    fn test_no_mode_only_curator_and_serendipity() {
        let mut event = event_at("n", "2026-03-02T19:00:00+09:00");
        event.after18 = true;
        event.kids_ok = true;
        event.curator_note = Some("必見".into());
        assert_eq!(never_hit().score(&event, None), 5);
        assert_eq!(never_hit().score(&event, PersonaMode::parse("unknown")), 5);
    }

    #[test]
    fn test_wildcard_uses_injected_rng() {
        let mut event = event_at("x", "2026-03-02T10:00:00+09:00");
        event.wildcard = true;
        assert_eq!(always_hit().score(&event, None), 50);
        assert_eq!(never_hit().score(&event, None), 0);

        let config = ScoringConfig {
            wildcard_probability: f64::NAN,
            ..ScoringConfig::default()
        };
        let mut scorer = EventScorer::with_rng(StepRng::new(0, 0), config);
        assert_eq!(scorer.score(&event, None), 0);
    }

    #[test]
    fn test_seeded_scorers_agree() {
        let mut event = event_at("x", "2026-03-02T10:00:00+09:00");
        event.wildcard = true;
        let mut a = EventScorer::seeded(7);
        let mut b = EventScorer::seeded(7);
        let run_a: Vec<i32> = (0..32).map(|_| a.score(&event, None)).collect();
        let run_b: Vec<i32> = (0..32).map(|_| b.score(&event, None)).collect();
        assert_eq!(run_a, run_b);
        // fresh draw per call: 32 draws at p=0.3 are not all equal
        assert!(run_a.contains(&0) && run_a.contains(&50));
    }

    #[test]
    fn test_rank_orders_by_score_then_start() {
        let mut late_fun = event_at("late_fun", "2026-03-05T19:00:00+09:00");
        late_fun.after18 = true;
        let early = event_at("early", "2026-03-01T10:00:00+09:00");
        let later = event_at("later", "2026-03-03T10:00:00+09:00");
        let mut draft = event_at("draft", "2026-03-01T09:00:00+09:00");
        draft.after18 = true;
        draft.status = EventStatus::Draft;

        let ranked = rank_events(
            vec![later, draft, early, late_fun],
            Some(PersonaMode::Worker),
            &mut never_hit(),
        );
        let ids: Vec<&str> = ranked.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["late_fun", "early", "later"]);
        assert_eq!(ranked[0].score, 40);
    }

    #[test]
    fn test_rank_explained_matches_scores() {
        let mut a = event_at("a", "2026-03-02T19:00:00+09:00");
        a.wildcard = true;
        a.food_drink = true;
        let b = event_at("b", "2026-03-02T09:00:00+09:00");

        let ranked = rank_explained(vec![b, a], Some(PersonaMode::Worker), &mut always_hit());
        assert_eq!(ranked[0].0.id(), "a");
        for (scored, breakdown) in &ranked {
            assert_eq!(scored.score, breakdown.total());
        }
        let names: Vec<&str> = ranked[0].1.terms.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["serendipity", "food_drink", "evening"]);
    }
}
