use std::cell::RefCell;

use fishcast::{
    clock::TimeOfDay,
    config::Config,
    host::{
        EntropySource, LocationId, OutcomeId, OutcomeResolver, PreviewContext, PreviewHost,
        ProbeSite, Tile,
    },
    preview::{OccurrencesRequired, SeededOutcome, SeededSearch},
    rng::ExportState,
    scenario::{Lake, Scenario, ScenarioLoader},
    session::SessionId,
    PredictorBuilder,
};
use rand::{rngs::mock::StepRng, rngs::StdRng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

const PRIMARY: SessionId = SessionId::PRIMARY;

fn lakeside() -> (Scenario, Lake, ChaCha8Rng) {
    let scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/lakeside.yaml")
        .expect("scenario should load");
    let lake = scenario.build_lake().expect("lake should build");
    let live = ChaCha8Rng::seed_from_u64(scenario.live_seed);
    (scenario, lake, live)
}

#[test]
fn unchanged_situation_reuses_predictions() {
    let (_, mut lake, mut live) = lakeside();
    let mut predictor = Lake::predictor(Config::default());
    predictor.set_enabled(PRIMARY, true);

    let first = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(first.snapshotted && first.recomputed);
    let predictions = predictor.predictions(PRIMARY).to_vec();
    assert!(!predictions.is_empty());

    let second = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(!second.recomputed);
    assert_eq!(predictor.predictions(PRIMARY), predictions.as_slice());
}

#[test]
fn time_within_interval_replays_same_snapshot() {
    let (_, mut lake, mut live) = lakeside();
    let mut predictor = Lake::predictor(Config::default());
    predictor.set_enabled(PRIMARY, true);
    predictor.tick(PRIMARY, &mut lake, &mut live);
    let predictions = predictor.predictions(PRIMARY).to_vec();

    lake.advance(10, &mut live);
    let refresh = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(refresh.recomputed);
    assert!(!refresh.snapshotted);
    assert_eq!(predictor.predictions(PRIMARY), predictions.as_slice());

    lake.advance(20, &mut live);
    let refresh = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(refresh.snapshotted);
}

#[test]
fn frozen_preview_keeps_replaying() {
    let (_, mut lake, mut live) = lakeside();
    let mut predictor = Lake::predictor(Config::default());
    predictor.set_enabled(PRIMARY, true);
    predictor.tick(PRIMARY, &mut lake, &mut live);
    let predictions = predictor.predictions(PRIMARY).to_vec();

    predictor.set_frozen(PRIMARY, true);
    lake.advance(60, &mut live);
    let refresh = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(refresh.recomputed);
    assert!(!refresh.snapshotted);
    // 7:00 still predates every time-gated outcome change.
    assert_eq!(predictor.predictions(PRIMARY), predictions.as_slice());

    let forced = predictor.update(PRIMARY, &mut lake, &mut live, true);
    assert!(forced.snapshotted);
}

#[test]
fn probes_leave_host_state_untouched() {
    let (_, mut lake, mut live) = lakeside();
    let mut predictor = Lake::predictor(Config::default());
    predictor.set_enabled(PRIMARY, true);

    let casts = lake.casts();
    let pond = lake.pond_occupants();
    let drops = lake.drops_awarded();
    for _ in 0..5 {
        predictor.update(PRIMARY, &mut lake, &mut live, true);
        assert_eq!(lake.casts(), casts);
        assert_eq!(lake.pond_occupants(), pond);
        assert_eq!(lake.drops_awarded(), drops);
    }
}

#[test]
fn probes_do_not_consume_the_fork() {
    let (_, mut lake, mut live) = lakeside();
    let mut predictor = Lake::predictor(Config::default());
    predictor.set_enabled(PRIMARY, true);
    predictor.tick(PRIMARY, &mut lake, &mut live);

    let replay = predictor
        .session_mut(PRIMARY)
        .preview
        .router_mut()
        .replay_mut();
    let snapshot = replay.last_snapshot().cloned();
    assert!(snapshot.is_some());
    let current = replay.generator().and_then(|fork| fork.export_state());
    assert_eq!(current, snapshot);
}

#[test]
fn probes_do_not_consume_the_live_generator() {
    let (_, mut lake, mut live) = lakeside();
    let mut reference = live.clone();
    let mut predictor = Lake::predictor(Config::default());
    predictor.set_enabled(PRIMARY, true);
    predictor.update(PRIMARY, &mut lake, &mut live, true);
    assert_eq!(live.next_u64(), reference.next_u64());
}

#[test]
fn unsupported_live_generator_degrades() {
    let (_, mut lake, _) = lakeside();
    let mut live = StdRng::seed_from_u64(3);
    let mut predictor = Lake::predictor(Config::default());
    predictor.set_enabled(PRIMARY, true);
    let refresh = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(refresh.recomputed);
    assert!(!refresh.snapshotted);
    assert!(!predictor
        .session(PRIMARY)
        .map(|session| session.preview.router().is_replaying())
        .unwrap_or(true));
}

#[test]
fn day_rollover_takes_a_fresh_snapshot() {
    let (_, mut lake, mut live) = lakeside();
    let mut predictor = Lake::predictor(Config::default());
    predictor.set_enabled(PRIMARY, true);

    lake.set_time(TimeOfDay::new(2550));
    assert!(predictor.tick(PRIMARY, &mut lake, &mut live).snapshotted);
    lake.set_time(TimeOfDay::new(600));
    let refresh = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(refresh.snapshotted);
    assert!(refresh.recomputed);
}

/// The lakeside host with a switch for whether fishing is possible at all.
struct Shoreline {
    lake: Lake,
    open: bool,
}

impl OutcomeResolver for Shoreline {
    fn resolve(
        &mut self,
        rng: &mut dyn RngCore,
        site: &ProbeSite,
    ) -> anyhow::Result<Option<OutcomeId>> {
        self.lake.resolve(rng, site)
    }
}

impl EntropySource for Shoreline {}

impl PreviewHost for Shoreline {
    fn preview_context(&self) -> PreviewContext {
        self.lake.preview_context()
    }

    fn can_fish_here(&self) -> bool {
        self.open && self.lake.can_fish_here()
    }

    fn is_fishable(&self, tile: Tile) -> bool {
        self.lake.is_fishable(tile)
    }

    fn seeded_outcomes(&self, location: &LocationId) -> Vec<SeededOutcome> {
        self.lake.seeded_outcomes(location)
    }

    fn session_seed(&self) -> u64 {
        self.lake.session_seed()
    }
}

#[test]
fn returning_to_a_fishable_spot_recomputes() {
    let (_, lake, mut live) = lakeside();
    let mut shore = Shoreline { lake, open: true };
    let mut predictor = PredictorBuilder::<Shoreline>::new(Config::default()).build();
    predictor.set_enabled(PRIMARY, true);

    predictor.tick(PRIMARY, &mut shore, &mut live);
    assert!(!predictor.predictions(PRIMARY).is_empty());

    shore.open = false;
    predictor.tick(PRIMARY, &mut shore, &mut live);
    assert!(predictor.predictions(PRIMARY).is_empty());
    assert_eq!(
        predictor.seeded_forecast(PRIMARY).map(|forecast| forecast.required),
        Some(OccurrencesRequired::Unknown)
    );

    // Same location, tile and time as before the gap.
    shore.open = true;
    let refresh = predictor.tick(PRIMARY, &mut shore, &mut live);
    assert!(refresh.recomputed);
    assert!(refresh.seeded);
    assert!(!predictor.predictions(PRIMARY).is_empty());
}

#[test]
fn disabled_preview_does_nothing() {
    let (_, mut lake, mut live) = lakeside();
    let mut predictor = Lake::predictor(Config::default());
    let refresh = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(!refresh.recomputed);
    assert!(predictor.predictions(PRIMARY).is_empty());
    assert!(predictor.seeded_forecast(PRIMARY).is_none());
}

#[test]
fn sessions_are_independent() {
    let (scenario, mut lake_a, mut live_a) = lakeside();
    let mut lake_b = scenario.build_lake().expect("lake should build");
    let mut live_b = ChaCha8Rng::seed_from_u64(99);
    lake_b.move_actor(Tile::new(10, 8));

    let mut predictor = Lake::predictor(Config::default());
    let (a, b) = (SessionId(0), SessionId(1));
    predictor.set_enabled(a, true);
    predictor.set_enabled(b, true);
    predictor.tick(a, &mut lake_a, &mut live_a);
    predictor.tick(b, &mut lake_b, &mut live_b);
    let predictions_a = predictor.predictions(a).to_vec();

    predictor.set_frozen(b, true);
    predictor.set_enabled(b, false);
    assert!(predictor.is_enabled(a));
    assert!(!predictor.session(a).map_or(true, |s| s.preview.is_frozen()));
    assert_eq!(predictor.predictions(a), predictions_a.as_slice());
    assert!(predictor.predictions(b).is_empty());

    predictor.reset_session(a);
    assert!(!predictor.is_enabled(a));
    assert!(predictor.predictions(a).is_empty());
}

#[test]
fn seeded_forecast_tracks_catch_count() {
    let (_, mut lake, mut live) = lakeside();
    let mut predictor = Lake::predictor(Config::default());
    predictor.set_enabled(PRIMARY, true);
    let refresh = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(refresh.seeded);

    let refresh = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(!refresh.seeded);

    let before = predictor.seeded_forecast(PRIMARY).cloned();
    lake.land(&OutcomeId::new("carp"));
    let refresh = predictor.tick(PRIMARY, &mut lake, &mut live);
    assert!(refresh.seeded);
    if let Some(OccurrencesRequired::Known(required)) = before.map(|forecast| forecast.required) {
        let after = predictor
            .seeded_forecast(PRIMARY)
            .map(|forecast| forecast.required);
        // One catch closer, unless it was due on this very catch.
        if required > 0 {
            assert_eq!(after, Some(OccurrencesRequired::Known(required - 1)));
        }
    }
}

/// Hands out generators whose first `f64` is fixed per trial offset, and records which
/// offsets were requested.
struct ScriptedTrials {
    stride: u64,
    count: u64,
    requested: RefCell<Vec<u64>>,
}

impl ScriptedTrials {
    fn sample_for(offset: u64) -> f64 {
        match offset {
            3 => 0.4,
            5 => 0.0,
            _ => 0.99,
        }
    }
}

impl EntropySource for ScriptedTrials {
    fn seeded_rng(&self, words: &[u64]) -> Box<dyn RngCore> {
        let offset = words[1] / self.stride - self.count;
        self.requested.borrow_mut().push(offset);
        let bits = (Self::sample_for(offset) * (1u64 << 53) as f64) as u64;
        Box::new(StepRng::new(bits << 11, 0))
    }
}

fn context(count: u64) -> PreviewContext {
    PreviewContext {
        location: LocationId::new("lake"),
        actor_tile: Tile::new(0, 0),
        time_of_day: TimeOfDay::new(600),
        tool: None,
        bait: None,
        bait_target: None,
        tackle: Vec::new(),
        curiosity_lure: false,
        occurrence_count: count,
        luck_level: 0,
        daily_luck: 0.0,
    }
}

#[test]
fn seeded_search_is_capped_by_earliest_success() {
    let search = SeededSearch::new(20, 859);
    let entropy = ScriptedTrials {
        stride: 859,
        count: 10,
        requested: RefCell::new(Vec::new()),
    };
    let definitions = [
        SeededOutcome::new(OutcomeId::new("a"), 0.5),
        SeededOutcome::new(OutcomeId::new("b"), 0.3),
    ];
    let forecast = search.forecast(&definitions, &context(10), 1, &entropy);

    assert_eq!(forecast.required, OccurrencesRequired::Known(3));
    // "b" would succeed at 5, beyond the cap set by "a".
    assert_eq!(forecast.outcomes, vec![OutcomeId::new("a")]);
    let requested = entropy.requested.into_inner();
    assert_eq!(requested, vec![0, 1, 2, 3, 0, 1, 2, 3]);
}

#[test]
fn seeded_search_reports_ties() {
    let search = SeededSearch::new(20, 859);
    let entropy = ScriptedTrials {
        stride: 859,
        count: 0,
        requested: RefCell::new(Vec::new()),
    };
    let definitions = [
        SeededOutcome::new(OutcomeId::new("a"), 0.5),
        SeededOutcome::new(OutcomeId::new("b"), 0.45),
    ];
    let forecast = search.forecast(&definitions, &context(0), 1, &entropy);
    assert_eq!(forecast.required, OccurrencesRequired::Known(3));
    assert_eq!(
        forecast.outcomes,
        vec![OutcomeId::new("a"), OutcomeId::new("b")]
    );
}
