use fishcast::{
    config::Config,
    host::ProbeSite,
    scenario::{Lake, ScenarioLoader},
    session::SessionId,
    tracker::{FishingEvent, RodSignals},
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const PRIMARY: SessionId = SessionId::PRIMARY;

#[test]
fn real_catches_match_predictions() {
    let scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/lakeside.yaml")
        .expect("scenario should load");
    let mut lake = scenario.build_lake().expect("lake should build");
    let mut live = ChaCha8Rng::seed_from_u64(scenario.live_seed);
    let mut predictor = Lake::predictor(Config::default());
    predictor.start_session(PRIMARY);
    predictor.set_enabled(PRIMARY, true);

    let mut checked = 0;
    for tick in 0..scenario.ticks(None) as usize {
        if let Some(tile) = scenario.actor_tile(tick) {
            lake.move_actor(tile);
        }
        predictor.tick(PRIMARY, &mut lake, &mut live);
        let predictions = predictor.predictions(PRIMARY);
        assert!(!predictions.is_empty(), "no predictions at tick {tick}");
        let target = predictions[tick % predictions.len()].clone();

        let cast = RodSignals {
            casting: true,
            ..RodSignals::default()
        };
        let events = predictor.on_rod_signals(PRIMARY, cast, &mut lake, &mut live);
        assert_eq!(events, vec![FishingEvent::Cast]);
        assert!(predictor.session(PRIMARY).is_some_and(|s| s.preview.is_frozen()));

        lake.cast();
        let site = ProbeSite::new(lake.location().clone(), target.tile);
        let actual = predictor
            .resolve_actual(PRIMARY, &mut lake, &mut live, &site)
            .expect("resolution succeeds");
        assert_eq!(actual.as_ref(), Some(&target.outcome), "tick {tick} at {}", target.tile);
        if let Some(outcome) = &actual {
            lake.land(outcome);
        }

        let pulled = RodSignals {
            pulling: true,
            caught: true,
            ..RodSignals::default()
        };
        let events = predictor.on_rod_signals(PRIMARY, pulled, &mut lake, &mut live);
        assert_eq!(events, vec![FishingEvent::Caught]);
        assert!(!predictor.session(PRIMARY).is_some_and(|s| s.preview.is_frozen()));
        predictor.on_rod_signals(PRIMARY, RodSignals::default(), &mut lake, &mut live);

        lake.advance(scenario.tick_minutes, &mut live);
        checked += 1;
    }
    assert_eq!(checked, scenario.ticks(None));
}

#[test]
fn cancelled_cast_respawns_when_configured() {
    let scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/lakeside.yaml")
        .expect("scenario should load");
    let mut lake = scenario.build_lake().expect("lake should build");
    let mut live = ChaCha8Rng::seed_from_u64(scenario.live_seed);

    let mut config = Config::default();
    config.rules.respawn_on_cancel = false;
    let mut predictor = Lake::predictor(config);
    predictor.set_enabled(PRIMARY, true);
    predictor.tick(PRIMARY, &mut lake, &mut live);
    let before = predictor.predictions(PRIMARY).to_vec();

    let cast = RodSignals {
        casting: true,
        ..RodSignals::default()
    };
    predictor.on_rod_signals(PRIMARY, cast, &mut lake, &mut live);
    let events = predictor.on_rod_signals(PRIMARY, RodSignals::default(), &mut lake, &mut live);
    assert_eq!(events, vec![FishingEvent::Cancelled]);
    // Without respawn the same snapshot is kept.
    assert_eq!(predictor.predictions(PRIMARY), before.as_slice());
    assert!(!predictor.session(PRIMARY).is_some_and(|s| s.preview.is_frozen()));
}
