use anyhow::Result;
use rand::RngCore;
use tracing::debug;

use crate::{
    clock::TimeOfDay,
    config::{Config, RuleConfig},
    effects::{SideEffect, SideEffectRegistry},
    forecast::{ScheduleWindow, SplashCountdown, SplashForecaster, SplashSchedule},
    host::{ForecastHost, LocationId, OutcomeId, PreviewHost, ProbeSite},
    preview::{CatchPrediction, CatchPreview, PreviewRefresh, PreviewSettings, SeededForecast},
    rng::LiveRng,
    session::{PerSession, SessionId},
    tracker::{FishingEvent, FishingTracker, RodSignals},
};

/// All mutable prediction state of one session.
#[derive(Debug, Default)]
pub struct PreviewSession {
    pub preview: CatchPreview,
    pub tracker: FishingTracker,
    pub splashes: SplashSchedule,
}

pub struct PredictorBuilder<H> {
    config: Config,
    effects: SideEffectRegistry<H>,
}

impl<H> PredictorBuilder<H> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            effects: SideEffectRegistry::new(),
        }
    }

    pub fn with_effect(mut self, effect: impl SideEffect<H> + 'static) -> Self {
        self.effects.register(effect);
        self
    }

    pub fn build(self) -> Predictor<H> {
        Predictor {
            settings: PreviewSettings::from_config(&self.config),
            forecaster: SplashForecaster::from_config(&self.config),
            rules: self.config.rules.clone(),
            enable_on_load: self.config.preview.enable_on_load,
            effects: self.effects,
            sessions: PerSession::new(),
        }
    }
}

/// Entry point for hosts: catch previews, seeded forecasts and splash schedules, per session.
pub struct Predictor<H> {
    settings: PreviewSettings,
    forecaster: SplashForecaster,
    rules: RuleConfig,
    enable_on_load: bool,
    effects: SideEffectRegistry<H>,
    sessions: PerSession<PreviewSession>,
}

impl<H> Predictor<H> {
    pub fn settings(&self) -> &PreviewSettings {
        &self.settings
    }

    pub fn forecaster(&self) -> &SplashForecaster {
        &self.forecaster
    }

    pub fn effects(&self) -> &SideEffectRegistry<H> {
        &self.effects
    }

    pub fn session(&self, id: SessionId) -> Option<&PreviewSession> {
        self.sessions.get(id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> &mut PreviewSession {
        self.sessions.get_mut(id)
    }

    /// Fresh state for a session that just loaded, enabled per configuration.
    pub fn start_session(&mut self, id: SessionId) {
        self.sessions.reset(id);
        let enable = self.enable_on_load;
        self.sessions.get_mut(id).preview.set_enabled(enable);
    }

    pub fn is_enabled(&self, id: SessionId) -> bool {
        self.sessions
            .get(id)
            .is_some_and(|session| session.preview.is_enabled())
    }

    pub fn set_enabled(&mut self, id: SessionId, enabled: bool) {
        debug!(session = %id, enabled, "catch preview toggled");
        self.sessions.get_mut(id).preview.set_enabled(enabled);
    }

    /// Flip the enabled flag, returning the new value.
    pub fn toggle(&mut self, id: SessionId) -> bool {
        let enabled = !self.is_enabled(id);
        self.set_enabled(id, enabled);
        enabled
    }

    pub fn set_frozen(&mut self, id: SessionId, frozen: bool) {
        self.sessions.get_mut(id).preview.set_frozen(frozen);
    }

    /// The generator real outcome-affecting draws must come from.
    ///
    /// While previews are enabled this is the replayable fork, so the real draw matches the
    /// prediction.
    pub fn draw_rng<'a>(&'a mut self, id: SessionId, live: &'a mut dyn LiveRng) -> &'a mut dyn RngCore {
        self.sessions.get_mut(id).preview.router_mut().active(live)
    }

    pub fn predictions(&self, id: SessionId) -> &[CatchPrediction] {
        self.sessions
            .get(id)
            .map(|session| session.preview.predictions())
            .unwrap_or(&[])
    }

    pub fn seeded_forecast(&self, id: SessionId) -> Option<&SeededForecast> {
        self.sessions
            .get(id)
            .filter(|session| session.preview.is_enabled())
            .map(|session| session.preview.seeded_forecast())
    }

    pub fn current_splash(&self, id: SessionId) -> Option<&ScheduleWindow> {
        self.sessions
            .get(id)
            .and_then(|session| session.splashes.current())
    }

    pub fn splash_countdown(&self, id: SessionId, now: TimeOfDay) -> Option<SplashCountdown> {
        self.current_splash(id)
            .map(|window| SplashCountdown::relative_to(window, now))
    }

    pub fn splash_schedule(&self, id: SessionId, location: &LocationId) -> Option<&[ScheduleWindow]> {
        self.sessions
            .get(id)
            .and_then(|session| session.splashes.windows(location))
    }

    /// Forget every location's splash schedule for the session.
    pub fn on_day_started(&mut self, id: SessionId) {
        self.sessions.get_mut(id).splashes.clear();
    }

    pub fn reset_session(&mut self, id: SessionId) {
        self.sessions.reset(id);
    }

    pub fn reset_all(&mut self) {
        self.sessions.reset_all();
    }
}

impl<H: PreviewHost> Predictor<H> {
    /// Per-tick update; recomputes only what the current situation invalidated.
    pub fn tick(&mut self, id: SessionId, host: &mut H, live: &mut dyn LiveRng) -> PreviewRefresh {
        self.update(id, host, live, false)
    }

    pub fn update(
        &mut self,
        id: SessionId,
        host: &mut H,
        live: &mut dyn LiveRng,
        force: bool,
    ) -> PreviewRefresh {
        self.sessions
            .get_mut(id)
            .preview
            .update(&self.settings, host, live, &mut self.effects, force)
    }

    /// Feed this tick's rod flags and apply the reactions to whatever events they produce.
    pub fn on_rod_signals(
        &mut self,
        id: SessionId,
        rod: RodSignals,
        host: &mut H,
        live: &mut dyn LiveRng,
    ) -> Vec<FishingEvent> {
        let events = self.sessions.get_mut(id).tracker.update(rod);
        for &event in &events {
            debug!(session = %id, ?event, "fishing event");
            match event {
                FishingEvent::Cast => {
                    if self.rules.freeze_on_cast {
                        self.set_frozen(id, true);
                    }
                }
                FishingEvent::Caught | FishingEvent::Lost => {
                    self.set_frozen(id, false);
                    self.update(id, host, live, true);
                }
                FishingEvent::Cancelled => {
                    self.set_frozen(id, false);
                    let force = self.rules.respawn_on_cancel;
                    self.update(id, host, live, force);
                }
            }
        }
        events
    }

    /// Resolve the real outcome at `site`, drawing through the session's router.
    ///
    /// No side effects are undone: this is the outcome that actually happens.
    pub fn resolve_actual(
        &mut self,
        id: SessionId,
        host: &mut H,
        live: &mut dyn LiveRng,
        site: &ProbeSite,
    ) -> Result<Option<OutcomeId>> {
        let rng = self.draw_rng(id, live);
        host.resolve(rng, site)
    }
}

impl<H: ForecastHost> Predictor<H> {
    pub fn on_location_changed(
        &mut self,
        id: SessionId,
        host: &mut H,
        now: TimeOfDay,
    ) -> Option<&ScheduleWindow> {
        self.refresh_splash(id, host, now)
    }

    pub fn on_time_changed(
        &mut self,
        id: SessionId,
        host: &mut H,
        now: TimeOfDay,
    ) -> Option<&ScheduleWindow> {
        self.refresh_splash(id, host, now)
    }

    fn refresh_splash(&mut self, id: SessionId, host: &mut H, now: TimeOfDay) -> Option<&ScheduleWindow> {
        let location = host.forecast_context().location;
        let forecaster = &self.forecaster;
        let effects = &mut self.effects;
        let session = self.sessions.get_mut(id);
        session.splashes.get_or_compute(&location, || {
            debug!(session = %id, %location, "forecasting splashes");
            forecaster.forecast(host, effects)
        });
        session.splashes.update_current(&location, now)
    }

    /// The whole-day schedule for the host's current location, bypassing the session cache.
    pub fn forecast_now(&mut self, host: &mut H) -> Vec<ScheduleWindow> {
        self.forecaster.forecast(host, &mut self.effects)
    }
}
