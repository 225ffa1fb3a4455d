//! Full-day splash forecasting.
//!
//! Every step of the day gets a fresh generator seeded from the step's time, so the whole day
//! can be replayed up front without touching any live generator.

mod schedule;

pub use schedule::{SplashCountdown, SplashSchedule};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{DayClock, TimeOfDay};
use crate::config::{Config, SplashConfig};
use crate::effects::SideEffectRegistry;
use crate::host::{ForecastHost, LocationId, OutcomeId, ProbeSite, Tile};
use crate::rng::RngExt;

/// What the host reports about the location being forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastContext {
    pub location: LocationId,
    /// `false` for locations that never get splashes (e.g. indoors).
    pub splashes_allowed: bool,
    /// Whether the location kind can host special splashes at all.
    pub special_allowed_here: bool,
    /// Location-specific special threshold; the configured default otherwise.
    pub special_threshold: Option<f64>,
    pub total_days: u32,
    /// Distinct outcome kinds the actor has ever produced.
    pub kinds_caught: u32,
    pub festival_day: bool,
    /// Per-day seed word, mixed into every step's generator.
    pub day_seed: u64,
}

/// One splash: where, from when, until when, and its special outcome if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub tile: Tile,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub special: Option<OutcomeId>,
}

impl ScheduleWindow {
    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.start <= time && time < self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        self.start.minutes_until(self.end)
    }
}

/// Rule set deciding when splashes start, end and turn special.
#[derive(Debug, Clone, PartialEq)]
pub struct SplashRules {
    config: SplashConfig,
}

impl SplashRules {
    pub fn new(config: SplashConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplashConfig {
        &self.config
    }

    pub fn min_duration(&self, special: bool) -> u32 {
        if special {
            self.config.min_special_duration
        } else {
            self.config.min_duration
        }
    }

    /// Threshold an in-progress splash's sample must fall under for it to end.
    pub fn end_threshold(&self, duration_minutes: i64) -> f64 {
        self.config.end_threshold + duration_minutes as f64 / self.config.duration_weight
    }

    pub fn in_land_range(&self, distance: u32) -> bool {
        (self.config.min_distance_to_land..=self.config.max_distance_to_land).contains(&distance)
    }

    pub fn special_threshold(&self, ctx: &ForecastContext) -> f64 {
        ctx.special_threshold
            .unwrap_or(self.config.default_special_threshold)
    }

    /// Whether a special splash may start at `time`. Checked only after its sample passes.
    pub fn special_allowed(&self, ctx: &ForecastContext, time: TimeOfDay) -> bool {
        let experienced = ctx.kinds_caught >= self.config.min_kinds_caught_early
            || ctx.total_days > self.config.min_days_late;
        ctx.special_allowed_here
            && ctx.total_days > self.config.min_days_early
            && time < self.config.max_special_start_time
            && experienced
            && !ctx.festival_day
    }
}

struct OpenSplash {
    tile: Tile,
    start: TimeOfDay,
    special: Option<OutcomeId>,
}

impl OpenSplash {
    fn close(self, end: TimeOfDay) -> ScheduleWindow {
        ScheduleWindow {
            tile: self.tile,
            start: self.start,
            end,
            special: self.special,
        }
    }
}

/// Replays a location's whole day of splash rolls.
#[derive(Debug, Clone)]
pub struct SplashForecaster {
    rules: SplashRules,
    clock: DayClock,
}

impl SplashForecaster {
    pub fn new(rules: SplashRules, clock: DayClock) -> Self {
        Self { rules, clock }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SplashRules::new(config.splash.clone()),
            config.clock.day_clock(),
        )
    }

    pub fn rules(&self) -> &SplashRules {
        &self.rules
    }

    pub fn clock(&self) -> &DayClock {
        &self.clock
    }

    /// Seed words for the generator of one step.
    pub fn step_seed(day_seed: u64, time: TimeOfDay, map_width: u32) -> [u64; 3] {
        [day_seed, u64::from(time.raw()), u64::from(map_width)]
    }

    /// The day's splashes at the host's current location, in start order.
    ///
    /// Special outcomes are resolved inside a side-effect scope.
    pub fn forecast<H: ForecastHost>(
        &self,
        host: &mut H,
        effects: &mut SideEffectRegistry<H>,
    ) -> Vec<ScheduleWindow> {
        let ctx = host.forecast_context();
        let (width, height) = host.map_size();
        if !ctx.splashes_allowed || width == 0 || height == 0 {
            return Vec::new();
        }
        let config = self.rules.config();
        let special_threshold = self.rules.special_threshold(&ctx);

        let mut windows = Vec::new();
        let mut current: Option<OpenSplash> = None;
        for time in self.clock.steps() {
            let mut rng = host.seeded_rng(&Self::step_seed(ctx.day_seed, time, width));

            if let Some(open) = current.take() {
                let duration = open.start.minutes_until(time);
                // Sample before the minimum-duration gate, as the live rules do.
                let sample = rng.unit();
                let min_duration = self.rules.min_duration(open.special.is_some());
                if sample < self.rules.end_threshold(duration) && duration > i64::from(min_duration)
                {
                    windows.push(open.close(time));
                } else {
                    current = Some(open);
                }
                continue;
            }

            if !rng.chance(config.start_chance) {
                continue;
            }
            for _ in 0..config.placement_tries {
                let tile = Tile::new(
                    rng.gen_range(0..width) as i32,
                    rng.gen_range(0..height) as i32,
                );
                if !host.is_open_water(tile)
                    || !host.allows_fishing(tile)
                    || !self.rules.in_land_range(host.distance_to_land(tile))
                {
                    continue;
                }
                let special_sample = rng.unit();
                let special = if special_sample < special_threshold
                    && self.rules.special_allowed(&ctx, time)
                {
                    let roll = rng.gen_range(0..config.special_roll_range);
                    let site = ProbeSite::new(ctx.location.clone(), tile);
                    let resolved = effects
                        .with_scope(&mut *host, &site, |host| host.resolve(&mut *rng, &site));
                    debug!(%tile, %time, roll, "resolving special splash");
                    match resolved {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            warn!(%tile, %time, "special splash resolution failed: {err:#}");
                            None
                        }
                    }
                } else {
                    None
                };
                current = Some(OpenSplash {
                    tile,
                    start: time,
                    special,
                });
                break;
            }
        }
        if let Some(open) = current {
            windows.push(open.close(self.clock.end));
        }
        debug!(location = %ctx.location, splashes = windows.len(), "splash forecast ready");
        windows
    }
}
