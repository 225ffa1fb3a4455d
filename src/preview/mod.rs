//! Catch preview: cached predictions for the tiles around the actor.
//!
//! Each probe runs inside a side-effect scope and draws from the session's replayable fork,
//! which is rewound after every tile. A real resolution made through the same router right
//! after an update therefore sees exactly the draws the prediction saw.

mod fingerprint;
mod seeded;

pub use fingerprint::PredictionFingerprint;
pub use seeded::{OccurrencesRequired, SeededForecast, SeededOutcome, SeededSearch};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clock::{minutes_between, TimeOfDay};
use crate::config::Config;
use crate::effects::SideEffectRegistry;
use crate::host::{LocationId, OutcomeId, PreviewContext, PreviewHost, ProbeSite, Tile};
use crate::logging::LogOnce;
use crate::rng::{LiveRng, RandomSource, RngRouter};

/// The predicted outcome for one tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchPrediction {
    pub tile: Tile,
    pub outcome: OutcomeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSettings {
    pub tile_radius: u32,
    pub respawn_interval_minutes: u32,
    pub seeded: SeededSearch,
}

impl PreviewSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tile_radius: config.preview.tile_radius,
            respawn_interval_minutes: config.preview.respawn_interval_minutes,
            seeded: SeededSearch::new(
                config.preview.seeded_attempts,
                config.preview.seeded_seed_stride,
            ),
        }
    }
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What an [`CatchPreview::update`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewRefresh {
    pub seeded: bool,
    pub snapshotted: bool,
    pub recomputed: bool,
}

/// Tiles within Manhattan distance `radius` of `center`, column by column.
pub fn tiles_in_radius(center: Tile, radius: u32) -> Vec<Tile> {
    let radius = i32::try_from(radius).unwrap_or(i32::MAX / 2);
    let mut tiles = Vec::new();
    for dx in -radius..=radius {
        let dy_max = radius - dx.abs();
        for dy in -dy_max..=dy_max {
            tiles.push(Tile::new(center.x + dx, center.y + dy));
        }
    }
    tiles
}

/// Per-session preview state.
#[derive(Debug, Default)]
pub struct CatchPreview {
    enabled: bool,
    frozen: bool,
    router: RngRouter,
    last_fingerprint: Option<PredictionFingerprint>,
    last_snapshot_time: Option<TimeOfDay>,
    predictions: Vec<CatchPrediction>,
    seeded_location: Option<LocationId>,
    seeded_definitions: Vec<SeededOutcome>,
    seeded: SeededForecast,
    failures: LogOnce,
}

impl CatchPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable predictions; also points the router at the replayable fork or back at
    /// the live generator.
    ///
    /// Re-enabling discards the last snapshot so the next update starts fresh.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.router.set_source(if enabled {
            RandomSource::Replayable
        } else {
            RandomSource::Live
        });
        self.last_fingerprint = None;
        self.last_snapshot_time = None;
        if !enabled {
            self.predictions.clear();
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// While frozen, updates keep replaying the last snapshot instead of taking new ones.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    pub fn router(&self) -> &RngRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut RngRouter {
        &mut self.router
    }

    pub fn predictions(&self) -> &[CatchPrediction] {
        &self.predictions
    }

    pub fn seeded_forecast(&self) -> &SeededForecast {
        &self.seeded
    }

    pub fn last_snapshot_time(&self) -> Option<TimeOfDay> {
        self.last_snapshot_time
    }

    /// Refresh predictions for the host's current situation.
    ///
    /// `force` takes a fresh snapshot and recomputes everything regardless of what changed.
    pub fn update<H: PreviewHost>(
        &mut self,
        settings: &PreviewSettings,
        host: &mut H,
        live: &mut dyn LiveRng,
        effects: &mut SideEffectRegistry<H>,
        force: bool,
    ) -> PreviewRefresh {
        let mut refresh = PreviewRefresh::default();
        if !self.enabled {
            return refresh;
        }
        if !host.can_fish_here() {
            // Forget the last situation so coming back to it recomputes.
            self.predictions.clear();
            self.seeded = SeededForecast::default();
            self.last_fingerprint = None;
            return refresh;
        }
        let ctx = host.preview_context();
        let fingerprint = PredictionFingerprint::from_context(&ctx);

        if force || !fingerprint.same_for_seeded(self.last_fingerprint.as_ref()) {
            self.refresh_seeded(settings, host, &ctx);
            refresh.seeded = true;
        }

        let elapsed = self
            .last_snapshot_time
            .map(|last| minutes_between(last, ctx.time_of_day));
        // A negative elapsed time means the day rolled over.
        let due_for_snapshot = match elapsed {
            None => true,
            Some(minutes) => {
                !self.frozen
                    && (minutes < 0 || minutes >= i64::from(settings.respawn_interval_minutes))
            }
        };
        let snapshot = force || due_for_snapshot;
        let recompute = force
            || snapshot
            || elapsed != Some(0)
            || !fingerprint.same_for_regular(self.last_fingerprint.as_ref());

        if recompute {
            debug!(
                location = %ctx.location,
                tile = %ctx.actor_tile,
                time = %ctx.time_of_day,
                snapshot,
                "recomputing catch predictions"
            );
            let snapshotted = self.refresh_regular(settings, host, live, effects, &ctx, snapshot);
            if snapshot {
                self.last_snapshot_time = Some(ctx.time_of_day);
            }
            refresh.snapshotted = snapshotted;
            refresh.recomputed = true;
        }
        self.last_fingerprint = Some(fingerprint);
        refresh
    }

    fn refresh_seeded<H: PreviewHost>(
        &mut self,
        settings: &PreviewSettings,
        host: &H,
        ctx: &PreviewContext,
    ) {
        if self.seeded_location.as_ref() != Some(&ctx.location) {
            self.seeded_definitions = host.seeded_outcomes(&ctx.location);
            self.seeded_location = Some(ctx.location.clone());
        }
        self.seeded = if self.seeded_definitions.is_empty() {
            SeededForecast::default()
        } else {
            settings
                .seeded
                .forecast(&self.seeded_definitions, ctx, host.session_seed(), host)
        };
    }

    fn refresh_regular<H: PreviewHost>(
        &mut self,
        settings: &PreviewSettings,
        host: &mut H,
        live: &mut dyn LiveRng,
        effects: &mut SideEffectRegistry<H>,
        ctx: &PreviewContext,
        snapshot: bool,
    ) -> bool {
        let router = &mut self.router;
        // A failed snapshot is already reported; the router falls back to the live generator.
        let snapshotted = snapshot && router.replay_mut().snapshot(&*live).is_ok();
        if !snapshot {
            if let Err(err) = router.replay_mut().rewind() {
                trace!(error = %err, "nothing to rewind before recomputing");
            }
        }

        self.predictions.clear();
        for tile in tiles_in_radius(ctx.actor_tile, settings.tile_radius) {
            if !host.is_fishable(tile) {
                continue;
            }
            let site = ProbeSite::new(ctx.location.clone(), tile);
            let resolved = effects.with_scope(&mut *host, &site, |host| {
                host.resolve(router.active(&mut *live), &site)
            });
            match resolved {
                Ok(Some(outcome)) => self.predictions.push(CatchPrediction { tile, outcome }),
                Ok(None) => {}
                Err(err) => {
                    self.failures
                        .error("resolve", &format!("outcome resolver failed at {tile}: {err:#}"));
                }
            }
            if router.is_replaying() {
                if let Err(err) = router.replay_mut().rewind() {
                    trace!(error = %err, "rewind after probe failed");
                }
            }
        }
        snapshotted
    }

    /// Back to defaults: disabled, unfrozen, no snapshot, no predictions.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
