use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{LiveRng, ReplayableRng};

/// Which generator outcome-affecting draws should come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomSource {
    #[default]
    Live,
    Replayable,
}

/// Routes draws to either the live generator or the session's replayable fork.
///
/// Call sites ask for [`active`](Self::active) on every draw, so flipping the source only
/// affects draws made after the flip.
#[derive(Debug, Clone, Default)]
pub struct RngRouter {
    source: RandomSource,
    replay: ReplayableRng,
}

impl RngRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> RandomSource {
        self.source
    }

    pub fn set_source(&mut self, source: RandomSource) {
        self.source = source;
    }

    pub fn replay(&self) -> &ReplayableRng {
        &self.replay
    }

    pub fn replay_mut(&mut self) -> &mut ReplayableRng {
        &mut self.replay
    }

    /// The generator to draw from right now.
    ///
    /// Falls back to `live` when replay is selected but unavailable.
    pub fn active<'a>(&'a mut self, live: &'a mut dyn LiveRng) -> &'a mut dyn RngCore {
        if self.source == RandomSource::Replayable {
            if let Some(rng) = self.replay.rng() {
                return rng;
            }
        }
        live.as_rng_core()
    }

    /// Whether draws are currently served by the replayable fork.
    pub fn is_replaying(&self) -> bool {
        self.source == RandomSource::Replayable && self.replay.is_ready()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
