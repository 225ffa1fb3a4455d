//! The seams between the prediction engine and the host simulation.
//!
//! The engine never decides what a draw means. It hands a generator to the host's
//! [`OutcomeResolver`] and records what comes back.

use std::fmt;

use anyhow::Result;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::clock::TimeOfDay;
use crate::forecast::ForecastContext;
use crate::preview::SeededOutcome;
use crate::rng::seeded_rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeId(pub String);

impl OutcomeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutcomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a probe (or a real resolution) takes place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeSite {
    pub location: LocationId,
    pub tile: Tile,
}

impl ProbeSite {
    pub fn new(location: LocationId, tile: Tile) -> Self {
        Self { location, tile }
    }
}

/// Everything the host reports about the acting player on a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewContext {
    pub location: LocationId,
    pub actor_tile: Tile,
    pub time_of_day: TimeOfDay,
    pub tool: Option<String>,
    pub bait: Option<String>,
    /// Outcome the equipped bait targets, if any.
    pub bait_target: Option<OutcomeId>,
    pub tackle: Vec<String>,
    /// Whether the equipped tackle counts as a curiosity lure.
    pub curiosity_lure: bool,
    /// Monotonic count of successful occurrences (e.g. total catches).
    pub occurrence_count: u64,
    pub luck_level: i32,
    pub daily_luck: f64,
}

/// Turns a draw into an outcome. May read and mutate arbitrary host state.
pub trait OutcomeResolver {
    fn resolve(&mut self, rng: &mut dyn RngCore, site: &ProbeSite) -> Result<Option<OutcomeId>>;
}

/// Constructor for fresh generators from deterministic seed words.
pub trait EntropySource {
    fn seeded_rng(&self, words: &[u64]) -> Box<dyn RngCore> {
        Box::new(seeded_rng(words))
    }
}

/// Host collaborators needed by the catch preview.
pub trait PreviewHost: OutcomeResolver + EntropySource {
    fn preview_context(&self) -> PreviewContext;

    /// Whether the current location supports fishing at all.
    fn can_fish_here(&self) -> bool;

    /// Whether `tile` is on the map and can be fished.
    fn is_fishable(&self, tile: Tile) -> bool;

    /// Seeded outcome definitions for a location.
    fn seeded_outcomes(&self, location: &LocationId) -> Vec<SeededOutcome>;

    /// Session-wide identifier mixed into seeded trials (e.g. the save's unique id).
    fn session_seed(&self) -> u64;
}

/// Host collaborators needed by the splash forecaster.
pub trait ForecastHost: OutcomeResolver + EntropySource {
    fn forecast_context(&self) -> ForecastContext;

    /// Map width and height in tiles.
    fn map_size(&self) -> (u32, u32);

    fn is_open_water(&self, tile: Tile) -> bool;

    /// `false` for tiles explicitly marked as not fishable.
    fn allows_fishing(&self, tile: Tile) -> bool;

    fn distance_to_land(&self, tile: Tile) -> u32;
}
