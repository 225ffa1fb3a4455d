//! A small lake host loaded from YAML, used by the binary and the integration tests.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, ensure, Context, Result};
use rand::RngCore;
use serde::Deserialize;

use crate::{
    clock::TimeOfDay,
    config::Config,
    effects::{CappedCounter, CounterCompensation, PoolOccupancy},
    engine::{Predictor, PredictorBuilder},
    forecast::ForecastContext,
    host::{
        EntropySource, ForecastHost, LocationId, OutcomeId, OutcomeResolver, PreviewContext,
        PreviewHost, ProbeSite, Tile,
    },
    preview::{SeededOutcome, SeededSearch},
    rng::RngExt,
};

const MAX_LAND_SEARCH: u32 = 10;

fn default_live_seed() -> u64 {
    1
}

fn default_start_time() -> TimeOfDay {
    TimeOfDay::new(600)
}

fn default_tick_minutes() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_seed_stride() -> u64 {
    859
}

fn default_pond_catch_chance() -> f64 {
    0.8
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub session_seed: u64,
    pub day_seed: u64,
    /// Seed of the live generator the host draws from.
    #[serde(default = "default_live_seed")]
    pub live_seed: u64,
    #[serde(default = "default_start_time")]
    pub start_time: TimeOfDay,
    #[serde(default = "default_tick_minutes")]
    pub tick_minutes: u32,
    #[serde(default)]
    pub ticks: Option<u32>,
    /// Rows of `~` water, `.` land, `P` pond, `#` water where fishing is not allowed.
    pub map: Vec<String>,
    pub outcomes: Vec<ScenarioOutcome>,
    #[serde(default)]
    pub nothing_weight: f64,
    #[serde(default)]
    pub seeded: Vec<SeededOutcome>,
    #[serde(default = "default_seed_stride")]
    pub seeded_seed_stride: u64,
    #[serde(default)]
    pub pond: Option<ScenarioPond>,
    #[serde(default)]
    pub drops: Option<ScenarioDrops>,
    #[serde(default)]
    pub bonus: Option<ScenarioBonus>,
    pub actor: ScenarioActor,
    #[serde(default)]
    pub progress: ScenarioProgress,
    #[serde(default = "default_true")]
    pub splashes_allowed: bool,
    #[serde(default = "default_true")]
    pub special_splashes_allowed: bool,
    #[serde(default)]
    pub special_threshold: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioOutcome {
    pub id: String,
    pub weight: f64,
    #[serde(default)]
    pub min_distance: u32,
    #[serde(default)]
    pub after: Option<TimeOfDay>,
    #[serde(default)]
    pub before: Option<TimeOfDay>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioPond {
    pub outcome: String,
    pub occupants: u32,
    #[serde(default = "default_pond_catch_chance")]
    pub catch_chance: f64,
}

/// A capped drop awarded as a side effect of resolving.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioDrops {
    pub chance: f64,
    pub cap: u32,
    #[serde(default)]
    pub awarded: u32,
}

/// Every `every`-th cast yields `outcome`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioBonus {
    pub every: u64,
    pub outcome: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioActor {
    /// Tiles the actor stands on, one per tick, looping.
    pub path: Vec<[i32; 2]>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub bait: Option<String>,
    #[serde(default)]
    pub bait_target: Option<String>,
    #[serde(default)]
    pub tackle: Vec<String>,
    #[serde(default)]
    pub curiosity_lure: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScenarioProgress {
    pub total_days: u32,
    pub kinds_caught: u32,
    pub catches: u64,
    pub casts: u64,
    pub festival_day: bool,
    pub luck_level: i32,
    pub daily_luck: f64,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn ticks(&self, override_ticks: Option<u32>) -> u32 {
        override_ticks.or(self.ticks).unwrap_or(12)
    }

    pub fn build_lake(&self) -> Result<Lake> {
        let cells = parse_map(&self.map)?;
        ensure!(!self.actor.path.is_empty(), "actor path must not be empty");
        ensure!(
            self.outcomes.iter().all(|o| o.weight >= 0.0) && self.nothing_weight >= 0.0,
            "outcome weights must not be negative"
        );
        if let Some(bonus) = &self.bonus {
            ensure!(bonus.every > 0, "bonus.every must be at least 1");
        }
        let [x, y] = self.actor.path[0];
        Ok(Lake {
            location: LocationId::new(self.location.clone()),
            width: cells.first().map_or(0, Vec::len) as u32,
            height: cells.len() as u32,
            cells,
            outcomes: self.outcomes.clone(),
            nothing_weight: self.nothing_weight,
            seeded: self.seeded.clone(),
            seeded_search: SeededSearch::new(0, self.seeded_seed_stride),
            pond: self.pond.clone(),
            pond_occupants: self.pond.as_ref().map_or(0, |pond| pond.occupants),
            drops: self.drops.clone(),
            drops_awarded: self.drops.as_ref().map_or(0, |drops| drops.awarded),
            bonus: self.bonus.clone(),
            actor: Tile::new(x, y),
            tool: self.actor.tool.clone(),
            bait: self.actor.bait.clone(),
            bait_target: self.actor.bait_target.clone().map(OutcomeId::new),
            tackle: self.actor.tackle.clone(),
            curiosity_lure: self.actor.curiosity_lure,
            time: self.start_time,
            session_seed: self.session_seed,
            day_seed: self.day_seed,
            progress: self.progress.clone(),
            splashes_allowed: self.splashes_allowed,
            special_splashes_allowed: self.special_splashes_allowed,
            special_threshold: self.special_threshold,
        })
    }

    /// Where the actor stands on `tick`; the path loops.
    pub fn actor_tile(&self, tick: usize) -> Option<Tile> {
        let path = &self.actor.path;
        path.get(tick % path.len().max(1))
            .map(|&[x, y]| Tile::new(x, y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Land,
    Water,
    Pond,
    NoFishing,
}

fn parse_map(rows: &[String]) -> Result<Vec<Vec<Cell>>> {
    ensure!(!rows.is_empty(), "map must have at least one row");
    let width = rows[0].chars().count();
    let mut cells = Vec::with_capacity(rows.len());
    for (y, row) in rows.iter().enumerate() {
        let parsed = row
            .chars()
            .enumerate()
            .map(|(x, c)| match c {
                '.' => Ok(Cell::Land),
                '~' => Ok(Cell::Water),
                'P' => Ok(Cell::Pond),
                '#' => Ok(Cell::NoFishing),
                other => Err(anyhow!("unknown map cell {other:?} at ({x}, {y})")),
            })
            .collect::<Result<Vec<_>>>()?;
        if parsed.len() != width {
            bail!("map row {y} has {} cells, expected {width}", parsed.len());
        }
        cells.push(parsed);
    }
    Ok(cells)
}

/// Demo host: one lake location, an actor walking its shore, and a resolver with a few
/// deliberate side effects (a pond that depletes, a capped drop counter, a cast counter it
/// reads).
#[derive(Debug, Clone)]
pub struct Lake {
    location: LocationId,
    width: u32,
    height: u32,
    cells: Vec<Vec<Cell>>,
    outcomes: Vec<ScenarioOutcome>,
    nothing_weight: f64,
    seeded: Vec<SeededOutcome>,
    seeded_search: SeededSearch,
    pond: Option<ScenarioPond>,
    pond_occupants: u32,
    drops: Option<ScenarioDrops>,
    drops_awarded: u32,
    bonus: Option<ScenarioBonus>,
    actor: Tile,
    tool: Option<String>,
    bait: Option<String>,
    bait_target: Option<OutcomeId>,
    tackle: Vec<String>,
    curiosity_lure: bool,
    time: TimeOfDay,
    session_seed: u64,
    day_seed: u64,
    progress: ScenarioProgress,
    splashes_allowed: bool,
    special_splashes_allowed: bool,
    special_threshold: Option<f64>,
}

impl Lake {
    pub fn location(&self) -> &LocationId {
        &self.location
    }

    pub fn time(&self) -> TimeOfDay {
        self.time
    }

    pub fn actor(&self) -> Tile {
        self.actor
    }

    pub fn casts(&self) -> u64 {
        self.progress.casts
    }

    pub fn catches(&self) -> u64 {
        self.progress.catches
    }

    pub fn pond_occupants(&self) -> u32 {
        self.pond_occupants
    }

    pub fn drops_awarded(&self) -> u32 {
        self.drops_awarded
    }

    pub fn move_actor(&mut self, tile: Tile) {
        self.actor = tile;
    }

    pub fn set_time(&mut self, time: TimeOfDay) {
        self.time = time;
    }

    /// Advance the clock; the host spends one live draw per tick on unrelated business.
    pub fn advance(&mut self, minutes: u32, live: &mut dyn RngCore) {
        self.time = self.time.add_minutes(minutes);
        let _ = live.next_u32();
    }

    /// Start a new day: clock back to `start`, a fresh day seed.
    pub fn start_day(&mut self, start: TimeOfDay, day_seed: u64) {
        self.time = start;
        self.day_seed = day_seed;
        self.progress.total_days += 1;
    }

    /// The rod's cast counter, bumped just before a real resolution.
    pub fn cast(&mut self) {
        self.progress.casts += 1;
    }

    /// Record a real catch.
    pub fn land(&mut self, _outcome: &OutcomeId) {
        self.progress.catches += 1;
    }

    fn cell(&self, tile: Tile) -> Option<Cell> {
        let x = usize::try_from(tile.x).ok()?;
        let y = usize::try_from(tile.y).ok()?;
        self.cells.get(y)?.get(x).copied()
    }

    fn is_land_or_edge(&self, tile: Tile) -> bool {
        matches!(self.cell(tile), None | Some(Cell::Land))
    }

    /// Chebyshev distance from `tile` to the nearest land (map edges count as land).
    pub fn land_distance(&self, tile: Tile) -> u32 {
        if self.is_land_or_edge(tile) {
            return 0;
        }
        for radius in 1..=MAX_LAND_SEARCH {
            let r = radius as i32;
            for dx in -r..=r {
                for dy in -r..=r {
                    if dx.abs() != r && dy.abs() != r {
                        continue;
                    }
                    if self.is_land_or_edge(Tile::new(tile.x + dx, tile.y + dy)) {
                        return radius;
                    }
                }
            }
        }
        MAX_LAND_SEARCH
    }

    fn cast_counter(lake: &mut Lake) -> &mut u64 {
        &mut lake.progress.casts
    }

    fn pond_at<'a>(lake: &'a mut Lake, site: &ProbeSite) -> Option<&'a mut u32> {
        if lake.pond.is_some() && lake.cell(site.tile) == Some(Cell::Pond) {
            Some(&mut lake.pond_occupants)
        } else {
            None
        }
    }

    fn drops_apply(lake: &Lake, _site: &ProbeSite) -> bool {
        lake.drops.is_some()
    }

    fn drop_counter(lake: &mut Lake) -> &mut u32 {
        &mut lake.drops_awarded
    }

    /// A predictor with the side effects this host's resolver has registered.
    pub fn predictor(config: Config) -> Predictor<Lake> {
        PredictorBuilder::new(config)
            .with_effect(CounterCompensation::new("casts", Lake::cast_counter))
            .with_effect(PoolOccupancy::new("pond", Lake::pond_at))
            .with_effect(CappedCounter::new("drops", Lake::drops_apply, Lake::drop_counter))
            .build()
    }

    fn roll_seeded(&self) -> Option<OutcomeId> {
        let ctx = self.preview_context();
        let words = self
            .seeded_search
            .trial_seed(self.session_seed, self.progress.catches, 0);
        self.seeded.iter().find_map(|definition| {
            let mut rng = self.seeded_rng(&words);
            rng.chance(definition.chance(&ctx))
                .then(|| definition.outcome.clone())
        })
    }

    fn roll_table(&self, rng: &mut dyn RngCore, distance: u32) -> Option<OutcomeId> {
        let eligible: Vec<&ScenarioOutcome> = self
            .outcomes
            .iter()
            .filter(|outcome| {
                outcome.min_distance <= distance
                    && outcome.after.map_or(true, |after| self.time >= after)
                    && outcome.before.map_or(true, |before| self.time < before)
            })
            .collect();
        let total: f64 = eligible.iter().map(|outcome| outcome.weight).sum::<f64>() + self.nothing_weight;
        if total <= 0.0 {
            return None;
        }
        let mut roll = rng.unit() * total;
        for outcome in eligible {
            if roll < outcome.weight {
                return Some(OutcomeId::new(outcome.id.clone()));
            }
            roll -= outcome.weight;
        }
        None
    }
}

impl EntropySource for Lake {}

impl OutcomeResolver for Lake {
    fn resolve(&mut self, rng: &mut dyn RngCore, site: &ProbeSite) -> Result<Option<OutcomeId>> {
        if site.location != self.location {
            bail!("{} is not part of {}", site.location, self.location);
        }
        let cell = self
            .cell(site.tile)
            .ok_or_else(|| anyhow!("tile {} is off the map", site.tile))?;
        ensure!(
            matches!(cell, Cell::Water | Cell::Pond),
            "tile {} cannot be fished",
            site.tile
        );

        if let Some(outcome) = self.roll_seeded() {
            return Ok(Some(outcome));
        }

        if cell == Cell::Pond {
            if let Some(pond) = &self.pond {
                let outcome = OutcomeId::new(pond.outcome.clone());
                if self.pond_occupants > 0 && rng.chance(pond.catch_chance) {
                    self.pond_occupants -= 1;
                    return Ok(Some(outcome));
                }
            }
        }

        if let Some(drops) = &self.drops {
            if rng.chance(drops.chance) && self.drops_awarded < drops.cap {
                self.drops_awarded += 1;
            }
        }

        if let Some(bonus) = &self.bonus {
            if self.progress.casts % bonus.every == 0 {
                return Ok(Some(OutcomeId::new(bonus.outcome.clone())));
            }
        }

        let distance = self.land_distance(site.tile);
        Ok(self.roll_table(rng, distance))
    }
}

impl PreviewHost for Lake {
    fn preview_context(&self) -> PreviewContext {
        PreviewContext {
            location: self.location.clone(),
            actor_tile: self.actor,
            time_of_day: self.time,
            tool: self.tool.clone(),
            bait: self.bait.clone(),
            bait_target: self.bait_target.clone(),
            tackle: self.tackle.clone(),
            curiosity_lure: self.curiosity_lure,
            occurrence_count: self.progress.catches,
            luck_level: self.progress.luck_level,
            daily_luck: self.progress.daily_luck,
        }
    }

    fn can_fish_here(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .any(|cell| matches!(cell, Cell::Water | Cell::Pond))
    }

    fn is_fishable(&self, tile: Tile) -> bool {
        matches!(self.cell(tile), Some(Cell::Water | Cell::Pond))
    }

    fn seeded_outcomes(&self, location: &LocationId) -> Vec<SeededOutcome> {
        if *location == self.location {
            self.seeded.clone()
        } else {
            Vec::new()
        }
    }

    fn session_seed(&self) -> u64 {
        self.session_seed
    }
}

impl ForecastHost for Lake {
    fn forecast_context(&self) -> ForecastContext {
        ForecastContext {
            location: self.location.clone(),
            splashes_allowed: self.splashes_allowed,
            special_allowed_here: self.special_splashes_allowed,
            special_threshold: self.special_threshold,
            total_days: self.progress.total_days,
            kinds_caught: self.progress.kinds_caught,
            festival_day: self.progress.festival_day,
            day_seed: self.day_seed,
        }
    }

    fn map_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_open_water(&self, tile: Tile) -> bool {
        matches!(self.cell(tile), Some(Cell::Water | Cell::NoFishing))
    }

    fn allows_fishing(&self, tile: Tile) -> bool {
        self.cell(tile) != Some(Cell::NoFishing)
    }

    fn distance_to_land(&self, tile: Tile) -> u32 {
        self.land_distance(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const YAML: &str = r#"
name: tiny
location: pond
session_seed: 3
day_seed: 4
map:
  - "....."
  - ".~~P."
  - ".~#~."
  - "....."
outcomes:
  - id: carp
    weight: 1.0
pond:
  outcome: goldfish
  occupants: 2
  catch_chance: 1.0
actor:
  path: [[0, 0]]
"#;

    fn lake() -> Lake {
        let scenario: Scenario = serde_yaml::from_str(YAML).unwrap();
        scenario.build_lake().unwrap()
    }

    #[test]
    fn test_predictor_registers_effects_in_order() {
        let predictor = Lake::predictor(Config::default());
        assert_eq!(predictor.effects().names(), vec!["casts", "pond", "drops"]);
    }

    #[test]
    fn test_map_cells() {
        let lake = lake();
        assert_eq!(lake.map_size(), (5, 4));
        assert!(lake.is_fishable(Tile::new(1, 1)));
        assert!(lake.is_fishable(Tile::new(3, 1)));
        assert!(!lake.is_fishable(Tile::new(2, 2)));
        assert!(!lake.is_fishable(Tile::new(0, 0)));
        assert!(lake.is_open_water(Tile::new(2, 2)));
        assert!(!lake.allows_fishing(Tile::new(2, 2)));
        assert!(!lake.is_open_water(Tile::new(3, 1)));
    }

    #[test]
    fn test_land_distance() {
        let lake = lake();
        assert_eq!(lake.land_distance(Tile::new(0, 0)), 0);
        assert_eq!(lake.land_distance(Tile::new(1, 1)), 1);
        assert_eq!(lake.land_distance(Tile::new(-3, 1)), 0);
    }

    #[test]
    fn test_pond_depletes_on_real_resolution() {
        let mut lake = lake();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let site = ProbeSite::new(lake.location().clone(), Tile::new(3, 1));
        let outcome = lake.resolve(&mut rng, &site).unwrap();
        assert_eq!(outcome, Some(OutcomeId::new("goldfish")));
        assert_eq!(lake.pond_occupants(), 1);
    }

    #[test]
    fn test_rejects_bad_maps() {
        let mut scenario: Scenario = serde_yaml::from_str(YAML).unwrap();
        scenario.map = vec!["..".into(), "...".into()];
        assert!(scenario.build_lake().is_err());
        scenario.map = vec![".x".into()];
        assert!(scenario.build_lake().is_err());
    }

    #[test]
    fn test_resolve_rejects_land() {
        let mut lake = lake();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let site = ProbeSite::new(lake.location().clone(), Tile::new(0, 0));
        assert!(lake.resolve(&mut rng, &site).is_err());
    }
}
