use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::host::{EntropySource, OutcomeId, PreviewContext};
use crate::rng::RngExt;

/// An outcome gated by a secondary check seeded from the occurrence count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeededOutcome {
    pub outcome: OutcomeId,
    pub base_chance: f64,
    #[serde(default)]
    pub curiosity_lure_bonus: f64,
    /// Added once per luck level.
    #[serde(default)]
    pub luck_level_bonus: f64,
    #[serde(default)]
    pub apply_daily_luck: bool,
    #[serde(default = "default_targeted_bait_multiplier")]
    pub targeted_bait_multiplier: f64,
}

fn default_targeted_bait_multiplier() -> f64 {
    1.0
}

impl SeededOutcome {
    pub fn new(outcome: OutcomeId, base_chance: f64) -> Self {
        Self {
            outcome,
            base_chance,
            curiosity_lure_bonus: 0.0,
            luck_level_bonus: 0.0,
            apply_daily_luck: false,
            targeted_bait_multiplier: default_targeted_bait_multiplier(),
        }
    }

    /// Success probability of one qualifying draw, in `[0, 1]`.
    pub fn chance(&self, ctx: &PreviewContext) -> f64 {
        let mut chance = self.base_chance;
        if ctx.curiosity_lure {
            chance += self.curiosity_lure_bonus;
        }
        chance += f64::from(ctx.luck_level) * self.luck_level_bonus;
        if self.apply_daily_luck {
            chance += ctx.daily_luck;
        }
        if ctx.bait_target.as_ref() == Some(&self.outcome) {
            chance *= self.targeted_bait_multiplier;
        }
        chance.clamp(0.0, 1.0)
    }
}

/// How many more ordinary occurrences are needed before a seeded outcome can happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrencesRequired {
    Known(u32),
    /// Not reachable within the searched range; not necessarily never.
    Unknown,
}

impl OccurrencesRequired {
    pub fn known(self) -> Option<u32> {
        match self {
            OccurrencesRequired::Known(count) => Some(count),
            OccurrencesRequired::Unknown => None,
        }
    }

    /// Host-facing encoding, with `-1` for unknown.
    pub fn as_i32(self) -> i32 {
        match self {
            OccurrencesRequired::Known(count) => i32::try_from(count).unwrap_or(i32::MAX),
            OccurrencesRequired::Unknown => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeededForecast {
    /// Outcomes reachable after exactly `required` more occurrences.
    pub outcomes: Vec<OutcomeId>,
    pub required: OccurrencesRequired,
}

impl Default for SeededForecast {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
            required: OccurrencesRequired::Unknown,
        }
    }
}

impl SeededForecast {
    /// A seeded outcome can happen on the very next occurrence.
    pub fn is_imminent(&self) -> bool {
        self.required == OccurrencesRequired::Known(0)
    }
}

/// Bounded search for the earliest reachable seeded outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededSearch {
    pub attempts: u32,
    pub seed_stride: u64,
}

impl SeededSearch {
    pub fn new(attempts: u32, seed_stride: u64) -> Self {
        Self {
            attempts,
            seed_stride,
        }
    }

    /// Seed words for the trial `offset` occurrences after `occurrence_count`.
    pub fn trial_seed(&self, session_seed: u64, occurrence_count: u64, offset: u32) -> [u64; 2] {
        [
            session_seed,
            occurrence_count
                .wrapping_add(u64::from(offset))
                .wrapping_mul(self.seed_stride),
        ]
    }

    /// Run trials for each definition, capping later searches at the best count found so far.
    pub fn forecast<E: EntropySource + ?Sized>(
        &self,
        definitions: &[SeededOutcome],
        ctx: &PreviewContext,
        session_seed: u64,
        entropy: &E,
    ) -> SeededForecast {
        let mut best: Option<u32> = None;
        let mut outcomes = Vec::new();
        for definition in definitions {
            let chance = definition.chance(ctx);
            let cap = best.unwrap_or(self.attempts);
            for offset in 0..=cap {
                let words = self.trial_seed(session_seed, ctx.occurrence_count, offset);
                let mut rng = entropy.seeded_rng(&words);
                if !rng.chance(chance) {
                    continue;
                }
                if best != Some(offset) {
                    outcomes.clear();
                    best = Some(offset);
                }
                outcomes.push(definition.outcome.clone());
                break;
            }
        }
        let required = best.map_or(OccurrencesRequired::Unknown, OccurrencesRequired::Known);
        debug!(?required, found = outcomes.len(), "seeded forecast refreshed");
        SeededForecast { outcomes, required }
    }
}
