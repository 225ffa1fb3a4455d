use crate::host::{LocationId, OutcomeId, PreviewContext, Tile};

/// Everything whose change can invalidate a cached prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionFingerprint {
    pub location: LocationId,
    pub actor_tile: Tile,
    pub tool: Option<String>,
    pub bait: Option<String>,
    pub bait_target: Option<OutcomeId>,
    pub tackle: Vec<String>,
    pub curiosity_lure: bool,
    pub occurrence_count: u64,
    pub luck_level: i32,
    pub daily_luck: f64,
}

impl PredictionFingerprint {
    pub fn from_context(ctx: &PreviewContext) -> Self {
        Self {
            location: ctx.location.clone(),
            actor_tile: ctx.actor_tile,
            tool: ctx.tool.clone(),
            bait: ctx.bait.clone(),
            bait_target: ctx.bait_target.clone(),
            tackle: ctx.tackle.clone(),
            curiosity_lure: ctx.curiosity_lure,
            occurrence_count: ctx.occurrence_count,
            luck_level: ctx.luck_level,
            daily_luck: ctx.daily_luck,
        }
    }

    fn same_equipment(&self, other: &Self) -> bool {
        self.location == other.location
            && self.tool == other.tool
            && self.bait == other.bait
            && self.bait_target == other.bait_target
            && self.tackle == other.tackle
            && self.curiosity_lure == other.curiosity_lure
            && self.luck_level == other.luck_level
            && self.daily_luck == other.daily_luck
    }

    /// Equal for the purposes of ordinary predictions: the occurrence count is ignored, the
    /// actor's tile is not.
    pub fn same_for_regular(&self, other: Option<&Self>) -> bool {
        other.is_some_and(|other| self.same_equipment(other) && self.actor_tile == other.actor_tile)
    }

    /// Equal for the purposes of the seeded forecast: the actor's tile is ignored, the
    /// occurrence count is not.
    pub fn same_for_seeded(&self, other: Option<&Self>) -> bool {
        other.is_some_and(|other| {
            self.same_equipment(other) && self.occurrence_count == other.occurrence_count
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TimeOfDay;

    fn context() -> PreviewContext {
        PreviewContext {
            location: LocationId::new("lake"),
            actor_tile: Tile::new(4, 4),
            time_of_day: TimeOfDay::new(600),
            tool: Some("bamboo".into()),
            bait: None,
            bait_target: None,
            tackle: Vec::new(),
            curiosity_lure: false,
            occurrence_count: 3,
            luck_level: 0,
            daily_luck: 0.0,
        }
    }

    #[test]
    fn test_moving_only_invalidates_regular() {
        let before = PredictionFingerprint::from_context(&context());
        let mut moved = before.clone();
        moved.actor_tile = Tile::new(5, 4);
        assert!(!moved.same_for_regular(Some(&before)));
        assert!(moved.same_for_seeded(Some(&before)));
    }

    #[test]
    fn test_catching_only_invalidates_seeded() {
        let before = PredictionFingerprint::from_context(&context());
        let mut after = before.clone();
        after.occurrence_count += 1;
        assert!(after.same_for_regular(Some(&before)));
        assert!(!after.same_for_seeded(Some(&before)));
    }

    #[test]
    fn test_missing_previous_never_matches() {
        let current = PredictionFingerprint::from_context(&context());
        assert!(!current.same_for_regular(None));
        assert!(!current.same_for_seeded(None));
    }
}
