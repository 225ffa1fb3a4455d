//! Turns per-tick rod flags into discrete fishing events.

use serde::{Deserialize, Serialize};

/// Rod flags as reported by the host each tick. All `false` when no rod is equipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RodSignals {
    pub timing_cast: bool,
    pub casting: bool,
    pub bobber_in_air: bool,
    pub fishing: bool,
    pub nibbling: bool,
    pub reeling: bool,
    pub pulling: bool,
    pub caught: bool,
}

impl RodSignals {
    fn any(&self) -> bool {
        self.timing_cast
            || self.casting
            || self.bobber_in_air
            || self.fishing
            || self.nibbling
            || self.reeling
            || self.pulling
            || self.caught
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FishingEvent {
    /// Line was cast; the minigame has not started.
    Cast,
    /// Fired as soon as the pull-out starts.
    Caught,
    /// The fish got away during reeling.
    Lost,
    /// Pulled in without anything on the line.
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Status {
    #[default]
    Idle,
    Casting,
    Fishing,
    Reeling,
    Cancelling,
    Catching,
}

#[derive(Debug, Clone, Default)]
pub struct FishingTracker {
    status: Status,
}

impl FishingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.status == Status::Idle
    }

    /// Advance with this tick's rod flags, returning the events that fired, in order.
    pub fn update(&mut self, rod: RodSignals) -> Vec<FishingEvent> {
        let mut events = Vec::new();

        if self.status == Status::Idle && (rod.timing_cast || rod.casting || rod.bobber_in_air) {
            events.push(FishingEvent::Cast);
            self.status = Status::Casting;
        }
        if self.status == Status::Casting && rod.fishing {
            self.status = Status::Fishing;
        }
        if self.status == Status::Fishing && rod.reeling {
            self.status = Status::Reeling;
        }

        // Instant catches skip straight from casting to a pull, so accept it from any
        // unfinished state.
        let finished = matches!(self.status, Status::Cancelling | Status::Catching);
        if !finished {
            if rod.caught || (rod.pulling && rod.nibbling) {
                events.push(FishingEvent::Caught);
                self.status = Status::Catching;
            } else if rod.pulling {
                events.push(FishingEvent::Cancelled);
                self.status = Status::Cancelling;
            }
        }

        if self.status != Status::Idle && !rod.any() {
            if self.status == Status::Reeling {
                events.push(FishingEvent::Lost);
            } else if !finished {
                events.push(FishingEvent::Cancelled);
            }
            self.status = Status::Idle;
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(f: impl FnOnce(&mut RodSignals)) -> RodSignals {
        let mut rod = RodSignals::default();
        f(&mut rod);
        rod
    }

    #[test]
    fn test_full_catch() {
        let mut tracker = FishingTracker::new();
        assert_eq!(tracker.update(signals(|r| r.casting = true)), vec![FishingEvent::Cast]);
        assert!(tracker.update(signals(|r| r.fishing = true)).is_empty());
        assert!(tracker.update(signals(|r| r.reeling = true)).is_empty());
        assert_eq!(
            tracker.update(signals(|r| {
                r.pulling = true;
                r.caught = true;
            })),
            vec![FishingEvent::Caught]
        );
        assert!(tracker.update(RodSignals::default()).is_empty());
        assert!(tracker.is_idle());
    }

    #[test]
    fn test_fish_escapes_while_reeling() {
        let mut tracker = FishingTracker::new();
        tracker.update(signals(|r| r.casting = true));
        tracker.update(signals(|r| r.fishing = true));
        tracker.update(signals(|r| r.reeling = true));
        assert_eq!(tracker.update(RodSignals::default()), vec![FishingEvent::Lost]);
    }

    #[test]
    fn test_pull_without_nibble_cancels() {
        let mut tracker = FishingTracker::new();
        tracker.update(signals(|r| r.casting = true));
        tracker.update(signals(|r| r.fishing = true));
        assert_eq!(
            tracker.update(signals(|r| r.pulling = true)),
            vec![FishingEvent::Cancelled]
        );
        assert!(tracker.update(RodSignals::default()).is_empty());
    }

    #[test]
    fn test_abandoned_cast_cancels() {
        let mut tracker = FishingTracker::new();
        tracker.update(signals(|r| r.timing_cast = true));
        assert_eq!(tracker.update(RodSignals::default()), vec![FishingEvent::Cancelled]);
    }

    #[test]
    fn test_instant_catch_from_casting() {
        let mut tracker = FishingTracker::new();
        let events = tracker.update(signals(|r| {
            r.casting = true;
            r.caught = true;
        }));
        assert_eq!(events, vec![FishingEvent::Cast, FishingEvent::Caught]);
    }
}
