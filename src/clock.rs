//! Host time of day, HHMM-encoded.
//!
//! `630` is 6:30, `2600` is 2:00 the next morning. Values are compared as integers, which
//! orders them correctly within a day.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const fn new(hhmm: u32) -> Self {
        Self(hhmm)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn hours(self) -> u32 {
        self.0 / 100
    }

    pub fn minutes(self) -> u32 {
        self.0 % 100
    }

    /// Minutes since midnight of the current day.
    pub fn total_minutes(self) -> i64 {
        i64::from(self.hours()) * 60 + i64::from(self.minutes())
    }

    /// Minutes from `self` until `later`; negative when `later` is earlier (day rollover).
    pub fn minutes_until(self, later: TimeOfDay) -> i64 {
        later.total_minutes() - self.total_minutes()
    }

    pub fn add_minutes(self, minutes: u32) -> Self {
        let total = self.total_minutes() as u32 + minutes;
        Self((total / 60) * 100 + total % 60)
    }
}

impl From<u32> for TimeOfDay {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours(), self.minutes())
    }
}

/// Minutes between two times; negative when `to` precedes `from`.
pub fn minutes_between(from: TimeOfDay, to: TimeOfDay) -> i64 {
    from.minutes_until(to)
}

/// The host's day: the steps from `start` (inclusive) to `end` (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayClock {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub step_minutes: u32,
}

impl DayClock {
    pub fn steps(&self) -> DaySteps {
        DaySteps {
            next: self.start,
            end: self.end,
            step: self.step_minutes.max(1),
        }
    }
}

impl Default for DayClock {
    fn default() -> Self {
        Self {
            start: TimeOfDay::new(600),
            end: TimeOfDay::new(2600),
            step_minutes: 10,
        }
    }
}

pub struct DaySteps {
    next: TimeOfDay,
    end: TimeOfDay,
    step: u32,
}

impl Iterator for DaySteps {
    type Item = TimeOfDay;

    fn next(&mut self) -> Option<TimeOfDay> {
        if self.next >= self.end {
            return None;
        }
        let current = self.next;
        self.next = current.add_minutes(self.step);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_between() {
        assert_eq!(minutes_between(TimeOfDay::new(600), TimeOfDay::new(630)), 30);
        assert_eq!(minutes_between(TimeOfDay::new(650), TimeOfDay::new(710)), 20);
        assert_eq!(minutes_between(TimeOfDay::new(2500), TimeOfDay::new(600)), -1140);
    }

    #[test]
    fn test_add_minutes_rolls_hours() {
        assert_eq!(TimeOfDay::new(650).add_minutes(10), TimeOfDay::new(700));
        assert_eq!(TimeOfDay::new(2350).add_minutes(20), TimeOfDay::new(2410));
    }

    #[test]
    fn test_day_steps() {
        let clock = DayClock::default();
        let steps: Vec<_> = clock.steps().collect();
        assert_eq!(steps.len(), 120);
        assert_eq!(steps.first(), Some(&TimeOfDay::new(600)));
        assert_eq!(steps[6], TimeOfDay::new(700));
        assert_eq!(steps.last(), Some(&TimeOfDay::new(2550)));
    }

    #[test]
    fn test_display() {
        assert_eq!(TimeOfDay::new(905).to_string(), "09:05");
    }
}
