use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ScheduleWindow;
use crate::clock::TimeOfDay;
use crate::host::LocationId;

/// Minutes until the current splash starts, or until it ends once it has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplashCountdown {
    StartsIn(u32),
    EndsIn(u32),
}

impl SplashCountdown {
    pub fn relative_to(window: &ScheduleWindow, now: TimeOfDay) -> Self {
        if now < window.start {
            SplashCountdown::StartsIn(clamp_minutes(now.minutes_until(window.start)))
        } else {
            SplashCountdown::EndsIn(clamp_minutes(now.minutes_until(window.end)))
        }
    }
}

fn clamp_minutes(minutes: i64) -> u32 {
    u32::try_from(minutes.max(0)).unwrap_or(u32::MAX)
}

/// One session's forecast splashes, per location, for the current day.
#[derive(Debug, Clone, Default)]
pub struct SplashSchedule {
    by_location: HashMap<LocationId, Vec<ScheduleWindow>>,
    current: Option<(LocationId, ScheduleWindow)>,
}

impl SplashSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every location's schedule (e.g. at the start of a day).
    pub fn clear(&mut self) {
        self.by_location.clear();
        self.current = None;
    }

    pub fn windows(&self, location: &LocationId) -> Option<&[ScheduleWindow]> {
        self.by_location.get(location).map(Vec::as_slice)
    }

    pub fn contains(&self, location: &LocationId) -> bool {
        self.by_location.contains_key(location)
    }

    pub fn insert(&mut self, location: LocationId, windows: Vec<ScheduleWindow>) {
        if matches!(&self.current, Some((current, _)) if *current == location) {
            self.current = None;
        }
        self.by_location.insert(location, windows);
    }

    /// The location's schedule, computing it on first use.
    pub fn get_or_compute(
        &mut self,
        location: &LocationId,
        compute: impl FnOnce() -> Vec<ScheduleWindow>,
    ) -> &[ScheduleWindow] {
        self.by_location
            .entry(location.clone())
            .or_insert_with(compute)
            .as_slice()
    }

    /// Advance the current splash for `location` at `now`.
    ///
    /// The current splash is kept until it ends; then the next one whose end is still ahead
    /// takes its place.
    pub fn update_current(&mut self, location: &LocationId, now: TimeOfDay) -> Option<&ScheduleWindow> {
        let still_current = matches!(
            &self.current,
            Some((current, window)) if current == location && window.end > now
        );
        if !still_current {
            self.current = self
                .by_location
                .get(location)
                .and_then(|windows| windows.iter().find(|window| window.end > now))
                .map(|window| (location.clone(), window.clone()));
        }
        self.current.as_ref().map(|(_, window)| window)
    }

    pub fn current(&self) -> Option<&ScheduleWindow> {
        self.current.as_ref().map(|(_, window)| window)
    }
}
