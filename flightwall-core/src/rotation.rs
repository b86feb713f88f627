//! Rotation state for the single-item display.
//!
//! Which entity is on display is decided upstream; polls only tell us. The
//! progress value is cosmetic: it climbs from 0 toward 100 over one rotation
//! period and wraps, and is reset whenever a poll reports a different entity.

use std::time::Duration;

use serde::Serialize;

use crate::model::RotationResponse;
use crate::types::Icao24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RotationState {
    Empty,
    Displaying(Icao24),
}

/// What a poll did to the rotation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationChange {
    /// Same entity as before (or still empty).
    Unchanged,
    /// A different entity is now on display.
    Switched(Icao24),
    /// Nothing is on display any more.
    Emptied,
}

#[derive(Debug, Clone)]
pub struct RotationController {
    state: RotationState,
    progress: f64,
    period: Duration,
    visible: bool,
    /// One-based position and candidate count; `(0, 0)` when empty.
    position: (usize, usize),
}

impl RotationController {
    pub fn new(period: Duration) -> Self {
        RotationController {
            state: RotationState::Empty,
            progress: 0.0,
            period,
            visible: true,
            position: (0, 0),
        }
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    pub fn current(&self) -> Option<Icao24> {
        match self.state {
            RotationState::Displaying(id) => Some(id),
            RotationState::Empty => None,
        }
    }

    /// Progress in `[0, 100)`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn position(&self) -> (usize, usize) {
        self.position
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Apply a poll result: what is on display, its zero-based index, and
    /// how many candidates there are.
    pub fn on_poll(&mut self, current: Option<Icao24>, index: usize, total: usize) -> RotationChange {
        match current {
            None => {
                self.position = (0, 0);
                self.progress = 0.0;
                if self.state == RotationState::Empty {
                    RotationChange::Unchanged
                } else {
                    self.state = RotationState::Empty;
                    RotationChange::Emptied
                }
            }
            Some(id) => {
                self.position = (index + 1, total.max(index + 1));
                if self.state == RotationState::Displaying(id) {
                    RotationChange::Unchanged
                } else {
                    self.state = RotationState::Displaying(id);
                    self.progress = 0.0;
                    RotationChange::Switched(id)
                }
            }
        }
    }

    pub fn on_response(&mut self, resp: &RotationResponse) -> RotationChange {
        self.on_poll(
            resp.flight.as_ref().map(|f| f.icao24),
            resp.current_index,
            resp.total_count,
        )
    }

    /// Advance progress by `elapsed`. Does nothing while hidden or empty.
    pub fn tick(&mut self, elapsed: Duration) -> f64 {
        if !self.visible || self.state == RotationState::Empty || self.period.is_zero() {
            return self.progress;
        }
        let step = elapsed.as_secs_f64() / self.period.as_secs_f64() * 100.0;
        self.progress = (self.progress + step) % 100.0;
        self.progress
    }

    /// Hiding freezes progress; showing resumes from the frozen value.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}
