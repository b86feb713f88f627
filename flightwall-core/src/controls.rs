//! User-facing controls: full screen, surface switching, settings panel.
//!
//! [`Controls`] holds the state transitions and expresses the settings
//! panel's idle timeout as [`IdleTimer`] commands. [`TimedControls`] runs
//! those commands on a [`VirtualScheduler`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scheduler::VirtualScheduler;

/// Which presentation surface is in front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    Map,
    Ticker,
    Detail,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 3] = [SurfaceKind::Map, SurfaceKind::Ticker, SurfaceKind::Detail];

    /// Cycle order: map, ticker, detail, back to map.
    pub fn next(self) -> SurfaceKind {
        match self {
            SurfaceKind::Map => SurfaceKind::Ticker,
            SurfaceKind::Ticker => SurfaceKind::Detail,
            SurfaceKind::Detail => SurfaceKind::Map,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SurfaceKind::Map => "map",
            SurfaceKind::Ticker => "ticker",
            SurfaceKind::Detail => "detail",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SurfaceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SurfaceKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown surface: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Settings panel
// ---------------------------------------------------------------------------

/// What the caller should do with the panel's idle timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleTimer {
    Restart(Duration),
    Cancel,
    Keep,
}

#[derive(Debug, Clone)]
pub struct SettingsPanel {
    open: bool,
    pointer_inside: bool,
    idle_timeout: Duration,
}

impl SettingsPanel {
    pub fn new(idle_timeout: Duration) -> Self {
        SettingsPanel {
            open: false,
            pointer_inside: false,
            idle_timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn pointer_inside(&self) -> bool {
        self.pointer_inside
    }

    fn arm(&self) -> IdleTimer {
        if self.open && !self.pointer_inside {
            IdleTimer::Restart(self.idle_timeout)
        } else {
            IdleTimer::Cancel
        }
    }

    pub fn open(&mut self) -> IdleTimer {
        self.open = true;
        self.arm()
    }

    pub fn close(&mut self) -> IdleTimer {
        self.open = false;
        IdleTimer::Cancel
    }

    pub fn toggle(&mut self) -> IdleTimer {
        if self.open {
            self.close()
        } else {
            self.open()
        }
    }

    pub fn pointer_enter(&mut self) -> IdleTimer {
        self.pointer_inside = true;
        if self.open {
            IdleTimer::Cancel
        } else {
            IdleTimer::Keep
        }
    }

    pub fn pointer_leave(&mut self) -> IdleTimer {
        self.pointer_inside = false;
        if self.open {
            self.arm()
        } else {
            IdleTimer::Keep
        }
    }

    /// Any interaction with the panel restarts the idle period.
    pub fn activity(&mut self) -> IdleTimer {
        if self.open {
            self.arm()
        } else {
            IdleTimer::Keep
        }
    }

    /// The idle period ran out. Returns whether the panel closed.
    pub fn idle_elapsed(&mut self) -> bool {
        if self.open && !self.pointer_inside {
            self.open = false;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlInput {
    ToggleFullscreen,
    NextSurface,
    ShowSurface(SurfaceKind),
    ToggleSettings,
    PointerEnterSettings,
    PointerLeaveSettings,
    SettingsActivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlOutcome {
    /// `(from, to)` when the front surface changed.
    pub switched: Option<(SurfaceKind, SurfaceKind)>,
    pub idle: IdleTimer,
}

#[derive(Debug, Clone)]
pub struct Controls {
    surface: SurfaceKind,
    fullscreen: bool,
    settings: SettingsPanel,
}

impl Controls {
    pub fn new(initial: SurfaceKind, idle_timeout: Duration) -> Self {
        Controls {
            surface: initial,
            fullscreen: false,
            settings: SettingsPanel::new(idle_timeout),
        }
    }

    pub fn surface(&self) -> SurfaceKind {
        self.surface
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn settings(&self) -> &SettingsPanel {
        &self.settings
    }

    pub fn handle(&mut self, input: ControlInput) -> ControlOutcome {
        let mut outcome = ControlOutcome {
            switched: None,
            idle: IdleTimer::Keep,
        };
        match input {
            ControlInput::ToggleFullscreen => self.fullscreen = !self.fullscreen,
            ControlInput::NextSurface => outcome.switched = self.show(self.surface.next()),
            ControlInput::ShowSurface(kind) => outcome.switched = self.show(kind),
            ControlInput::ToggleSettings => outcome.idle = self.settings.toggle(),
            ControlInput::PointerEnterSettings => outcome.idle = self.settings.pointer_enter(),
            ControlInput::PointerLeaveSettings => outcome.idle = self.settings.pointer_leave(),
            ControlInput::SettingsActivity => outcome.idle = self.settings.activity(),
        }
        outcome
    }

    fn show(&mut self, kind: SurfaceKind) -> Option<(SurfaceKind, SurfaceKind)> {
        if kind == self.surface {
            return None;
        }
        let from = std::mem::replace(&mut self.surface, kind);
        tracing::info!(%from, to = %kind, "surface switched");
        Some((from, kind))
    }

    pub fn on_idle_timer(&mut self) -> bool {
        self.settings.idle_elapsed()
    }
}

// ---------------------------------------------------------------------------
// Timed controls
// ---------------------------------------------------------------------------

/// Logical timers owned by the controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTimer {
    SettingsIdle,
}

/// [`Controls`] with the idle close running on a virtual clock.
///
/// Call [`advance_to`](Self::advance_to) when the clock moves and before
/// every [`handle`](Self::handle), so a lapsed timeout closes the panel
/// before the input is applied.
#[derive(Debug, Clone)]
pub struct TimedControls {
    controls: Controls,
    timers: VirtualScheduler<ControlTimer>,
}

impl TimedControls {
    pub fn new(initial: SurfaceKind, idle_timeout: Duration) -> Self {
        TimedControls {
            controls: Controls::new(initial, idle_timeout),
            timers: VirtualScheduler::new(),
        }
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// When the next timer is due, on the virtual clock.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Move the clock to `now`. Returns whether the settings panel closed.
    pub fn advance_to(&mut self, now: Duration) -> bool {
        let mut closed = false;
        for firing in self.timers.advance_to(now) {
            match firing.key {
                ControlTimer::SettingsIdle => {
                    self.timers.stop(&ControlTimer::SettingsIdle);
                    closed |= self.controls.on_idle_timer();
                }
            }
        }
        closed
    }

    pub fn handle(&mut self, input: ControlInput, now: Duration) -> ControlOutcome {
        self.advance_to(now);
        let outcome = self.controls.handle(input);
        match outcome.idle {
            IdleTimer::Restart(after) => self.timers.start(ControlTimer::SettingsIdle, after),
            IdleTimer::Cancel => {
                self.timers.stop(&ControlTimer::SettingsIdle);
            }
            IdleTimer::Keep => {}
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(5);

    #[test]
    fn test_surface_cycle() {
        let mut c = Controls::new(SurfaceKind::Map, IDLE);
        let out = c.handle(ControlInput::NextSurface);
        assert_eq!(out.switched, Some((SurfaceKind::Map, SurfaceKind::Ticker)));
        c.handle(ControlInput::NextSurface);
        c.handle(ControlInput::NextSurface);
        assert_eq!(c.surface(), SurfaceKind::Map);
        assert_eq!(c.handle(ControlInput::ShowSurface(SurfaceKind::Map)).switched, None);
    }

    #[test]
    fn test_fullscreen_toggle() {
        let mut c = Controls::new(SurfaceKind::Ticker, IDLE);
        c.handle(ControlInput::ToggleFullscreen);
        assert!(c.is_fullscreen());
        c.handle(ControlInput::ToggleFullscreen);
        assert!(!c.is_fullscreen());
    }

    #[test]
    fn test_settings_idle_close() {
        let mut p = SettingsPanel::new(IDLE);
        assert_eq!(p.open(), IdleTimer::Restart(IDLE));
        assert!(p.idle_elapsed());
        assert!(!p.is_open());
    }

    #[test]
    fn test_settings_stay_open_with_pointer_inside() {
        let mut p = SettingsPanel::new(IDLE);
        p.open();
        assert_eq!(p.pointer_enter(), IdleTimer::Cancel);
        assert!(!p.idle_elapsed());
        assert!(p.is_open());
        assert_eq!(p.pointer_leave(), IdleTimer::Restart(IDLE));
        assert!(p.idle_elapsed());
    }

    #[test]
    fn test_activity_restarts_only_when_open() {
        let mut p = SettingsPanel::new(IDLE);
        assert_eq!(p.activity(), IdleTimer::Keep);
        p.toggle();
        assert_eq!(p.activity(), IdleTimer::Restart(IDLE));
        assert_eq!(p.toggle(), IdleTimer::Cancel);
        assert!(!p.idle_elapsed());
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_timed_idle_close() {
        let mut c = TimedControls::new(SurfaceKind::Map, IDLE);
        assert_eq!(c.next_deadline(), None);

        c.handle(ControlInput::ToggleSettings, secs(0));
        assert_eq!(c.next_deadline(), Some(secs(5)));
        assert!(!c.advance_to(secs(4)));

        // activity at 4 s pushes the close to 9 s
        c.handle(ControlInput::SettingsActivity, secs(4));
        assert!(!c.advance_to(secs(8)));
        assert!(c.controls().settings().is_open());
        assert!(c.advance_to(secs(9)));
        assert!(!c.controls().settings().is_open());
        // one shot
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn test_timed_pointer_inside_cancels() {
        let mut c = TimedControls::new(SurfaceKind::Map, IDLE);
        c.handle(ControlInput::ToggleSettings, secs(0));
        c.handle(ControlInput::PointerEnterSettings, secs(1));
        assert_eq!(c.next_deadline(), None);
        assert!(!c.advance_to(secs(60)));
        assert!(c.controls().settings().is_open());

        c.handle(ControlInput::PointerLeaveSettings, secs(60));
        assert_eq!(c.next_deadline(), Some(secs(65)));
        assert!(c.advance_to(secs(65)));
    }

    #[test]
    fn test_timed_lapse_applies_before_input() {
        let mut c = TimedControls::new(SurfaceKind::Map, IDLE);
        c.handle(ControlInput::ToggleSettings, secs(0));
        // the panel already closed at 5 s, so this toggle opens it again
        c.handle(ControlInput::ToggleSettings, secs(7));
        assert!(c.controls().settings().is_open());
        assert_eq!(c.next_deadline(), Some(secs(12)));
    }

    #[test]
    fn test_surface_kind_parse() {
        assert_eq!("Ticker".parse::<SurfaceKind>(), Ok(SurfaceKind::Ticker));
        assert!("radar".parse::<SurfaceKind>().is_err());
    }
}
