//! Passive single-item display. The server decides what is on display; this
//! surface mirrors it and animates a progress indicator between switches.

use std::time::Duration;

use serde::Serialize;

use crate::controls::SurfaceKind;
use crate::lookup::AirlineDirectory;
use crate::marker::{build_label, EntityLabel};
use crate::model::TickerFlight;
use crate::prefs::Preferences;
use crate::rotation::{RotationChange, RotationController};
use crate::types::{ConnectionStatus, FlightwallError};

use super::{note_failure, note_success, Input, Request, Response, Surface, TimerKey};

/// Everything a presenter needs to draw the ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerView {
    pub label: Option<EntityLabel>,
    pub eta: Option<String>,
    /// `"2 / 5"`, or `"0 / 0"` when nothing is on display.
    pub position: String,
    pub progress: f64,
    pub status: String,
}

/// `"ETA 42m"`, `"ETA 1h 05m"`, or `None` when unknown or already arrived.
pub fn eta_text(minutes: Option<i64>) -> Option<String> {
    match minutes? {
        m if m <= 0 => None,
        m if m < 60 => Some(format!("ETA {m}m")),
        m => Some(format!("ETA {}h {:02}m", m / 60, m % 60)),
    }
}

/// Text progress bar, `width` cells wide.
pub fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[derive(Debug)]
pub struct TickerSurface {
    rotation: RotationController,
    current: Option<TickerFlight>,
    label: Option<EntityLabel>,
    prefs: Preferences,
    airlines: AirlineDirectory,
    poll: Duration,
    progress_tick: Duration,
    max_distance_km: f64,
    visible: bool,
    status: ConnectionStatus,
}

impl TickerSurface {
    pub fn new(
        prefs: Preferences,
        poll: Duration,
        rotation_period: Duration,
        progress_tick: Duration,
        max_distance_km: f64,
    ) -> Self {
        TickerSurface {
            rotation: RotationController::new(rotation_period),
            current: None,
            label: None,
            prefs,
            airlines: AirlineDirectory::default(),
            poll,
            progress_tick,
            max_distance_km,
            visible: false,
            status: ConnectionStatus::Connecting,
        }
    }

    pub fn rotation(&self) -> &RotationController {
        &self.rotation
    }

    pub fn current(&self) -> Option<&TickerFlight> {
        self.current.as_ref()
    }

    pub fn view(&self) -> TickerView {
        let (index, total) = self.rotation.position();
        TickerView {
            label: self.label.clone(),
            eta: self.current.as_ref().and_then(|f| eta_text(f.eta_minutes)),
            position: format!("{index} / {total}"),
            progress: self.rotation.progress(),
            status: self.status.label(),
        }
    }

    fn relabel(&mut self) {
        self.label = self
            .current
            .as_ref()
            .map(|f| build_label(&f.to_snapshot(), &self.prefs, &self.airlines));
    }

    fn rotation_request(&self) -> Request {
        Request::Rotation {
            max_distance_km: self.max_distance_km,
            rotation_secs: self.rotation.period().as_secs().max(1),
        }
    }
}

impl Surface for TickerSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Ticker
    }

    fn timers(&self) -> Vec<(TimerKey, Duration)> {
        vec![
            (TimerKey::Poll, self.poll),
            (TimerKey::Progress, self.progress_tick),
        ]
    }

    fn on_timer(&mut self, key: TimerKey, elapsed: Duration) -> Vec<Request> {
        match key {
            TimerKey::Poll => vec![self.rotation_request()],
            TimerKey::Progress => {
                self.rotation.tick(elapsed);
                Vec::new()
            }
        }
    }

    fn on_input(&mut self, _input: Input) -> Vec<Request> {
        Vec::new()
    }

    fn on_response(&mut self, response: Response, _now: f64) -> Vec<Request> {
        note_success(&mut self.status, &response);
        if let Response::Rotation(resp) = response {
            match self.rotation.on_response(&resp) {
                RotationChange::Switched(id) => tracing::debug!(icao = %id, "rotation switched"),
                RotationChange::Emptied => tracing::debug!("rotation empty"),
                RotationChange::Unchanged => {}
            }
            self.current = resp.flight;
            self.relabel();
        }
        Vec::new()
    }

    fn on_request_failed(&mut self, request: &Request, error: &FlightwallError) {
        note_failure(&mut self.status, SurfaceKind::Ticker, request, error);
    }

    fn on_preferences(&mut self, prefs: &Preferences) {
        if self.prefs != *prefs {
            self.prefs = *prefs;
            self.relabel();
        }
    }

    fn set_visible(&mut self, visible: bool) -> Vec<Request> {
        let resumed = visible && !self.visible;
        self.visible = visible;
        self.rotation.set_visible(visible);
        if resumed {
            vec![self.rotation_request()]
        } else {
            Vec::new()
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn status(&self) -> &ConnectionStatus {
        &self.status
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RotationResponse;
    use crate::prefs::{PrefKey, SpeedUnit};
    use crate::rotation::RotationState;

    fn ticker_flight(icao: &str) -> TickerFlight {
        serde_json::from_value(serde_json::json!({
            "icao24": icao,
            "callsign": "DAL1234",
            "type": "A321",
            "speed_kts": 420.0,
            "eta_minutes": 75,
        }))
        .unwrap()
    }

    fn rotation(icao: Option<&str>, index: usize, total: usize) -> Response {
        Response::Rotation(RotationResponse {
            flight: icao.map(ticker_flight),
            current_index: index,
            total_count: total,
            next_rotation_in: None,
            query_time_ms: None,
        })
    }

    fn surface() -> TickerSurface {
        let mut s = TickerSurface::new(
            Preferences::default(),
            Duration::from_secs(3),
            Duration::from_secs(8),
            Duration::from_millis(100),
            150.0,
        );
        s.set_visible(true);
        s
    }

    #[test]
    fn test_eta_text() {
        assert_eq!(eta_text(Some(42)), Some("ETA 42m".into()));
        assert_eq!(eta_text(Some(65)), Some("ETA 1h 05m".into()));
        assert_eq!(eta_text(Some(0)), None);
        assert_eq!(eta_text(None), None);
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "░░░░");
        assert_eq!(progress_bar(50.0, 4), "██░░");
        assert_eq!(progress_bar(250.0, 4), "████");
    }

    #[test]
    fn test_poll_requests_rotation() {
        let mut s = surface();
        assert_eq!(
            s.on_timer(TimerKey::Poll, Duration::from_secs(3)),
            vec![Request::Rotation {
                max_distance_km: 150.0,
                rotation_secs: 8,
            }]
        );
    }

    #[test]
    fn test_rotation_flow() {
        let mut s = surface();
        s.on_response(rotation(Some("aaaaaa"), 0, 3), 0.0);
        for _ in 0..20 {
            s.on_timer(TimerKey::Progress, Duration::from_millis(100));
        }
        assert!((s.view().progress - 25.0).abs() < 1e-6);

        // same entity: progress untouched
        s.on_response(rotation(Some("aaaaaa"), 0, 3), 0.0);
        assert!((s.view().progress - 25.0).abs() < 1e-6);

        // new entity: reset
        s.on_response(rotation(Some("bbbbbb"), 1, 3), 0.0);
        let view = s.view();
        assert_eq!(view.progress, 0.0);
        assert_eq!(view.position, "2 / 3");
        assert_eq!(view.eta.as_deref(), Some("ETA 1h 15m"));
        assert_eq!(view.label.unwrap().callsign, "DAL1234");
    }

    #[test]
    fn test_empty_response() {
        let mut s = surface();
        s.on_response(rotation(Some("aaaaaa"), 0, 1), 0.0);
        s.on_response(rotation(None, 0, 0), 0.0);
        assert_eq!(s.rotation().state(), RotationState::Empty);
        let view = s.view();
        assert_eq!(view.position, "0 / 0");
        assert!(view.label.is_none());
    }

    #[test]
    fn test_hidden_freezes_progress() {
        let mut s = surface();
        s.on_response(rotation(Some("aaaaaa"), 0, 1), 0.0);
        s.on_timer(TimerKey::Progress, Duration::from_millis(800));
        s.set_visible(false);
        s.on_timer(TimerKey::Progress, Duration::from_millis(800));
        assert!((s.view().progress - 10.0).abs() < 1e-6);
        let resumed = s.set_visible(true);
        assert_eq!(resumed.len(), 1);
    }

    #[test]
    fn test_preferences_relabel() {
        let mut s = surface();
        s.on_response(rotation(Some("aaaaaa"), 0, 1), 0.0);
        assert_eq!(s.view().label.unwrap().speed, "420 kts");
        let mut prefs = Preferences::default();
        prefs.apply(PrefKey::SpeedUnit, "kmh").unwrap();
        assert_eq!(prefs.speed_unit, SpeedUnit::Kmh);
        s.on_preferences(&prefs);
        assert_eq!(s.view().label.unwrap().speed, "778 km/h");
    }

    #[test]
    fn test_failure_updates_status_only() {
        let mut s = surface();
        s.on_response(rotation(Some("aaaaaa"), 0, 1), 0.0);
        s.on_request_failed(
            &Request::Rotation {
                max_distance_km: 150.0,
                rotation_secs: 8,
            },
            &FlightwallError::Status(500),
        );
        assert!(!s.status().is_connected());
        assert!(s.current().is_some());
    }
}
