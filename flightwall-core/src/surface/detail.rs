//! Deep-dive view of one fixed entity: detail record, analytics annotations,
//! and a chart per telemetry channel.

use std::time::Duration;

use crate::chart::{Canvas, ChartFrame};
use crate::controls::SurfaceKind;
use crate::history::{Applied, Channel, RequestTag, TrackedHistory};
use crate::lookup::AirlineDirectory;
use crate::marker::{build_label, EntityLabel};
use crate::model::DetailResponse;
use crate::prefs::Preferences;
use crate::types::{ConnectionStatus, FlightwallError, Icao24};

use super::{note_failure, note_success, render_history, Input, Request, Response, Surface, TimerKey};

#[derive(Debug)]
pub struct DetailSurface {
    icao24: Icao24,
    detail: Option<DetailResponse>,
    label: Option<EntityLabel>,
    history: TrackedHistory,
    prefs: Preferences,
    airlines: AirlineDirectory,
    poll: Duration,
    history_minutes: u32,
    visible: bool,
    status: ConnectionStatus,
}

impl DetailSurface {
    pub fn new(
        icao24: Icao24,
        prefs: Preferences,
        poll: Duration,
        history_capacity: usize,
        history_minutes: u32,
    ) -> Self {
        let mut history = TrackedHistory::new(history_capacity);
        history.select(Some(icao24));
        DetailSurface {
            icao24,
            detail: None,
            label: None,
            history,
            prefs,
            airlines: AirlineDirectory::default(),
            poll,
            history_minutes,
            visible: false,
            status: ConnectionStatus::Connecting,
        }
    }

    pub fn icao24(&self) -> Icao24 {
        self.icao24
    }

    pub fn detail(&self) -> Option<&DetailResponse> {
        self.detail.as_ref()
    }

    pub fn label(&self) -> Option<&EntityLabel> {
        self.label.as_ref()
    }

    pub fn history(&self) -> &TrackedHistory {
        &self.history
    }

    /// Anomaly reasons as delivered upstream; never recomputed here.
    pub fn anomaly_reasons(&self) -> &[String] {
        self.detail
            .as_ref()
            .and_then(|d| d.analytics_detail.as_ref())
            .map(|a| a.anomaly_reasons.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_anomaly(&self) -> bool {
        self.detail
            .as_ref()
            .is_some_and(|d| d.flight.analytics.is_anomaly)
    }

    pub fn chart<C: Canvas + ?Sized>(&self, canvas: &mut C, channel: Channel) -> Option<ChartFrame> {
        render_history(canvas, self.history.buffer(), channel, &self.prefs)
    }

    fn poll_requests(&self) -> Vec<Request> {
        let mut reqs = vec![Request::Detail(self.icao24)];
        if let Some(tag) = self.history.tag() {
            reqs.push(Request::History {
                tag,
                minutes: self.history_minutes,
            });
        }
        reqs
    }

    fn relabel(&mut self) {
        self.label = self.detail.as_ref().map(|d| {
            let mut label = build_label(&d.flight, &self.prefs, &self.airlines);
            if let Some(name) = d.airline_name.as_deref().filter(|n| !n.trim().is_empty()) {
                label.operator = name.to_string();
            }
            label
        });
    }

    fn load_history(&mut self, tag: RequestTag, response: &crate::model::HistoryResponse) {
        match self.history.load(tag, &response.samples()) {
            Applied::Accepted(n) => tracing::debug!(icao = %self.icao24, samples = n, "history loaded"),
            Applied::Stale => tracing::debug!(icao = %tag.icao24, "discarding stale history response"),
        }
    }
}

impl Surface for DetailSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Detail
    }

    fn timers(&self) -> Vec<(TimerKey, Duration)> {
        vec![(TimerKey::Poll, self.poll)]
    }

    fn on_timer(&mut self, key: TimerKey, _elapsed: Duration) -> Vec<Request> {
        match key {
            TimerKey::Poll => self.poll_requests(),
            TimerKey::Progress => Vec::new(),
        }
    }

    fn on_input(&mut self, _input: Input) -> Vec<Request> {
        Vec::new()
    }

    fn on_response(&mut self, response: Response, _now: f64) -> Vec<Request> {
        note_success(&mut self.status, &response);
        match response {
            Response::Detail(detail) => {
                if detail.flight.icao24 == self.icao24 {
                    self.detail = Some(*detail);
                    self.relabel();
                }
            }
            Response::History { tag, response } => self.load_history(tag, &response),
            Response::Snapshot(_) | Response::Rotation(_) => {}
        }
        Vec::new()
    }

    fn on_request_failed(&mut self, request: &Request, error: &FlightwallError) {
        note_failure(&mut self.status, SurfaceKind::Detail, request, error);
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
        if resumed {
            self.poll_requests()
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
