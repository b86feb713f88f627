//! Interactive spatial view: markers for every entity in range, one selection,
//! and the selected entity's telemetry history.

use std::time::Duration;

use crate::chart::{Canvas, ChartFrame};
use crate::controls::SurfaceKind;
use crate::geo::RangeIndicator;
use crate::history::{Applied, Channel, TrackedHistory};
use crate::marker::{Marker, MarkerFactory};
use crate::model::EntitySnapshot;
use crate::prefs::Preferences;
use crate::reconcile::{reconcile, Bindings, ReconcileReport};
use crate::types::{ConnectionStatus, FlightwallError, Icao24};

use super::{note_failure, note_success, render_history, Input, Request, Response, Surface, TimerKey};

#[derive(Debug)]
pub struct MapSurface {
    bindings: Bindings<Marker>,
    factory: MarkerFactory,
    history: TrackedHistory,
    observer: Option<(f64, f64)>,
    poll: Duration,
    history_minutes: u32,
    visible: bool,
    status: ConnectionStatus,
    count: usize,
    last_report: ReconcileReport,
}

impl MapSurface {
    pub fn new(
        prefs: Preferences,
        observer: Option<(f64, f64)>,
        poll: Duration,
        history_capacity: usize,
        history_minutes: u32,
    ) -> Self {
        let range = ring(observer, &prefs);
        MapSurface {
            bindings: Bindings::new(),
            factory: MarkerFactory::new(prefs, range),
            history: TrackedHistory::new(history_capacity),
            observer,
            poll,
            history_minutes,
            visible: false,
            status: ConnectionStatus::Connecting,
            count: 0,
            last_report: ReconcileReport::default(),
        }
    }

    pub fn bindings(&self) -> &Bindings<Marker> {
        &self.bindings
    }

    pub fn marker(&self, icao24: &Icao24) -> Option<&Marker> {
        self.bindings.get(icao24).map(|b| &b.visual)
    }

    /// Markers sorted by distance, nearest first; unknown distances last.
    pub fn markers_by_distance(&self) -> Vec<(&EntitySnapshot, &Marker)> {
        let mut rows: Vec<_> = self
            .bindings
            .iter()
            .map(|b| (&b.snapshot, &b.visual))
            .collect();
        rows.sort_by(|a, b| {
            let da = a.0.position.distance_km.unwrap_or(f64::INFINITY);
            let db = b.0.position.distance_km.unwrap_or(f64::INFINITY);
            da.total_cmp(&db).then(a.0.icao24.cmp(&b.0.icao24))
        });
        rows
    }

    pub fn selected(&self) -> Option<Icao24> {
        self.bindings.selected()
    }

    pub fn selected_snapshot(&self) -> Option<&EntitySnapshot> {
        self.selected()
            .and_then(|id| self.bindings.get(&id))
            .map(|b| &b.snapshot)
    }

    pub fn history(&self) -> &TrackedHistory {
        &self.history
    }

    pub fn range(&self) -> Option<RangeIndicator> {
        self.factory.range
    }

    pub fn prefs(&self) -> &Preferences {
        &self.factory.prefs
    }

    /// Entity count reported by the last snapshot.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn last_report(&self) -> &ReconcileReport {
        &self.last_report
    }

    pub fn chart<C: Canvas + ?Sized>(&self, canvas: &mut C, channel: Channel) -> Option<ChartFrame> {
        render_history(canvas, self.history.buffer(), channel, &self.factory.prefs)
    }

    fn apply_snapshot(&mut self, flights: &[EntitySnapshot], now: f64) {
        let bindings = std::mem::take(&mut self.bindings);
        let (bindings, report) = reconcile(bindings, flights, &mut self.factory);
        self.bindings = bindings;

        if report.selection_lost {
            tracing::debug!("selected entity left the snapshot, clearing history");
            self.history.select(None);
        } else if let Some((id, sample)) = self
            .selected_snapshot()
            .map(|snap| (snap.icao24, snap.sample(now)))
        {
            if !sample.is_empty() {
                self.history.push_live(id, &sample);
            }
        }
        self.last_report = report;
    }
}

fn ring(observer: Option<(f64, f64)>, prefs: &Preferences) -> Option<RangeIndicator> {
    observer.map(|(lat, lon)| RangeIndicator {
        lat,
        lon,
        radius_nm: f64::from(prefs.range_nm),
    })
}

impl Surface for MapSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Map
    }

    fn timers(&self) -> Vec<(TimerKey, Duration)> {
        vec![(TimerKey::Poll, self.poll)]
    }

    fn on_timer(&mut self, key: TimerKey, _elapsed: Duration) -> Vec<Request> {
        match key {
            TimerKey::Poll => vec![Request::Snapshot],
            TimerKey::Progress => Vec::new(),
        }
    }

    fn on_input(&mut self, input: Input) -> Vec<Request> {
        let Input::Select(target) = input;
        if !self.bindings.select(target, &mut self.factory) {
            return Vec::new();
        }
        match self.history.select(target) {
            Some(tag) => vec![Request::History {
                tag,
                minutes: self.history_minutes,
            }],
            None => Vec::new(),
        }
    }

    fn on_response(&mut self, response: Response, now: f64) -> Vec<Request> {
        note_success(&mut self.status, &response);
        match response {
            Response::Snapshot(snapshot) => {
                self.count = snapshot.count.max(snapshot.flights.len());
                self.apply_snapshot(&snapshot.flights, now);
            }
            Response::History { tag, response } => {
                if let Applied::Stale = self.history.load(tag, &response.samples()) {
                    tracing::debug!(icao = %tag.icao24, "discarding stale history response");
                }
            }
            Response::Detail(_) | Response::Rotation(_) => {}
        }
        Vec::new()
    }

    fn on_request_failed(&mut self, request: &Request, error: &FlightwallError) {
        note_failure(&mut self.status, SurfaceKind::Map, request, error);
    }

    fn on_preferences(&mut self, prefs: &Preferences) {
        if self.factory.prefs == *prefs {
            return;
        }
        self.factory.prefs = *prefs;
        self.factory.range = ring(self.observer, prefs);
        self.bindings.refresh(&mut self.factory);
    }

    fn set_visible(&mut self, visible: bool) -> Vec<Request> {
        let resumed = visible && !self.visible;
        self.visible = visible;
        if resumed {
            vec![Request::Snapshot]
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
    use crate::chart::RecordingCanvas;
    use crate::model::{HistoryResponse, HistorySeries, SnapshotResponse};
    use crate::prefs::PrefKey;

    fn id(s: &str) -> Icao24 {
        s.parse().unwrap()
    }

    fn flight(icao: &str, alt: f64, lat: f64) -> EntitySnapshot {
        let mut s = EntitySnapshot::new(id(icao));
        s.callsign = Some(format!("TST{}", &icao[..3]));
        s.telemetry.altitude_ft = Some(alt);
        s.telemetry.speed_kts = Some(300.0);
        s.position.latitude = Some(lat);
        s.position.longitude = Some(-82.5);
        s
    }

    fn snapshot(flights: Vec<EntitySnapshot>) -> Response {
        Response::Snapshot(SnapshotResponse {
            count: flights.len(),
            flights,
            query_time_ms: Some(12.0),
        })
    }

    fn history(icao: &str, tag: crate::history::RequestTag, alts: &[f64]) -> Response {
        Response::History {
            tag,
            response: HistoryResponse {
                icao24: id(icao),
                history: HistorySeries {
                    timestamps: (0..alts.len()).map(|i| i as f64).collect(),
                    altitudes: alts.iter().map(|a| Some(*a)).collect(),
                    ..HistorySeries::default()
                },
                count: alts.len(),
                minutes: 30,
                query_time_ms: None,
            },
        }
    }

    fn surface() -> MapSurface {
        let mut s = MapSurface::new(
            Preferences::default(),
            Some((35.5, -82.5)),
            Duration::from_secs(10),
            30,
            30,
        );
        assert_eq!(s.set_visible(true), vec![Request::Snapshot]);
        s
    }

    #[test]
    fn test_poll_timer_requests_snapshot() {
        let mut s = surface();
        assert_eq!(s.timers(), vec![(TimerKey::Poll, Duration::from_secs(10))]);
        assert_eq!(s.on_timer(TimerKey::Poll, Duration::from_secs(10)), vec![Request::Snapshot]);
    }

    #[test]
    fn test_markers_persist_across_polls() {
        let mut s = surface();
        s.on_response(snapshot(vec![flight("aaaaaa", 1000.0, 35.5)]), 1.0);
        let serial = s.marker(&id("aaaaaa")).unwrap().serial;
        s.on_response(snapshot(vec![flight("aaaaaa", 2000.0, 35.6)]), 2.0);
        let marker = s.marker(&id("aaaaaa")).unwrap();
        assert_eq!(marker.serial, serial);
        assert_eq!(marker.label.altitude, "2,000 ft");
        assert!(s.status().is_connected());
    }

    #[test]
    fn test_select_requests_tagged_history() {
        let mut s = surface();
        s.on_response(snapshot(vec![flight("aaaaaa", 1000.0, 35.5)]), 1.0);
        let reqs = s.on_input(Input::Select(Some(id("aaaaaa"))));
        assert!(matches!(
            reqs.as_slice(),
            [Request::History { tag, minutes: 30 }] if tag.icao24 == id("aaaaaa")
        ));
        assert!(s.marker(&id("aaaaaa")).unwrap().highlighted);
        assert!(s.history().buffer().is_empty());

        // reselecting is a no-op
        assert!(s.on_input(Input::Select(Some(id("aaaaaa")))).is_empty());
        // unknown ids are ignored
        assert!(s.on_input(Input::Select(Some(id("ffffff")))).is_empty());
        assert_eq!(s.selected(), Some(id("aaaaaa")));
    }

    #[test]
    fn test_history_seed_then_live_samples() {
        let mut s = surface();
        s.on_response(snapshot(vec![flight("aaaaaa", 1000.0, 35.5)]), 1.0);
        let reqs = s.on_input(Input::Select(Some(id("aaaaaa"))));
        let Request::History { tag, .. } = reqs[0].clone() else {
            panic!("expected history request");
        };
        s.on_response(history("aaaaaa", tag, &[500.0, 700.0, 900.0]), 2.0);
        assert_eq!(s.history().buffer().len(), 3);

        s.on_response(snapshot(vec![flight("aaaaaa", 1100.0, 35.5)]), 3.0);
        assert_eq!(
            s.history().buffer().slots(Channel::Altitude),
            vec![Some(500.0), Some(700.0), Some(900.0), Some(1100.0)]
        );
    }

    #[test]
    fn test_stale_history_discarded() {
        let mut s = surface();
        s.on_response(
            snapshot(vec![flight("aaaaaa", 1000.0, 35.5), flight("bbbbbb", 5000.0, 35.6)]),
            1.0,
        );
        let reqs = s.on_input(Input::Select(Some(id("aaaaaa"))));
        let Request::History { tag: tag_a, .. } = reqs[0].clone() else {
            panic!("expected history request");
        };
        s.on_input(Input::Select(Some(id("bbbbbb"))));

        // late response for the old selection
        s.on_response(history("aaaaaa", tag_a, &[1.0, 2.0]), 2.0);
        assert!(s.history().buffer().is_empty());
        assert_eq!(s.history().selected(), Some(id("bbbbbb")));
    }

    #[test]
    fn test_selected_entity_disappears() {
        let mut s = surface();
        s.on_response(snapshot(vec![flight("aaaaaa", 1000.0, 35.5)]), 1.0);
        s.on_input(Input::Select(Some(id("aaaaaa"))));
        s.on_response(snapshot(vec![flight("aaaaaa", 1100.0, 35.5)]), 2.0);
        assert_eq!(s.history().buffer().len(), 1);

        s.on_response(snapshot(vec![flight("bbbbbb", 3000.0, 35.5)]), 3.0);
        assert_eq!(s.selected(), None);
        assert_eq!(s.history().selected(), None);
        assert!(s.history().buffer().is_empty());
        assert!(s.last_report().selection_lost);
    }

    #[test]
    fn test_deselect_clears_history() {
        let mut s = surface();
        s.on_response(snapshot(vec![flight("aaaaaa", 1000.0, 35.5)]), 1.0);
        s.on_input(Input::Select(Some(id("aaaaaa"))));
        s.on_response(snapshot(vec![flight("aaaaaa", 1100.0, 35.5)]), 2.0);
        assert!(s.on_input(Input::Select(None)).is_empty());
        assert!(s.history().buffer().is_empty());
        assert!(!s.marker(&id("aaaaaa")).unwrap().highlighted);
    }

    #[test]
    fn test_failure_keeps_markers() {
        let mut s = surface();
        s.on_response(snapshot(vec![flight("aaaaaa", 1000.0, 35.5)]), 1.0);
        s.on_request_failed(&Request::Snapshot, &FlightwallError::Status(503));
        s.on_request_failed(&Request::Snapshot, &FlightwallError::Transport("reset".into()));
        assert_eq!(
            s.status(),
            &ConnectionStatus::Disconnected {
                failures: 2,
                reason: "transport error: reset".into()
            }
        );
        assert_eq!(s.bindings().len(), 1);
        // the schedule is untouched: next poll still asks for a snapshot
        assert_eq!(s.on_timer(TimerKey::Poll, Duration::from_secs(10)), vec![Request::Snapshot]);
    }

    #[test]
    fn test_range_preference_updates_indicator_and_markers() {
        let mut s = surface();
        // ~13.8 nm north of the observer
        s.on_response(snapshot(vec![flight("aaaaaa", 1000.0, 35.73)]), 1.0);
        assert_eq!(s.marker(&id("aaaaaa")).unwrap().in_range, Some(false));

        let mut prefs = *s.prefs();
        prefs.apply(PrefKey::Range, "25").unwrap();
        s.on_preferences(&prefs);
        assert_eq!(s.range().unwrap().radius_nm, 25.0);
        assert_eq!(s.marker(&id("aaaaaa")).unwrap().in_range, Some(true));
    }

    #[test]
    fn test_resume_polls_immediately() {
        let mut s = surface();
        assert!(s.set_visible(true).is_empty());
        assert!(s.set_visible(false).is_empty());
        assert_eq!(s.set_visible(true), vec![Request::Snapshot]);
    }

    #[test]
    fn test_chart_needs_two_samples() {
        let mut s = surface();
        s.on_response(snapshot(vec![flight("aaaaaa", 1000.0, 35.5)]), 1.0);
        s.on_input(Input::Select(Some(id("aaaaaa"))));
        s.on_response(snapshot(vec![flight("aaaaaa", 1100.0, 35.5)]), 2.0);
        let mut canvas = RecordingCanvas::new(300.0, 100.0);
        assert!(s.chart(&mut canvas, Channel::Altitude).is_none());
        s.on_response(snapshot(vec![flight("aaaaaa", 1200.0, 35.5)]), 3.0);
        let frame = s.chart(&mut canvas, Channel::Altitude).unwrap();
        assert_eq!(frame.domain.min, 0.0);
    }
}
