//! Map markers and the label text shared by every surface.

use serde::Serialize;

use crate::format::{self, PLACEHOLDER};
use crate::geo::RangeIndicator;
use crate::history::Channel;
use crate::lookup::{aircraft_type_name, callsign_to_flight_number, AirlineDirectory};
use crate::model::EntitySnapshot;
use crate::prefs::{LabelVerbosity, Preferences};
use crate::reconcile::VisualFactory;
use crate::types::Icao24;

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Text lines describing one entity, already unit-converted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityLabel {
    pub callsign: String,
    /// IATA flight number derived from the callsign.
    pub flight: String,
    pub operator: String,
    pub aircraft: String,
    pub route: String,
    pub altitude: String,
    pub flight_level: String,
    pub speed: String,
    pub heading: String,
    pub vertical_rate: String,
    pub distance: String,
    pub phase: String,
}

fn route_text(snap: &EntitySnapshot, verbosity: LabelVerbosity) -> String {
    let Some(route) = &snap.route else {
        return PLACEHOLDER.to_string();
    };
    let (from, to) = match verbosity {
        LabelVerbosity::Codes => (route.origin.as_deref(), route.destination.as_deref()),
        LabelVerbosity::Full => (
            route.origin_name.as_deref().or(route.origin.as_deref()),
            route
                .destination_name
                .as_deref()
                .or(route.destination.as_deref()),
        ),
    };
    if from.is_none() && to.is_none() {
        return PLACEHOLDER.to_string();
    }
    format!(
        "{} > {}",
        format::or_placeholder(from),
        format::or_placeholder(to)
    )
}

fn aircraft_text(snap: &EntitySnapshot, verbosity: LabelVerbosity) -> String {
    let code = snap.aircraft_type.as_deref().map(str::trim).filter(|c| !c.is_empty());
    match verbosity {
        LabelVerbosity::Codes => format::or_placeholder(code).to_string(),
        LabelVerbosity::Full => snap
            .aircraft_type_desc
            .as_deref()
            .or_else(|| code.and_then(aircraft_type_name))
            .or(code)
            .unwrap_or(PLACEHOLDER)
            .to_string(),
    }
}

fn operator_text(
    snap: &EntitySnapshot,
    verbosity: LabelVerbosity,
    airlines: &AirlineDirectory,
) -> String {
    let resolved = snap.callsign().and_then(|cs| airlines.resolve(cs));
    match verbosity {
        LabelVerbosity::Codes => resolved
            .map(|a| a.code)
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        LabelVerbosity::Full => snap
            .operator
            .clone()
            .filter(|o| !o.trim().is_empty())
            .or_else(|| resolved.map(|a| a.name))
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
    }
}

/// Build the label lines for a snapshot under the current preferences.
pub fn build_label(
    snap: &EntitySnapshot,
    prefs: &Preferences,
    airlines: &AirlineDirectory,
) -> EntityLabel {
    let t = &snap.telemetry;
    EntityLabel {
        callsign: snap.display_callsign(),
        flight: snap
            .callsign()
            .map(callsign_to_flight_number)
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        operator: operator_text(snap, prefs.label_verbosity, airlines),
        aircraft: aircraft_text(snap, prefs.label_verbosity),
        route: route_text(snap, prefs.label_verbosity),
        altitude: format::format_channel(Channel::Altitude, t.altitude_ft, prefs),
        flight_level: t
            .flight_level
            .clone()
            .filter(|fl| !fl.trim().is_empty())
            .unwrap_or_else(|| format::flight_level(t.altitude_ft)),
        speed: format::format_channel(Channel::Speed, t.speed_kts, prefs),
        heading: format::format_channel(Channel::Heading, t.heading, prefs),
        vertical_rate: format::format_channel(Channel::VerticalRate, t.vertical_rate_fpm, prefs),
        distance: format::distance_km(snap.position.distance_km),
        phase: format::or_placeholder(snap.status.flight_phase.as_deref()).to_string(),
    }
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerIcon {
    Airborne,
    OnGround,
    Anomaly,
}

impl MarkerIcon {
    fn for_snapshot(snap: &EntitySnapshot) -> Self {
        if snap.analytics.is_anomaly {
            MarkerIcon::Anomaly
        } else if snap.status.on_ground {
            MarkerIcon::OnGround
        } else {
            MarkerIcon::Airborne
        }
    }
}

/// Arrow glyph for a heading, one of eight compass sectors.
pub fn heading_arrow(heading: Option<f64>) -> char {
    const ARROWS: [char; 8] = ['↑', '↗', '→', '↘', '↓', '↙', '←', '↖'];
    match heading {
        Some(h) if h.is_finite() => {
            let sector = ((h.rem_euclid(360.0) + 22.5) / 45.0) as usize % 8;
            ARROWS[sector]
        }
        _ => '•',
    }
}

/// Persistent visual object for one entity on the spatial view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// Assigned once at creation; never changes for the marker's lifetime.
    pub serial: u64,
    pub icao24: Icao24,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Hidden while the snapshot carries no position.
    pub visible: bool,
    pub rotation_deg: f64,
    pub arrow: char,
    pub icon: MarkerIcon,
    pub label: EntityLabel,
    pub highlighted: bool,
    /// `None` when there is no position or no range ring to compare against.
    pub in_range: Option<bool>,
    pub updates: u64,
}

/// Creates and mutates [`Marker`]s; owns what their presentation depends on.
#[derive(Debug, Clone, Default)]
pub struct MarkerFactory {
    pub prefs: Preferences,
    pub airlines: AirlineDirectory,
    pub range: Option<RangeIndicator>,
    next_serial: u64,
}

impl MarkerFactory {
    pub fn new(prefs: Preferences, range: Option<RangeIndicator>) -> Self {
        MarkerFactory {
            prefs,
            range,
            ..MarkerFactory::default()
        }
    }

    fn apply(&self, marker: &mut Marker, snap: &EntitySnapshot) {
        let pos = snap.position.lat_lon();
        marker.lat = pos.map(|p| p.0);
        marker.lon = pos.map(|p| p.1);
        marker.visible = pos.is_some();
        marker.rotation_deg = snap.telemetry.heading.map(|h| h.rem_euclid(360.0)).unwrap_or(0.0);
        marker.arrow = heading_arrow(snap.telemetry.heading);
        marker.icon = MarkerIcon::for_snapshot(snap);
        marker.label = build_label(snap, &self.prefs, &self.airlines);
        marker.in_range = match (self.range, pos) {
            (Some(ring), Some((lat, lon))) => Some(ring.contains(lat, lon)),
            _ => None,
        };
    }
}

impl VisualFactory for MarkerFactory {
    type Visual = Marker;

    fn create(&mut self, snapshot: &EntitySnapshot) -> Marker {
        self.next_serial += 1;
        let mut marker = Marker {
            serial: self.next_serial,
            icao24: snapshot.icao24,
            lat: None,
            lon: None,
            visible: false,
            rotation_deg: 0.0,
            arrow: '•',
            icon: MarkerIcon::Airborne,
            label: EntityLabel::default(),
            highlighted: false,
            in_range: None,
            updates: 0,
        };
        self.apply(&mut marker, snapshot);
        marker
    }

    fn update(&mut self, visual: &mut Marker, snapshot: &EntitySnapshot) {
        self.apply(visual, snapshot);
        visual.updates += 1;
    }

    fn set_highlight(&mut self, visual: &mut Marker, highlighted: bool) {
        visual.highlighted = highlighted;
    }

    fn destroy(&mut self, visual: Marker) {
        tracing::trace!(icao = %visual.icao24, serial = visual.serial, "marker destroyed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
