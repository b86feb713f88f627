//! Wire models for the telemetry API and the immutable entity snapshot.
//!
//! Snapshots are value objects: a poll replaces the whole array, nothing is
//! patched in place. Every field except the identifier may be missing and
//! renders as a placeholder.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::Icao24;

// ---------------------------------------------------------------------------
// Entity snapshot
// ---------------------------------------------------------------------------

/// One record per tracked aircraft per poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub icao24: Icao24,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub aircraft_type: Option<String>,
    #[serde(default)]
    pub aircraft_type_desc: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub telemetry: Telemetry,
    #[serde(default)]
    pub status: FlightStatus,
    #[serde(default)]
    pub analytics: Analytics,
    #[serde(default)]
    pub route: Option<Route>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_km: Option<f64>,
}

impl Position {
    pub fn lat_lon(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub altitude_ft: Option<f64>,
    pub flight_level: Option<String>,
    pub speed_kts: Option<f64>,
    pub heading: Option<f64>,
    pub vertical_rate_fpm: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightStatus {
    #[serde(default)]
    pub on_ground: bool,
    pub flight_phase: Option<String>,
}

/// Upstream-computed annotations. Displayed verbatim, never recomputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub speed_trend: Option<String>,
    pub altitude_trend: Option<String>,
    #[serde(default)]
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub origin: Option<String>,
    pub destination: Option<String>,
    #[serde(default)]
    pub origin_icao: Option<String>,
    #[serde(default)]
    pub origin_name: Option<String>,
    #[serde(default)]
    pub destination_icao: Option<String>,
    #[serde(default)]
    pub destination_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl EntitySnapshot {
    /// Bare snapshot with only an identifier; used by tests and fallbacks.
    pub fn new(icao24: Icao24) -> Self {
        EntitySnapshot {
            icao24,
            callsign: None,
            aircraft_type: None,
            aircraft_type_desc: None,
            operator: None,
            position: Position::default(),
            telemetry: Telemetry::default(),
            status: FlightStatus::default(),
            analytics: Analytics::default(),
            route: None,
        }
    }

    /// Trimmed callsign, or `None` if blank.
    pub fn callsign(&self) -> Option<&str> {
        self.callsign
            .as_deref()
            .map(str::trim)
            .filter(|cs| !cs.is_empty())
    }

    /// Callsign if present, otherwise the uppercase address.
    pub fn display_callsign(&self) -> String {
        match self.callsign() {
            Some(cs) => cs.to_string(),
            None => self.icao24.to_string().to_ascii_uppercase(),
        }
    }

    /// History sample describing this snapshot's telemetry.
    pub fn sample(&self, timestamp: f64) -> HistorySample {
        HistorySample {
            timestamp,
            altitude_ft: self.telemetry.altitude_ft,
            speed_kts: self.telemetry.speed_kts,
            heading: self.telemetry.heading,
            vertical_rate_fpm: self.telemetry.vertical_rate_fpm,
            position: self.position.lat_lon(),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// `GET /api/flights`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    #[serde(default, deserialize_with = "skip_invalid_entities")]
    pub flights: Vec<EntitySnapshot>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub query_time_ms: Option<f64>,
}

/// Decode each entity on its own so one bad record does not sink the poll.
fn skip_invalid_entities<'de, D>(deserializer: D) -> Result<Vec<EntitySnapshot>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut flights = Vec::with_capacity(raw.len());
    for value in raw {
        match EntitySnapshot::deserialize(value) {
            Ok(snapshot) => flights.push(snapshot),
            Err(e) => tracing::warn!(error = %e, "skipping malformed flight entity"),
        }
    }
    Ok(flights)
}

/// Rolling statistics for one channel, as computed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsDetail {
    #[serde(default)]
    pub total_samples: u64,
    #[serde(default)]
    pub window_samples: u64,
    pub altitude: Option<ChannelStats>,
    pub speed: Option<ChannelStats>,
    pub vertical_rate: Option<ChannelStats>,
    #[serde(default)]
    pub anomaly_reasons: Vec<String>,
}

/// `GET /api/flights/{icao24}`: the snapshot fields flattened at top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailResponse {
    #[serde(flatten)]
    pub flight: EntitySnapshot,
    #[serde(default)]
    pub analytics_detail: Option<AnalyticsDetail>,
    #[serde(default)]
    pub airline_name: Option<String>,
    #[serde(default)]
    pub query_time_ms: Option<f64>,
}

/// Flat record the ticker endpoint returns for the entity on display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerFlight {
    pub icao24: Icao24,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default, rename = "type")]
    pub aircraft_type: Option<String>,
    #[serde(default)]
    pub type_description: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub airline_name: Option<String>,
    #[serde(default)]
    pub altitude_ft: Option<f64>,
    #[serde(default)]
    pub flight_level: Option<String>,
    #[serde(default)]
    pub speed_kts: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub vertical_rate_fpm: Option<f64>,
    #[serde(default)]
    pub flight_phase: Option<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub is_anomaly: bool,
    #[serde(default)]
    pub route: Option<Route>,
    #[serde(default)]
    pub eta_minutes: Option<i64>,
}

impl TickerFlight {
    /// Lift the flat record into a full snapshot so the shared label code applies.
    pub fn to_snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            icao24: self.icao24,
            callsign: self.callsign.clone(),
            aircraft_type: self.aircraft_type.clone(),
            aircraft_type_desc: self.type_description.clone(),
            operator: self.operator.clone().or_else(|| self.airline_name.clone()),
            position: Position {
                latitude: None,
                longitude: None,
                distance_km: self.distance_km,
            },
            telemetry: Telemetry {
                altitude_ft: self.altitude_ft,
                flight_level: self.flight_level.clone(),
                speed_kts: self.speed_kts,
                heading: self.heading,
                vertical_rate_fpm: self.vertical_rate_fpm,
            },
            status: FlightStatus {
                on_ground: false,
                flight_phase: self.flight_phase.clone(),
            },
            analytics: Analytics {
                is_anomaly: self.is_anomaly,
                ..Analytics::default()
            },
            route: self.route.clone(),
        }
    }
}

/// `GET /api/flights/ticker`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationResponse {
    #[serde(default)]
    pub flight: Option<TickerFlight>,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub next_rotation_in: Option<f64>,
    #[serde(default)]
    pub query_time_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Parallel arrays as served by the history endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    #[serde(default)]
    pub timestamps: Vec<f64>,
    #[serde(default)]
    pub altitudes: Vec<Option<f64>>,
    #[serde(default)]
    pub speeds: Vec<Option<f64>>,
    #[serde(default)]
    pub headings: Vec<Option<f64>>,
    #[serde(default)]
    pub vertical_rates: Vec<Option<f64>>,
    #[serde(default)]
    pub positions: Vec<Option<(f64, f64)>>,
}

/// `GET /api/flights/history/{icao24}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub icao24: Icao24,
    #[serde(default)]
    pub history: HistorySeries,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub query_time_ms: Option<f64>,
}

/// One observation event across all channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub timestamp: f64,
    pub altitude_ft: Option<f64>,
    pub speed_kts: Option<f64>,
    pub heading: Option<f64>,
    pub vertical_rate_fpm: Option<f64>,
    pub position: Option<(f64, f64)>,
}

impl HistorySample {
    /// True when no telemetry channel carries a value.
    pub fn is_empty(&self) -> bool {
        self.altitude_ft.is_none()
            && self.speed_kts.is_none()
            && self.heading.is_none()
            && self.vertical_rate_fpm.is_none()
    }
}

impl HistorySeries {
    /// Zip the parallel arrays into per-sample records.
    ///
    /// Timestamps drive the length; a channel array that is shorter reads as
    /// absent for the missing indices. Samples with every channel absent are
    /// dropped.
    pub fn samples(&self) -> Vec<HistorySample> {
        fn at<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
            values.get(i).copied().flatten()
        }

        self.timestamps
            .iter()
            .enumerate()
            .map(|(i, &timestamp)| HistorySample {
                timestamp,
                altitude_ft: at(&self.altitudes, i),
                speed_kts: at(&self.speeds, i),
                heading: at(&self.headings, i),
                vertical_rate_fpm: at(&self.vertical_rates, i),
                position: at(&self.positions, i),
            })
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl HistoryResponse {
    pub fn samples(&self) -> Vec<HistorySample> {
        self.history.samples()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_JSON: &str = r#"{
        "flights": [
            {
                "icao24": "a1b2c3",
                "callsign": "UAL839  ",
                "aircraft_type": "B789",
                "position": {"latitude": 37.6, "longitude": -122.3, "distance_km": 12.5},
                "telemetry": {"altitude_ft": 35000, "speed_kts": 480, "heading": 270, "vertical_rate_fpm": 0},
                "status": {"on_ground": false, "flight_phase": "cruise"},
                "analytics": {"speed_trend": "stable", "altitude_trend": "level", "is_anomaly": false},
                "route": {"origin": "SFO", "destination": "NRT"}
            },
            {"icao24": "000001", "position": {"latitude": null, "longitude": null}}
        ],
        "count": 2,
        "timestamp": "2024-01-01T00:00:00+00:00",
        "query_time_ms": 1.25
    }"#;

    #[test]
    fn test_parse_snapshot_list() {
        let resp: SnapshotResponse = serde_json::from_str(LIST_JSON).unwrap();
        assert_eq!(resp.count, 2);
        assert_eq!(resp.query_time_ms, Some(1.25));

        let first = &resp.flights[0];
        assert_eq!(first.callsign(), Some("UAL839"));
        assert_eq!(first.position.lat_lon(), Some((37.6, -122.3)));
        assert_eq!(first.telemetry.altitude_ft, Some(35000.0));
        assert_eq!(first.route.as_ref().unwrap().destination.as_deref(), Some("NRT"));

        let second = &resp.flights[1];
        assert!(second.position.lat_lon().is_none());
        assert_eq!(second.display_callsign(), "000001");
    }

    #[test]
    fn test_malformed_entity_skipped() {
        let json = r#"{
            "flights": [
                {"icao24": "zzzzzz", "callsign": "BAD1"},
                {"callsign": "NOID"},
                {"icao24": "a1b2c3", "callsign": "UAL839"}
            ],
            "count": 3
        }"#;
        let resp: SnapshotResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.flights.len(), 1);
        assert_eq!(resp.flights[0].callsign(), Some("UAL839"));

        let empty: SnapshotResponse = serde_json::from_str(r#"{"flights": null}"#).unwrap();
        assert!(empty.flights.is_empty());
    }

    #[test]
    fn test_parse_detail_flattened() {
        let json = r#"{
            "icao24": "a1b2c3",
            "callsign": "UAL839",
            "telemetry": {"altitude_ft": 35000},
            "analytics": {"is_anomaly": true},
            "analytics_detail": {
                "total_samples": 40, "window_samples": 30,
                "altitude": {"mean": 34990.5, "std": 12.1, "min": 34900, "max": 35100, "count": 30},
                "anomaly_reasons": ["altitude deviation"]
            },
            "airline_name": "United Airlines",
            "query_time_ms": 3.5
        }"#;
        let detail: DetailResponse = serde_json::from_str(json).unwrap();
        assert!(detail.flight.analytics.is_anomaly);
        let analytics = detail.analytics_detail.unwrap();
        assert_eq!(analytics.altitude.unwrap().count, 30);
        assert!(analytics.speed.is_none());
        assert_eq!(analytics.anomaly_reasons, vec!["altitude deviation"]);
    }

    #[test]
    fn test_parse_rotation_empty() {
        let json = r#"{"flight": null, "message": "No aircraft in range", "total_count": 0}"#;
        let resp: RotationResponse = serde_json::from_str(json).unwrap();
        assert!(resp.flight.is_none());
        assert_eq!(resp.total_count, 0);
    }

    #[test]
    fn test_ticker_flight_to_snapshot() {
        let json = r#"{
            "flight": {"icao24": "abc123", "callsign": "DAL12", "type": "A321",
                       "type_description": "Airbus A321", "altitude_ft": 12000,
                       "distance_km": 40.2, "is_anomaly": true, "eta_minutes": 14},
            "current_index": 2, "total_count": 5, "next_rotation_in": 3.2
        }"#;
        let resp: RotationResponse = serde_json::from_str(json).unwrap();
        let flight = resp.flight.unwrap();
        assert_eq!(flight.eta_minutes, Some(14));
        let snap = flight.to_snapshot();
        assert_eq!(snap.aircraft_type.as_deref(), Some("A321"));
        assert_eq!(snap.position.distance_km, Some(40.2));
        assert!(snap.analytics.is_anomaly);
    }

    #[test]
    fn test_history_zip_drops_all_absent() {
        let json = r#"{
            "icao24": "a1b2c3",
            "history": {
                "timestamps": [100, 110, 120, 130],
                "altitudes": [1000, null, 1200, 1300],
                "speeds": [200, null, null],
                "vertical_rates": [500, null, 0, 100],
                "positions": [[1.0, 2.0], null, null, [1.1, 2.1]]
            },
            "count": 4, "minutes": 30
        }"#;
        let resp: HistoryResponse = serde_json::from_str(json).unwrap();
        let samples = resp.samples();

        // index 1 has no channel values at all
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].altitude_ft, Some(1000.0));
        assert_eq!(samples[0].position, Some((1.0, 2.0)));
        assert_eq!(samples[1].timestamp, 120.0);
        assert_eq!(samples[1].speed_kts, None);
        // speeds array is shorter than timestamps
        assert_eq!(samples[2].speed_kts, None);
        assert_eq!(samples[2].vertical_rate_fpm, Some(100.0));
    }

    #[test]
    fn test_snapshot_sample() {
        let mut snap = EntitySnapshot::new(Icao24::new(1).unwrap());
        snap.telemetry.altitude_ft = Some(5000.0);
        let sample = snap.sample(42.0);
        assert_eq!(sample.timestamp, 42.0);
        assert_eq!(sample.altitude_ft, Some(5000.0));
        assert!(!sample.is_empty());
        assert!(EntitySnapshot::new(Icao24::new(2).unwrap()).sample(0.0).is_empty());
    }
}
