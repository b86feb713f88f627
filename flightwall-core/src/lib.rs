//! flightwall-core: display engine for live flight walls.
//!
//! No async, no I/O beyond config and PNG files: reconciliation of polled
//! snapshots into persistent visuals, bounded telemetry history, chart
//! rendering, rotation state, and the surface state machines that tie them
//! together. `flightwall-client` runs these against the telemetry API.

pub mod chart;
pub mod config;
pub mod controls;
pub mod format;
pub mod geo;
pub mod history;
pub mod lookup;
pub mod marker;
pub mod model;
pub mod prefs;
pub mod raster;
pub mod reconcile;
pub mod rotation;
pub mod scheduler;
pub mod surface;
pub mod types;

// Re-export commonly used types at crate root
pub use history::{Channel, HistoryBuffer, RequestTag, TrackedHistory};
pub use model::{EntitySnapshot, HistorySample};
pub use prefs::{PrefKey, Preferences};
pub use reconcile::{reconcile, Bindings, VisualFactory};
pub use surface::{Input, Request, Response, Surface, TimerKey};
pub use types::*;
