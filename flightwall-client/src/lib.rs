//! flightwall-client: network, preference sync and presentation for the
//! flightwall surfaces.

pub mod api;
pub mod console;
pub mod present;
pub mod runner;
pub mod store;

pub use api::{execute, HttpApi, TelemetryApi};
pub use runner::{Driver, UiEvent};
pub use store::{PrefChange, PrefHandle, PreferenceStore};
