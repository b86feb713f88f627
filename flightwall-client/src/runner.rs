//! Async driver for one surface.
//!
//! The driver owns a surface, a [`VirtualScheduler`] whose clock is wall time
//! since the driver started, and every request currently in flight. One
//! `select!` loop multiplexes timer deadlines, request completions, UI events
//! and preference changes; responses are applied in the order they arrive.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use flightwall_core::prefs::{PrefKey, Preferences};
use flightwall_core::scheduler::VirtualScheduler;
use flightwall_core::surface::{Input, Request, Response, Surface, TimerKey};
use flightwall_core::types::{Icao24, Result};

use crate::api::{execute, TelemetryApi};
use crate::store::{PrefChange, PrefHandle};

/// Events delivered to a running surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Select(Option<Icao24>),
    Visible(bool),
    /// A preference edited on this surface.
    SetPreference { key: PrefKey, value: String },
    Shutdown,
}

type InFlight = BoxFuture<'static, (Request, Result<Response>)>;

/// Wall-clock time in Unix seconds.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn dispatch(api: &Arc<dyn TelemetryApi>, inflight: &mut FuturesUnordered<InFlight>, requests: Vec<Request>) {
    for request in requests {
        tracing::trace!(request = %request.describe(), "dispatch");
        let api = Arc::clone(api);
        inflight.push(
            async move {
                let result = execute(api.as_ref(), &request).await;
                (request, result)
            }
            .boxed(),
        );
    }
}

/// Validate a stored value against `local` and hand it to the surface.
/// Invalid values are logged and dropped; `local` keeps its prior value.
fn apply_preference<S: Surface>(surface: &mut S, local: &mut Preferences, key: &str, value: &str) -> bool {
    match local.apply_storage(key, value) {
        Ok(true) => {
            surface.on_preferences(local);
            true
        }
        Ok(false) => false,
        Err(e) => {
            tracing::warn!(surface = %surface.kind(), error = %e, "rejected preference value");
            false
        }
    }
}

pub struct Driver<S> {
    surface: S,
    api: Arc<dyn TelemetryApi>,
    prefs: PrefHandle,
}

impl<S: Surface + Send + 'static> Driver<S> {
    pub fn new(surface: S, api: Arc<dyn TelemetryApi>, prefs: PrefHandle) -> Self {
        Driver { surface, api, prefs }
    }

    /// Run on a new task. `on_change` sees the surface after every event.
    pub fn spawn<F>(self, on_change: F) -> (mpsc::Sender<UiEvent>, JoinHandle<S>)
    where
        F: FnMut(&S) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(32);
        let handle = tokio::spawn(self.run(rx, on_change));
        (tx, handle)
    }

    /// Drive the surface until `Shutdown` arrives or every sender is dropped.
    /// Returns the surface in its final state.
    pub async fn run<F: FnMut(&S)>(self, mut events: mpsc::Receiver<UiEvent>, mut on_change: F) -> S {
        let Driver {
            mut surface,
            api,
            mut prefs,
        } = self;
        let kind = surface.kind();
        let mut local = prefs.preferences();
        surface.on_preferences(&local);

        let origin = Instant::now();
        let mut scheduler: VirtualScheduler<TimerKey> = VirtualScheduler::new();
        let mut inflight: FuturesUnordered<InFlight> = FuturesUnordered::new();
        tracing::info!(surface = %kind, "driver started");

        loop {
            let deadline = scheduler.next_deadline().map(|d| origin + d);
            let wake = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                () = wake => {
                    for firing in scheduler.advance_to(origin.elapsed()) {
                        let elapsed = scheduler.period(&firing.key).unwrap_or_default();
                        let requests = surface.on_timer(firing.key, elapsed);
                        dispatch(&api, &mut inflight, requests);
                    }
                }
                Some((request, result)) = inflight.next() => {
                    match result {
                        Ok(response) => {
                            let follow_up = surface.on_response(response, unix_now());
                            dispatch(&api, &mut inflight, follow_up);
                        }
                        Err(e) => surface.on_request_failed(&request, &e),
                    }
                }
                event = events.recv() => match event {
                    None | Some(UiEvent::Shutdown) => break,
                    Some(UiEvent::Select(id)) => {
                        let requests = surface.on_input(Input::Select(id));
                        dispatch(&api, &mut inflight, requests);
                    }
                    Some(UiEvent::Visible(visible)) => {
                        if visible == surface.is_visible() {
                            continue;
                        }
                        scheduler.stop_all();
                        scheduler.advance_to(origin.elapsed());
                        if visible {
                            for (key, period) in surface.timers() {
                                scheduler.start(key, period);
                            }
                        }
                        let requests = surface.set_visible(visible);
                        tracing::debug!(surface = %kind, visible, "visibility changed");
                        dispatch(&api, &mut inflight, requests);
                    }
                    Some(UiEvent::SetPreference { key, value }) => {
                        if apply_preference(&mut surface, &mut local, key.storage_key(), &value) {
                            if let Err(e) = prefs.set_pref(key, &local) {
                                tracing::warn!(error = %e, "failed to store preference");
                            }
                        }
                    }
                },
                Some(change) = prefs.changed() => {
                    let PrefChange { key, value } = change;
                    // a removed key falls back to its default
                    let value = value.or_else(|| {
                        PrefKey::from_storage_key(&key).map(|k| Preferences::default().encode(k))
                    });
                    if let Some(value) = value {
                        apply_preference(&mut surface, &mut local, &key, &value);
                    }
                }
            }
            on_change(&surface);
        }

        tracing::info!(surface = %kind, pending = inflight.len(), "driver stopped");
        surface
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
