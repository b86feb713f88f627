//! Presentation surfaces as event-driven state machines.
//!
//! A surface never performs I/O. It asks for data by returning [`Request`]s
//! and is told about results through [`Surface::on_response`] and
//! [`Surface::on_request_failed`]. Timers are declared by the surface and run
//! by whoever drives it, normally on a [`VirtualScheduler`].
//!
//! [`VirtualScheduler`]: crate::scheduler::VirtualScheduler

pub mod detail;
pub mod map;
pub mod ticker;

use std::time::Duration;

use crate::chart::{self, Canvas, ChartFrame, ChartStyle};
use crate::controls::SurfaceKind;
use crate::history::{Channel, HistoryBuffer, RequestTag};
use crate::model::{DetailResponse, HistoryResponse, RotationResponse, SnapshotResponse};
use crate::prefs::Preferences;
use crate::types::{ConnectionStatus, FlightwallError, Icao24};

pub use detail::DetailSurface;
pub use map::MapSurface;
pub use ticker::TickerSurface;

/// Logical timers a surface may run while visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    Poll,
    Progress,
}

/// Data a surface wants fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Snapshot,
    Detail(Icao24),
    History { tag: RequestTag, minutes: u32 },
    Rotation {
        max_distance_km: f64,
        rotation_secs: u64,
    },
}

impl Request {
    pub fn describe(&self) -> String {
        match self {
            Request::Snapshot => "snapshot".into(),
            Request::Detail(id) => format!("detail {id}"),
            Request::History { tag, minutes } => format!("history {} ({minutes} min)", tag.icao24),
            Request::Rotation { .. } => "rotation".into(),
        }
    }
}

/// A completed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Snapshot(SnapshotResponse),
    Detail(Box<DetailResponse>),
    History {
        tag: RequestTag,
        response: HistoryResponse,
    },
    Rotation(RotationResponse),
}

impl Response {
    fn query_time_ms(&self) -> Option<f64> {
        match self {
            Response::Snapshot(r) => r.query_time_ms,
            Response::Detail(r) => r.query_time_ms,
            Response::History { response, .. } => response.query_time_ms,
            Response::Rotation(r) => r.query_time_ms,
        }
    }
}

/// Direct interaction with a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Select(Option<Icao24>),
}

pub trait Surface {
    fn kind(&self) -> SurfaceKind;

    /// Timers to run while the surface is visible.
    fn timers(&self) -> Vec<(TimerKey, Duration)>;

    /// A timer fired. `elapsed` is the timer's period.
    fn on_timer(&mut self, key: TimerKey, elapsed: Duration) -> Vec<Request>;

    fn on_input(&mut self, input: Input) -> Vec<Request>;

    /// Apply a response. `now` is the wall-clock time in Unix seconds, used to
    /// timestamp live history samples.
    fn on_response(&mut self, response: Response, now: f64) -> Vec<Request>;

    /// The request failed. Only the connection indicator changes; the next
    /// poll is the retry.
    fn on_request_failed(&mut self, request: &Request, error: &FlightwallError);

    /// Preferences changed (locally or on another surface).
    fn on_preferences(&mut self, prefs: &Preferences);

    /// Returns the requests to issue immediately when becoming visible.
    fn set_visible(&mut self, visible: bool) -> Vec<Request>;

    fn is_visible(&self) -> bool;

    fn status(&self) -> &ConnectionStatus;
}

/// Record a response's outcome on a connection indicator.
pub(crate) fn note_success(status: &mut ConnectionStatus, response: &Response) {
    status.succeed(response.query_time_ms());
}

pub(crate) fn note_failure(
    status: &mut ConnectionStatus,
    kind: SurfaceKind,
    request: &Request,
    error: &FlightwallError,
) {
    status.fail(error.to_string());
    tracing::warn!(surface = %kind, request = %request.describe(), error = %error, "request failed");
}

/// Render one history channel with the channel's default style.
pub fn render_history<C: Canvas + ?Sized>(
    canvas: &mut C,
    buffer: &HistoryBuffer,
    channel: Channel,
    prefs: &Preferences,
) -> Option<ChartFrame> {
    chart::render(
        canvas,
        &buffer.slots(channel),
        channel,
        prefs,
        &ChartStyle::for_channel(channel),
    )
}
