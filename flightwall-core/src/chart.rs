//! Time-series chart rendering.
//!
//! A chart is drawn onto anything implementing [`Canvas`]. Coordinates are in
//! logical pixels; backends scale by their device pixel ratio. Every call to
//! [`render`] clears the whole surface and draws it again from scratch.
//!
//! Value domains depend on the channel:
//!
//! - altitude and speed start at zero
//! - vertical rate is symmetric around zero with a half-range of at least 500
//! - everything else scales to the observed min/max

use serde::Serialize;

use crate::format;
use crate::history::Channel;
use crate::prefs::Preferences;

/// Number of horizontal reference lines.
pub const TICK_COUNT: usize = 4;

/// Smallest half-range of a symmetric (vertical rate) domain.
pub const SYMMETRIC_FLOOR: f64 = 500.0;

// ---------------------------------------------------------------------------
// Drawing primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Rgba { a, ..self }
    }
}

/// Raster target for charts.
pub trait Canvas {
    /// Logical width and height.
    fn size(&self) -> (f32, f32);

    fn clear(&mut self, color: Rgba);

    fn line(&mut self, from: Point, to: Point, color: Rgba, width: f32);

    fn polyline(&mut self, points: &[Point], color: Rgba, width: f32);

    /// Fill a closed polygon.
    fn fill_polygon(&mut self, points: &[Point], color: Rgba);

    fn circle(&mut self, center: Point, radius: f32, color: Rgba);

    /// Draw a text label with its left edge at `at.x`, vertically centred on `at.y`.
    fn text(&mut self, at: Point, text: &str, color: Rgba);
}

// ---------------------------------------------------------------------------
// Domain policy
// ---------------------------------------------------------------------------

/// How a channel's value domain is derived from its samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DomainPolicy {
    /// Minimum pinned to zero.
    ZeroBased,
    /// Centred on zero, half-range at least `floor`.
    Symmetric { floor: f64 },
    /// Observed min/max.
    Tight,
}

impl DomainPolicy {
    pub fn for_channel(channel: Channel) -> Self {
        match channel {
            Channel::Altitude | Channel::Speed => DomainPolicy::ZeroBased,
            Channel::VerticalRate => DomainPolicy::Symmetric {
                floor: SYMMETRIC_FLOOR,
            },
            Channel::Heading => DomainPolicy::Tight,
        }
    }
}

/// Value domain of a rendered chart. `range` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

impl Domain {
    fn new(min: f64, max: f64) -> Self {
        let range = max - min;
        Domain {
            min,
            max,
            range: if range > 0.0 { range } else { 1.0 },
        }
    }

    /// Compute the domain for `values` under `policy`. `None` if there are no values.
    pub fn compute(policy: DomainPolicy, values: &[f64]) -> Option<Self> {
        let (lo, hi) = values.iter().fold(None, |acc: Option<(f64, f64)>, &v| {
            Some(match acc {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            })
        })?;
        Some(match policy {
            DomainPolicy::ZeroBased => Domain::new(0.0, hi.max(0.0)),
            DomainPolicy::Symmetric { floor } => {
                let half = lo.abs().max(hi.abs()).max(floor);
                Domain::new(-half, half)
            }
            DomainPolicy::Tight => Domain::new(lo, hi),
        })
    }

    /// Reference line values, top to bottom: `max - range * i / 4`.
    pub fn ticks(&self) -> [f64; TICK_COUNT] {
        std::array::from_fn(|i| self.max - self.range * i as f64 / TICK_COUNT as f64)
    }
}

// ---------------------------------------------------------------------------
// Style and layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub background: Rgba,
    pub grid: Rgba,
    pub label: Rgba,
    pub line: Rgba,
    /// Alpha of the area fill under the line.
    pub fill_alpha: u8,
    pub marker: Rgba,
    pub line_width: f32,
    pub marker_radius: f32,
    /// Left gutter reserved for tick labels.
    pub gutter: f32,
    pub padding: f32,
}

impl ChartStyle {
    pub fn for_channel(channel: Channel) -> Self {
        let line = match channel {
            Channel::Altitude => Rgba::rgb(0x4f, 0xa3, 0xf7),
            Channel::Speed => Rgba::rgb(0x4c, 0xd9, 0x7b),
            Channel::Heading => Rgba::rgb(0xf5, 0xb9, 0x42),
            Channel::VerticalRate => Rgba::rgb(0xb3, 0x7f, 0xeb),
        };
        ChartStyle {
            background: Rgba::rgb(0x10, 0x14, 0x1c),
            grid: Rgba::rgb(0xff, 0xff, 0xff).with_alpha(0x1a),
            label: Rgba::rgb(0x8a, 0x94, 0xa6),
            line,
            fill_alpha: 0x33,
            marker: Rgba::rgb(0xff, 0xff, 0xff),
            line_width: 2.0,
            marker_radius: 4.0,
            gutter: 56.0,
            padding: 8.0,
        }
    }
}

/// One labelled reference line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value: f64,
    pub label: String,
    pub y: f32,
}

/// What a render call produced; useful to presenters and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    pub channel: &'static str,
    pub domain: Domain,
    pub ticks: Vec<Tick>,
    pub points: Vec<Point>,
    /// Formatted most recent value.
    pub current: String,
}

struct Plot {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

impl Plot {
    fn new(size: (f32, f32), style: &ChartStyle) -> Self {
        let left = style.gutter;
        let top = style.padding;
        Plot {
            left,
            top,
            width: (size.0 - left - style.padding).max(1.0),
            height: (size.1 - top - style.padding).max(1.0),
        }
    }

    fn y(&self, value: f64, domain: &Domain) -> f32 {
        let t = ((value - domain.min) / domain.range) as f32;
        self.top + self.height - t * self.height
    }

    fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a channel's slots (stored units) onto `canvas`.
///
/// Slot `i` is drawn at `i / (len - 1)` of the plot width whether or not its
/// neighbours are present, so charts of different channels share an x axis.
/// Fewer than two present samples draws nothing and returns `None`, leaving
/// whatever is on the canvas untouched. Non-finite samples count as absent.
pub fn render<C: Canvas + ?Sized>(
    canvas: &mut C,
    samples: &[Option<f64>],
    channel: Channel,
    prefs: &Preferences,
    style: &ChartStyle,
) -> Option<ChartFrame> {
    let slots: Vec<Option<f64>> = samples
        .iter()
        .map(|v| {
            v.filter(|v| v.is_finite())
                .map(|v| format::to_display(channel, v, prefs))
        })
        .collect();
    let values: Vec<f64> = slots.iter().flatten().copied().collect();
    if values.len() < 2 {
        return None;
    }
    let domain = Domain::compute(DomainPolicy::for_channel(channel), &values)?;
    let plot = Plot::new(canvas.size(), style);

    canvas.clear(style.background);

    let ticks: Vec<Tick> = domain
        .ticks()
        .into_iter()
        .map(|value| Tick {
            value,
            label: format::format_display(channel, value, prefs),
            y: plot.y(value, &domain),
        })
        .collect();
    for tick in &ticks {
        canvas.line(
            Point::new(plot.left, tick.y),
            Point::new(plot.left + plot.width, tick.y),
            style.grid,
            1.0,
        );
        canvas.text(Point::new(style.padding, tick.y), &tick.label, style.label);
    }

    let last = (slots.len() - 1) as f32;
    let points: Vec<Point> = slots
        .iter()
        .enumerate()
        .filter_map(|(i, v)| {
            v.map(|v| {
                Point::new(
                    plot.left + i as f32 / last * plot.width,
                    plot.y(v, &domain),
                )
            })
        })
        .collect();

    let mut area = points.clone();
    if let (Some(first), Some(end)) = (points.first(), points.last()) {
        area.push(Point::new(end.x, plot.bottom()));
        area.push(Point::new(first.x, plot.bottom()));
    }
    canvas.fill_polygon(&area, style.line.with_alpha(style.fill_alpha));
    canvas.polyline(&points, style.line, style.line_width);

    let current = values[values.len() - 1];
    if let Some(tip) = points.last() {
        canvas.circle(*tip, style.marker_radius, style.marker);
        canvas.circle(*tip, style.marker_radius * 0.5, style.line);
    }

    Some(ChartFrame {
        channel: channel.name(),
        domain,
        ticks,
        points,
        current: format::format_display(channel, current, prefs),
    })
}

// ---------------------------------------------------------------------------
// Recording canvas
// ---------------------------------------------------------------------------

/// A drawing call captured by [`RecordingCanvas`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Rgba),
    Line(Point, Point, Rgba),
    Polyline(Vec<Point>, Rgba),
    Fill(Vec<Point>, Rgba),
    Circle(Point, f32, Rgba),
    Text(Point, String),
}

/// Canvas that records calls instead of rasterizing them.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    pub width: f32,
    pub height: f32,
    pub ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        RecordingCanvas {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text(_, s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgba) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear(color));
    }

    fn line(&mut self, from: Point, to: Point, color: Rgba, _width: f32) {
        self.ops.push(DrawOp::Line(from, to, color));
    }

    fn polyline(&mut self, points: &[Point], color: Rgba, _width: f32) {
        self.ops.push(DrawOp::Polyline(points.to_vec(), color));
    }

    fn fill_polygon(&mut self, points: &[Point], color: Rgba) {
        self.ops.push(DrawOp::Fill(points.to_vec(), color));
    }

    fn circle(&mut self, center: Point, radius: f32, color: Rgba) {
        self.ops.push(DrawOp::Circle(center, radius, color));
    }

    fn text(&mut self, at: Point, text: &str, _color: Rgba) {
        self.ops.push(DrawOp::Text(at, text.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
