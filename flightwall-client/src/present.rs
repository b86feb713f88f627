//! Terminal and PNG presenters.

use std::path::{Path, PathBuf};

use comfy_table::{Cell, Table};

use flightwall_core::chart::ChartFrame;
use flightwall_core::config::DisplayConfig;
use flightwall_core::history::Channel;
use flightwall_core::marker::{Marker, MarkerIcon};
use flightwall_core::raster::PixmapCanvas;
use flightwall_core::surface::ticker::{progress_bar, TickerView};
use flightwall_core::surface::{DetailSurface, MapSurface, Surface};
use flightwall_core::types::{Icao24, Result};

const PROGRESS_WIDTH: usize = 16;

fn icon_text(marker: &Marker) -> String {
    let flag = match marker.icon {
        MarkerIcon::Airborne => ' ',
        MarkerIcon::OnGround => 'g',
        MarkerIcon::Anomaly => '!',
    };
    let select = if marker.highlighted { '*' } else { ' ' };
    format!("{select}{}{flag}", marker.arrow)
}

fn range_text(marker: &Marker) -> &'static str {
    match marker.in_range {
        Some(true) => "in",
        Some(false) => "out",
        None => "-",
    }
}

/// One row per marker, nearest first.
pub fn map_table(surface: &MapSurface) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "", "ICAO", "Callsign", "Operator", "Type", "Route", "Alt", "Speed", "Hdg", "V/S", "Dist",
        "Range",
    ]);

    for (snap, marker) in surface.markers_by_distance() {
        let label = &marker.label;
        table.add_row(vec![
            Cell::new(icon_text(marker)),
            Cell::new(snap.icao24),
            Cell::new(&label.callsign),
            Cell::new(&label.operator),
            Cell::new(&label.aircraft),
            Cell::new(&label.route),
            Cell::new(&label.altitude),
            Cell::new(&label.speed),
            Cell::new(&label.heading),
            Cell::new(&label.vertical_rate),
            Cell::new(&label.distance),
            Cell::new(range_text(marker)),
        ]);
    }
    table
}

pub fn map_status(surface: &MapSurface) -> String {
    let mut line = format!("{} aircraft | {}", surface.count(), surface.status().label());
    if let Some(range) = surface.range() {
        line.push_str(&format!(" | range {:.0} nm", range.radius_nm));
    }
    if let Some(id) = surface.selected() {
        line.push_str(&format!(
            " | selected {id} ({} samples)",
            surface.history().buffer().len()
        ));
    }
    line
}

/// Single status line for the ticker.
pub fn ticker_line(view: &TickerView) -> String {
    let bar = progress_bar(view.progress, PROGRESS_WIDTH);
    let Some(label) = &view.label else {
        return format!("[{}] no flights in range  {bar}  {}", view.position, view.status);
    };
    let mut parts = vec![
        format!("[{}]", view.position),
        label.callsign.clone(),
        label.operator.clone(),
        label.aircraft.clone(),
        label.route.clone(),
        label.altitude.clone(),
        label.speed.clone(),
    ];
    if let Some(eta) = &view.eta {
        parts.push(eta.clone());
    }
    parts.push(bar);
    parts.push(view.status.clone());
    parts.join("  ")
}

/// Field/value table for the detail surface.
pub fn detail_table(surface: &DetailSurface) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec![Cell::new("ICAO"), Cell::new(surface.icao24())]);

    if let Some(label) = surface.label() {
        let rows = [
            ("Callsign", &label.callsign),
            ("Flight", &label.flight),
            ("Operator", &label.operator),
            ("Aircraft", &label.aircraft),
            ("Route", &label.route),
            ("Altitude", &label.altitude),
            ("Flight level", &label.flight_level),
            ("Speed", &label.speed),
            ("Heading", &label.heading),
            ("Vertical rate", &label.vertical_rate),
            ("Distance", &label.distance),
            ("Phase", &label.phase),
        ];
        for (name, value) in rows {
            table.add_row(vec![Cell::new(name), Cell::new(value)]);
        }
    }

    if surface.is_anomaly() {
        let reasons = surface.anomaly_reasons();
        let text = if reasons.is_empty() {
            "flagged".to_string()
        } else {
            reasons.join("; ")
        };
        table.add_row(vec![Cell::new("Anomaly"), Cell::new(text)]);
    }
    table.add_row(vec![
        Cell::new("History"),
        Cell::new(format!("{} samples", surface.history().buffer().len())),
    ]);
    table.add_row(vec![Cell::new("Status"), Cell::new(surface.status().label())]);
    table
}

/// Logical chart size and device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl From<&DisplayConfig> for ChartSize {
    fn from(display: &DisplayConfig) -> Self {
        ChartSize {
            width: display.chart_width,
            height: display.chart_height,
            pixel_ratio: display.pixel_ratio,
        }
    }
}

pub fn chart_path(dir: &Path, icao24: Icao24, channel: Channel) -> PathBuf {
    dir.join(format!("{icao24}-{}.png", channel.name()))
}

/// Rewrites a detail surface's PNGs whenever its history changes.
#[derive(Debug, Clone)]
pub struct ChartWriter {
    dir: PathBuf,
    size: ChartSize,
    written: Option<u64>,
}

impl ChartWriter {
    pub fn new(dir: PathBuf, size: ChartSize) -> Self {
        ChartWriter {
            dir,
            size,
            written: None,
        }
    }

    /// Write the charts if the history moved since the last write.
    /// Returns `None` when nothing changed.
    pub fn refresh(&mut self, detail: &DetailSurface) -> Result<Option<Vec<PathBuf>>> {
        let revision = detail.history().revision();
        if self.written == Some(revision) {
            return Ok(None);
        }
        let paths = write_charts(&self.dir, detail.icao24(), self.size, |canvas, channel| {
            detail.chart(canvas, channel)
        })?;
        self.written = Some(revision);
        Ok(Some(paths))
    }
}

/// Render every channel through `render` and save the ones that drew.
/// Channels with fewer than two samples are skipped.
pub fn write_charts<F>(dir: &Path, icao24: Icao24, size: ChartSize, mut render: F) -> Result<Vec<PathBuf>>
where
    F: FnMut(&mut PixmapCanvas, Channel) -> Option<ChartFrame>,
{
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for channel in Channel::ALL {
        let mut canvas = PixmapCanvas::new(size.width, size.height, size.pixel_ratio)?;
        if render(&mut canvas, channel).is_none() {
            tracing::debug!(icao = %icao24, channel = channel.name(), "not enough samples to chart");
            continue;
        }
        let path = chart_path(dir, icao24, channel);
        canvas.save_png(&path)?;
        written.push(path);
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
