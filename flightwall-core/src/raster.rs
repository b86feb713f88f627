//! tiny-skia backend for [`Canvas`].
//!
//! The pixmap is allocated at `logical size * pixel_ratio` and every draw call
//! is scaled by the ratio, so one logical pixel maps to whole device pixels
//! and strokes stay sharp on dense displays. Text is not rasterized; labels
//! are kept in [`PixmapCanvas::labels`] for the presenter to overlay.

use std::path::Path;

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::chart::{Canvas, Point, Rgba};
use crate::types::{FlightwallError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub at: Point,
    pub text: String,
}

pub struct PixmapCanvas {
    pixmap: Pixmap,
    width: f32,
    height: f32,
    pixel_ratio: f32,
    labels: Vec<Label>,
}

impl PixmapCanvas {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Result<Self> {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        let device_w = (width as f32 * pixel_ratio).round() as u32;
        let device_h = (height as f32 * pixel_ratio).round() as u32;
        let pixmap = Pixmap::new(device_w, device_h).ok_or_else(|| {
            FlightwallError::Render(format!("cannot allocate {device_w}x{device_h} pixmap"))
        })?;
        Ok(PixmapCanvas {
            pixmap,
            width: width as f32,
            height: height as f32,
            pixel_ratio,
            labels: Vec::new(),
        })
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Device-pixel dimensions.
    pub fn device_size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| FlightwallError::Render(e.to_string()))
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.encode_png()?)?;
        Ok(())
    }

    fn transform(&self) -> Transform {
        Transform::from_scale(self.pixel_ratio, self.pixel_ratio)
    }

    fn paint(color: Rgba) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;
        paint
    }

    fn path(points: &[Point], close: bool) -> Option<tiny_skia::Path> {
        let (first, rest) = points.split_first()?;
        let mut pb = PathBuilder::new();
        pb.move_to(first.x, first.y);
        for p in rest {
            pb.line_to(p.x, p.y);
        }
        if close {
            pb.close();
        }
        pb.finish()
    }

    fn stroke(&mut self, points: &[Point], color: Rgba, width: f32) {
        if let Some(path) = Self::path(points, false) {
            let stroke = Stroke {
                width,
                ..Stroke::default()
            };
            let transform = self.transform();
            self.pixmap
                .stroke_path(&path, &Self::paint(color), &stroke, transform, None);
        }
    }
}

impl Canvas for PixmapCanvas {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgba) {
        self.pixmap.fill(tiny_skia::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        self.labels.clear();
    }

    fn line(&mut self, from: Point, to: Point, color: Rgba, width: f32) {
        self.stroke(&[from, to], color, width);
    }

    fn polyline(&mut self, points: &[Point], color: Rgba, width: f32) {
        self.stroke(points, color, width);
    }

    fn fill_polygon(&mut self, points: &[Point], color: Rgba) {
        if let Some(path) = Self::path(points, true) {
            let transform = self.transform();
            self.pixmap.fill_path(
                &path,
                &Self::paint(color),
                FillRule::Winding,
                transform,
                None,
            );
        }
    }

    fn circle(&mut self, center: Point, radius: f32, color: Rgba) {
        if let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) {
            let transform = self.transform();
            self.pixmap.fill_path(
                &path,
                &Self::paint(color),
                FillRule::Winding,
                transform,
                None,
            );
        }
    }

    fn text(&mut self, at: Point, text: &str, _color: Rgba) {
        self.labels.push(Label {
            at,
            text: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{render, ChartStyle};
    use crate::history::Channel;
    use crate::prefs::Preferences;

    #[test]
    fn test_device_pixel_ratio() {
        let canvas = PixmapCanvas::new(320, 120, 2.0).unwrap();
        assert_eq!(canvas.size(), (320.0, 120.0));
        assert_eq!(canvas.device_size(), (640, 240));

        let canvas = PixmapCanvas::new(10, 10, f32::NAN).unwrap();
        assert_eq!(canvas.pixel_ratio(), 1.0);
    }

    #[test]
    fn test_zero_size_is_error() {
        assert!(PixmapCanvas::new(0, 10, 1.0).is_err());
    }

    #[test]
    fn test_render_to_png() {
        let mut canvas = PixmapCanvas::new(200, 80, 1.5).unwrap();
        let style = ChartStyle::for_channel(Channel::Altitude);
        let frame = render(
            &mut canvas,
            &[Some(1000.0), Some(3000.0), Some(2500.0)],
            Channel::Altitude,
            &Preferences::default(),
            &style,
        )
        .unwrap();
        assert_eq!(canvas.labels().len(), frame.ticks.len());

        // background is opaque after a render
        let px = canvas.pixmap().pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 255);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alt.png");
        canvas.save_png(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
