//! Screen ↔ canvas transform: `screen = canvas × zoom + pan`.

use serde::{Deserialize, Serialize};

use super::config::LayoutConfig;
use super::types::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pan: Point,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            pan: Point::default(),
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn screen_to_canvas(&self, p: Point) -> Point {
        Point::new((p.x - self.pan.x) / self.zoom, (p.y - self.pan.y) / self.zoom)
    }

    pub fn canvas_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.pan.x, p.y * self.zoom + self.pan.y)
    }

    pub fn set_zoom(&mut self, zoom: f64, config: &LayoutConfig) {
        self.zoom = config.clamp_zoom(zoom);
    }

    /// Scale by `factor` keeping the canvas point under `anchor` (a screen
    /// point) where it is.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64, config: &LayoutConfig) {
        let fixed = self.screen_to_canvas(anchor);
        self.set_zoom(self.zoom * factor, config);
        self.pan = Point::new(anchor.x - fixed.x * self.zoom, anchor.y - fixed.y * self.zoom);
    }

    pub fn pan_by(&mut self, delta: Point) {
        self.pan = self.pan.offset(delta);
    }

    /// Zoom and pan so `bounds` fills a `width × height` screen, centered.
    pub fn fit(bounds: Rect, width: f64, height: f64, config: &LayoutConfig) -> Self {
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return Viewport::default();
        }
        let zoom = config.clamp_zoom((width / bounds.width).min(height / bounds.height));
        let pan = Point::new(
            (width - bounds.width * zoom) / 2.0 - bounds.x * zoom,
            (height - bounds.height * zoom) / 2.0 - bounds.y * zoom,
        );
        Viewport { pan, zoom }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_are_inverse() {
        let vp = Viewport {
            pan: Point::new(30.0, -20.0),
            zoom: 2.0,
        };
        let p = Point::new(15.0, 40.0);
        assert_eq!(vp.screen_to_canvas(vp.canvas_to_screen(p)), p);
        assert_eq!(vp.canvas_to_screen(p), Point::new(60.0, 60.0));
    }

    #[test]
    fn zoom_is_clamped() {
        let config = LayoutConfig::default();
        let mut vp = Viewport::default();
        vp.set_zoom(10.0, &config);
        assert_eq!(vp.zoom, 2.5);
        vp.set_zoom(0.01, &config);
        assert_eq!(vp.zoom, 0.2);
    }

    #[test]
    fn zoom_at_keeps_anchor_fixed() {
        let config = LayoutConfig::default();
        let mut vp = Viewport::default();
        let anchor = Point::new(100.0, 50.0);
        let before = vp.screen_to_canvas(anchor);
        vp.zoom_at(anchor, 2.0, &config);
        assert_eq!(vp.zoom, 2.0);
        assert_eq!(vp.screen_to_canvas(anchor), before);
    }

    #[test]
    fn fit_centers_bounds() {
        let config = LayoutConfig::default();
        let vp = Viewport::fit(Rect::new(0.0, 0.0, 200.0, 100.0), 400.0, 400.0, &config);
        assert_eq!(vp.zoom, 2.0);
        assert_eq!(vp.pan, Point::new(0.0, 100.0));
    }
}
