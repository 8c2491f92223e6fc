//! Cubic connector curves between ports.

use serde::Serialize;

use super::config::LayoutConfig;
use super::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CubicPath {
    pub from: Point,
    pub c1: Point,
    pub c2: Point,
    pub to: Point,
}

impl CubicPath {
    /// Curve from `from` to `to`. Control points pull along the dominant axis
    /// of the span, by `span × curvature` capped at `max_curve_offset`.
    pub fn between(from: Point, to: Point, config: &LayoutConfig) -> Self {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx.abs() >= dy.abs() {
            let pull = (dx.abs() * config.curvature).min(config.max_curve_offset);
            CubicPath {
                from,
                c1: Point::new(from.x + pull, from.y),
                c2: Point::new(to.x - pull, to.y),
                to,
            }
        } else {
            let pull = (dy.abs() * config.curvature).min(config.max_curve_offset);
            let dir = dy.signum();
            CubicPath {
                from,
                c1: Point::new(from.x, from.y + pull * dir),
                c2: Point::new(to.x, to.y - pull * dir),
                to,
            }
        }
    }

    pub fn to_svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.from.x, self.from.y, self.c1.x, self.c1.y, self.c2.x, self.c2.y, self.to.x, self.to.y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_span_pulls_sideways() {
        let config = LayoutConfig::default();
        let path = CubicPath::between(Point::new(0.0, 0.0), Point::new(100.0, 10.0), &config);
        assert_eq!(path.c1, Point::new(50.0, 0.0));
        assert_eq!(path.c2, Point::new(50.0, 10.0));
    }

    #[test]
    fn vertical_span_pulls_down() {
        let config = LayoutConfig::default();
        let path = CubicPath::between(Point::new(0.0, 0.0), Point::new(10.0, 100.0), &config);
        assert_eq!(path.c1, Point::new(0.0, 50.0));
        assert_eq!(path.c2, Point::new(10.0, 50.0));
    }

    #[test]
    fn offset_is_capped() {
        let config = LayoutConfig::default();
        let path = CubicPath::between(Point::new(0.0, 0.0), Point::new(1000.0, 0.0), &config);
        assert_eq!(path.c1.x, 120.0);
        assert_eq!(path.c2.x, 880.0);
    }

    #[test]
    fn svg_path_format() {
        let config = LayoutConfig::default();
        let path = CubicPath::between(Point::new(0.0, 0.0), Point::new(100.0, 0.0), &config);
        assert_eq!(path.to_svg_path(), "M 0 0 C 50 0, 50 0, 100 0");
    }
}
