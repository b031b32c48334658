use std::f64::consts::PI;
use crate::charts::svg::{finite_or, num, Anchor, Element, Svg};

#[derive(Debug, Clone)]
pub struct GaugeOptions {
    /// Canvas width; the arc diameter is `size - stroke_width`
    pub size: f64,
    pub stroke_width: f64,
    pub color: String,
    pub track_color: String,
    pub show_label: bool,
}

impl Default for GaugeOptions {
    fn default() -> Self {
        Self {
            size: 120.0,
            stroke_width: 10.0,
            color: "#22c55e".to_string(),
            track_color: "#e5e7eb".to_string(),
            show_label: true,
        }
    }
}

/// Gauge inputs are percentages; out-of-range values are clamped and NaN reads as 0
pub fn clamp_percent(value: f64) -> f64 {
    finite_or(value, if value == f64::INFINITY { 100.0 } else { 0.0 }).clamp(0.0, 100.0)
}

struct Geometry {
    cx: f64,
    cy: f64,
    r: f64,
}

fn geometry(opts: &GaugeOptions) -> Geometry {
    let size = finite_or(opts.size, 0.0).max(0.0);
    let stroke = finite_or(opts.stroke_width, 0.0).clamp(0.0, size);
    Geometry {
        cx: size / 2.0,
        cy: size / 2.0,
        r: ((size - stroke) / 2.0).max(0.0),
    }
}

/// Point on the arc for a percentage: 0 is the left end, 100 the right end
pub fn gauge_point(value: f64, opts: &GaugeOptions) -> (f64, f64) {
    let g = geometry(opts);
    let theta = PI * (1.0 - clamp_percent(value) / 100.0);
    (g.cx + g.r * theta.cos(), g.cy - g.r * theta.sin())
}

/// Semicircular gauge with a value arc and a dot at the current position
pub fn gauge(value: f64, opts: &GaugeOptions) -> Svg {
    let g = geometry(opts);
    let stroke = finite_or(opts.stroke_width, 0.0).max(0.0);
    let mut svg = Svg::new(g.cx * 2.0, g.cy + stroke / 2.0 + if opts.show_label { 4.0 } else { 0.0 });
    let pct = clamp_percent(value);

    let (sx, sy) = gauge_point(0.0, opts);
    let (ex, ey) = gauge_point(100.0, opts);
    svg.push(Element::Path {
        d: format!("M {} {} A {r} {r} 0 0 1 {} {}", num(sx), num(sy), num(ex), num(ey), r = num(g.r)),
        stroke: opts.track_color.clone(),
        stroke_width: stroke,
        fill: "none".to_string(),
    });

    let (px, py) = gauge_point(pct, opts);
    if pct > 0.0 {
        svg.push(Element::Path {
            d: format!("M {} {} A {r} {r} 0 0 1 {} {}", num(sx), num(sy), num(px), num(py), r = num(g.r)),
            stroke: opts.color.clone(),
            stroke_width: stroke,
            fill: "none".to_string(),
        });
    }
    svg.push(Element::Circle {
        cx: px,
        cy: py,
        r: (stroke / 2.0).max(2.0),
        fill: opts.color.clone(),
    });

    if opts.show_label {
        svg.push(Element::Text {
            x: g.cx,
            y: g.cy,
            content: format!("{}%", pct.round() as i64),
            size: (g.r / 2.5).max(8.0),
            anchor: Anchor::Middle,
            fill: "#111827".to_string(),
        });
    }
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(svg: &Svg) -> (f64, f64) {
        svg.elements
            .iter()
            .find_map(|e| match e {
                Element::Circle { cx, cy, .. } => Some((*cx, *cy)),
                _ => None,
            })
            .unwrap()
    }

    const EPS: f64 = 1e-9;

    #[test]
    fn test_zero_is_arc_start() {
        let opts = GaugeOptions::default();
        let (x, y) = dot(&gauge(0.0, &opts));
        // r = (120 - 10) / 2 = 55, center (60, 60)
        assert!((x - 5.0).abs() < EPS);
        assert!((y - 60.0).abs() < EPS);
    }

    #[test]
    fn test_hundred_is_arc_end() {
        let opts = GaugeOptions::default();
        let (x, y) = dot(&gauge(100.0, &opts));
        assert!((x - 115.0).abs() < EPS);
        assert!((y - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_intermediate_value_between_ends() {
        let opts = GaugeOptions::default();
        let (start_x, _) = gauge_point(0.0, &opts);
        let (end_x, _) = gauge_point(100.0, &opts);
        let (x, y) = dot(&gauge(72.0, &opts));
        assert!(x > start_x && x < end_x);
        // Above the baseline: on the upper half of the circle
        assert!(y < 60.0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let opts = GaugeOptions::default();
        assert_eq!(gauge_point(-20.0, &opts), gauge_point(0.0, &opts));
        assert_eq!(gauge_point(250.0, &opts), gauge_point(100.0, &opts));
        assert_eq!(gauge_point(f64::NAN, &opts), gauge_point(0.0, &opts));
        assert!(!gauge(f64::NAN, &opts).has_non_finite());
    }

    #[test]
    fn test_label_shows_rounded_percent() {
        let svg = gauge(71.6, &GaugeOptions::default());
        assert!(svg.render().contains(">72%<"));
    }
}
