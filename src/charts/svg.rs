//! Minimal vector-graphic description used by the chart primitives.
//!
//! Primitives build an [`Svg`] out of [`Element`]s; tests inspect the elements
//! directly and callers serialize with [`Svg::render`].

use std::fmt::Write as _;
use crate::utils::escape_html as escape;

pub const PLACEHOLDER_TEXT: &str = "No data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
        opacity: f64,
        rx: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: String,
        stroke_width: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: String,
    },
    Path {
        d: String,
        stroke: String,
        stroke_width: f64,
        fill: String,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        size: f64,
        anchor: Anchor,
        fill: String,
    },
}

/// An SVG document
#[derive(Debug, Clone, PartialEq)]
pub struct Svg {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<Element>,
}

impl Svg {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: finite_or(width, 0.0).max(0.0),
            height: finite_or(height, 0.0).max(0.0),
            elements: Vec::new(),
        }
    }

    /// Empty chart carrying a centered "No data" label
    pub fn placeholder(width: f64, height: f64) -> Self {
        let mut svg = Self::new(width, height);
        let (w, h) = (svg.width, svg.height);
        svg.push(Element::Text {
            x: w / 2.0,
            y: h / 2.0,
            content: PLACEHOLDER_TEXT.to_string(),
            size: 12.0,
            anchor: Anchor::Middle,
            fill: "#9ca3af".to_string(),
        });
        svg
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn is_placeholder(&self) -> bool {
        self.elements.iter().any(|e| matches!(e, Element::Text { content, .. } if content == PLACEHOLDER_TEXT))
    }

    pub fn rects(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| matches!(e, Element::Rect { .. }))
    }

    /// True if any numeric attribute is NaN or infinite
    pub fn has_non_finite(&self) -> bool {
        let bad = |v: &f64| !v.is_finite();
        self.elements.iter().any(|e| match e {
            Element::Rect { x, y, width, height, opacity, rx, .. } => {
                [x, y, width, height, opacity, rx].into_iter().any(bad)
            }
            Element::Line { x1, y1, x2, y2, stroke_width, .. } => {
                [x1, y1, x2, y2, stroke_width].into_iter().any(bad)
            }
            Element::Circle { cx, cy, r, .. } => [cx, cy, r].into_iter().any(bad),
            Element::Path { d, stroke_width, .. } => bad(stroke_width) || d.contains("NaN") || d.contains("inf"),
            Element::Text { x, y, size, .. } => [x, y, size].into_iter().any(bad),
        })
    }

    /// Serialize to SVG markup
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = num(self.width),
            h = num(self.height)
        );
        for element in &self.elements {
            let _ = match element {
                Element::Rect { x, y, width, height, fill, opacity, rx } => write!(
                    out,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" fill="{}" fill-opacity="{}"/>"#,
                    num(*x), num(*y), num(*width), num(*height), num(*rx), escape(fill), num(*opacity)
                ),
                Element::Line { x1, y1, x2, y2, stroke, stroke_width } => write!(
                    out,
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"/>"#,
                    num(*x1), num(*y1), num(*x2), num(*y2), escape(stroke), num(*stroke_width)
                ),
                Element::Circle { cx, cy, r, fill } => write!(
                    out,
                    r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
                    num(*cx), num(*cy), num(*r), escape(fill)
                ),
                Element::Path { d, stroke, stroke_width, fill } => write!(
                    out,
                    r#"<path d="{}" stroke="{}" stroke-width="{}" fill="{}" stroke-linecap="round"/>"#,
                    escape(d), escape(stroke), num(*stroke_width), escape(fill)
                ),
                Element::Text { x, y, content, size, anchor, fill } => write!(
                    out,
                    r#"<text x="{}" y="{}" font-size="{}" text-anchor="{}" fill="{}">{}</text>"#,
                    num(*x), num(*y), num(*size), anchor.as_str(), escape(fill), escape(content)
                ),
            };
        }
        out.push_str("</svg>");
        out
    }
}

pub(crate) fn finite_or(v: f64, default: f64) -> f64 {
    if v.is_finite() { v } else { default }
}

/// Format a coordinate with at most two decimals
pub(crate) fn num(v: f64) -> String {
    let v = finite_or(v, 0.0);
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() { "0".to_string() } else { s.to_string() }
}
