//! Bar renderers: compact barcode strips, labelled column charts and
//! horizontal bar lists.
//!
//! All three normalize against the largest value of the series. A series whose
//! largest value is zero (or negative) is scaled against 1 so every bar
//! renders at zero height; an empty series renders the "No data" placeholder.

use crate::charts::svg::{finite_or, Anchor, Element, Svg};

/// Opacity of bars outside the highlighted tail
pub const DIM_OPACITY: f64 = 0.25;

/// Clamp to finite, non-negative values and return them with the normalizing maximum
pub fn normalize_series(values: &[f64]) -> (Vec<f64>, f64) {
    let clean: Vec<f64> = values.iter().map(|v| finite_or(*v, 0.0).max(0.0)).collect();
    let max = clean.iter().copied().fold(0.0_f64, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };
    (clean, max)
}

/// The last `highlight_last` bars render at full opacity
fn bar_opacity(index: usize, count: usize, highlight_last: usize) -> f64 {
    if index >= count.saturating_sub(highlight_last) {
        1.0
    } else {
        DIM_OPACITY
    }
}

#[derive(Debug, Clone)]
pub struct BarcodeOptions {
    pub width: f64,
    pub height: f64,
    pub gap: f64,
    pub highlight_last: usize,
    pub color: String,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            width: 240.0,
            height: 48.0,
            gap: 2.0,
            highlight_last: 3,
            color: "#3b82f6".to_string(),
        }
    }
}

/// Thin unlabelled bars filling the whole canvas
pub fn barcode_bars(values: &[f64], opts: &BarcodeOptions) -> Svg {
    if values.is_empty() {
        return Svg::placeholder(opts.width, opts.height);
    }
    let mut svg = Svg::new(opts.width, opts.height);
    let (clean, max) = normalize_series(values);
    let n = clean.len();

    let mut gap = finite_or(opts.gap, 0.0).max(0.0);
    if gap * (n as f64 - 1.0) >= svg.width {
        gap = 0.0;
    }
    let bar_width = (svg.width - gap * (n as f64 - 1.0)) / n as f64;

    for (i, value) in clean.iter().enumerate() {
        let height = value / max * svg.height;
        svg.push(Element::Rect {
            x: i as f64 * (bar_width + gap),
            y: svg.height - height,
            width: bar_width,
            height,
            fill: opts.color.clone(),
            opacity: bar_opacity(i, n, opts.highlight_last),
            rx: 0.0,
        });
    }
    svg
}

#[derive(Debug, Clone)]
pub struct BarChartOptions {
    pub width: f64,
    pub height: f64,
    pub gap: f64,
    /// Space reserved under the baseline for labels
    pub label_space: f64,
    pub highlight_last: usize,
    pub color: String,
    pub show_values: bool,
}

impl Default for BarChartOptions {
    fn default() -> Self {
        Self {
            width: 320.0,
            height: 160.0,
            gap: 6.0,
            label_space: 18.0,
            highlight_last: 3,
            color: "#3b82f6".to_string(),
            show_values: true,
        }
    }
}

/// Column chart with a baseline and optional per-bar labels
pub fn svg_bar_chart(values: &[f64], labels: &[String], opts: &BarChartOptions) -> Svg {
    if values.is_empty() {
        return Svg::placeholder(opts.width, opts.height);
    }
    let mut svg = Svg::new(opts.width, opts.height);
    let (clean, max) = normalize_series(values);
    let n = clean.len();

    let label_space = finite_or(opts.label_space, 0.0).clamp(0.0, svg.height);
    // Room above the tallest bar for its value label
    let top = if opts.show_values { 12.0_f64.min(svg.height - label_space) } else { 0.0 };
    let plot_height = (svg.height - label_space - top).max(0.0);
    let baseline = top + plot_height;

    let mut gap = finite_or(opts.gap, 0.0).max(0.0);
    if gap * (n as f64 + 1.0) >= svg.width {
        gap = 0.0;
    }
    let bar_width = (svg.width - gap * (n as f64 + 1.0)) / n as f64;

    svg.push(Element::Line {
        x1: 0.0,
        y1: baseline,
        x2: svg.width,
        y2: baseline,
        stroke: "#d1d5db".to_string(),
        stroke_width: 1.0,
    });

    for (i, value) in clean.iter().enumerate() {
        let height = value / max * plot_height;
        let x = gap + i as f64 * (bar_width + gap);
        let center = x + bar_width / 2.0;
        svg.push(Element::Rect {
            x,
            y: baseline - height,
            width: bar_width,
            height,
            fill: opts.color.clone(),
            opacity: bar_opacity(i, n, opts.highlight_last),
            rx: 2.0,
        });
        if opts.show_values {
            svg.push(Element::Text {
                x: center,
                y: baseline - height - 3.0,
                content: format_value(values[i]),
                size: 9.0,
                anchor: Anchor::Middle,
                fill: "#374151".to_string(),
            });
        }
        if let Some(label) = labels.get(i) {
            if label_space > 0.0 {
                svg.push(Element::Text {
                    x: center,
                    y: baseline + label_space - 5.0,
                    content: label.clone(),
                    size: 9.0,
                    anchor: Anchor::Middle,
                    fill: "#6b7280".to_string(),
                });
            }
        }
    }
    svg
}

#[derive(Debug, Clone)]
pub struct HorizontalBarOptions {
    pub width: f64,
    pub row_height: f64,
    pub gap: f64,
    pub label_width: f64,
    /// Space right of the bars for the value label
    pub value_width: f64,
    pub color: String,
}

impl Default for HorizontalBarOptions {
    fn default() -> Self {
        Self {
            width: 360.0,
            row_height: 16.0,
            gap: 6.0,
            label_width: 120.0,
            value_width: 60.0,
            color: "#06b6d4".to_string(),
        }
    }
}

/// One labelled horizontal bar per item, widths relative to the largest value
pub fn svg_horizontal_bar(items: &[(String, f64)], opts: &HorizontalBarOptions) -> Svg {
    let row_height = finite_or(opts.row_height, 0.0).max(1.0);
    let gap = finite_or(opts.gap, 0.0).max(0.0);
    if items.is_empty() {
        return Svg::placeholder(opts.width, row_height + 2.0 * gap);
    }
    let height = items.len() as f64 * (row_height + gap) + gap;
    let mut svg = Svg::new(opts.width, height);

    let values: Vec<f64> = items.iter().map(|(_, v)| *v).collect();
    let (clean, max) = normalize_series(&values);
    let label_width = finite_or(opts.label_width, 0.0).clamp(0.0, svg.width);
    let value_width = finite_or(opts.value_width, 0.0).clamp(0.0, svg.width - label_width);
    let track = (svg.width - label_width - value_width).max(0.0);

    for (i, ((label, raw), value)) in items.iter().zip(clean.iter()).enumerate() {
        let y = gap + i as f64 * (row_height + gap);
        let bar_width = value / max * track;
        svg.push(Element::Text {
            x: label_width - 6.0,
            y: y + row_height * 0.75,
            content: label.clone(),
            size: 10.0,
            anchor: Anchor::End,
            fill: "#374151".to_string(),
        });
        svg.push(Element::Rect {
            x: label_width,
            y,
            width: bar_width,
            height: row_height,
            fill: opts.color.clone(),
            opacity: 1.0,
            rx: 3.0,
        });
        svg.push(Element::Text {
            x: label_width + bar_width + 4.0,
            y: y + row_height * 0.75,
            content: format_value(*raw),
            size: 10.0,
            anchor: Anchor::Start,
            fill: "#6b7280".to_string(),
        });
    }
    svg
}

/// Compact value label: 1234 -> "1,234", 1500000 -> "1.5M"
pub fn format_value(v: f64) -> String {
    let v = finite_or(v, 0.0);
    let abs = v.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if abs >= 10_000.0 {
        format!("{:.0}k", v / 1_000.0)
    } else if v.fract() == 0.0 {
        group_thousands(v as i64)
    } else {
        format!("{:.2}", v)
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}
