use crate::charts::svg::{finite_or, Anchor, Element, Svg, PLACEHOLDER_TEXT};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSegment {
    pub label: String,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub width: f64,
    pub height: f64,
    pub track_color: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            width: 320.0,
            height: 14.0,
            track_color: "#e5e7eb".to_string(),
        }
    }
}

/// Share of the total per segment, in percent. Empty when the total is not positive.
pub fn segment_percentages(segments: &[PipelineSegment]) -> Vec<f64> {
    let values: Vec<f64> = segments.iter().map(|s| finite_or(s.value, 0.0).max(0.0)).collect();
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Vec::new();
    }
    values.iter().map(|v| v / total * 100.0).collect()
}

/// Stacked bar whose segment widths add up to the full width.
/// A zero total renders the empty track with a "No data" label.
pub fn pipeline_bar(segments: &[PipelineSegment], opts: &PipelineOptions) -> Svg {
    let mut svg = Svg::new(opts.width, opts.height);
    let (width, height) = (svg.width, svg.height);
    svg.push(Element::Rect {
        x: 0.0,
        y: 0.0,
        width,
        height,
        fill: opts.track_color.clone(),
        opacity: 1.0,
        rx: height / 2.0,
    });

    let percentages = segment_percentages(segments);
    if percentages.is_empty() {
        svg.push(Element::Text {
            x: width / 2.0,
            y: height * 0.75,
            content: PLACEHOLDER_TEXT.to_string(),
            size: (height * 0.7).max(6.0),
            anchor: Anchor::Middle,
            fill: "#6b7280".to_string(),
        });
        return svg;
    }

    let mut x = 0.0;
    for (segment, pct) in segments.iter().zip(percentages) {
        let w = pct / 100.0 * width;
        if w > 0.0 {
            svg.push(Element::Rect {
                x,
                y: 0.0,
                width: w,
                height,
                fill: segment.color.clone(),
                opacity: 1.0,
                rx: 0.0,
            });
        }
        x += w;
    }
    svg
}
