use chrono::{Local, TimeZone};
use serde::Serialize;
use crate::charts::svg::{finite_or, Anchor, Element, Svg};

/// One open/high/low/close period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub label: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close].iter().all(|v| v.is_finite())
    }

    /// High/low widened to contain open and close
    fn bounds(&self) -> (f64, f64) {
        let high = self.high.max(self.open).max(self.close);
        let low = self.low.min(self.open).min(self.close);
        (low, high)
    }

    pub fn is_rising(&self) -> bool {
        self.close >= self.open
    }
}

#[derive(Debug, Clone)]
pub struct CandleOptions {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub gap: f64,
    pub up_color: String,
    pub down_color: String,
}

impl Default for CandleOptions {
    fn default() -> Self {
        Self {
            width: 320.0,
            height: 160.0,
            padding: 8.0,
            gap: 4.0,
            up_color: "#22c55e".to_string(),
            down_color: "#ef4444".to_string(),
        }
    }
}

/// Candlestick chart scaled to the series' low/high range
pub fn candle_chart(candles: &[Candle], opts: &CandleOptions) -> Svg {
    let valid: Vec<&Candle> = candles.iter().filter(|c| c.is_finite()).collect();
    if valid.is_empty() {
        return Svg::placeholder(opts.width, opts.height);
    }
    let mut svg = Svg::new(opts.width, opts.height);

    let (min, max) = valid.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
        let (l, h) = c.bounds();
        (lo.min(l), hi.max(h))
    });
    let span = if max - min > 0.0 { max - min } else { 1.0 };
    let pad = finite_or(opts.padding, 0.0).clamp(0.0, svg.height / 2.0);
    let plot = svg.height - 2.0 * pad;
    let y = |v: f64| pad + (max - v) / span * plot;

    let n = valid.len() as f64;
    let mut gap = finite_or(opts.gap, 0.0).max(0.0);
    if gap * (n + 1.0) >= svg.width {
        gap = 0.0;
    }
    let body_width = (svg.width - gap * (n + 1.0)) / n;

    for (i, candle) in valid.iter().enumerate() {
        let (low, high) = candle.bounds();
        let x = gap + i as f64 * (body_width + gap);
        let center = x + body_width / 2.0;
        let color = if candle.is_rising() { &opts.up_color } else { &opts.down_color };

        svg.push(Element::Line {
            x1: center,
            y1: y(high),
            x2: center,
            y2: y(low),
            stroke: color.clone(),
            stroke_width: 1.0,
        });
        let top = y(candle.open.max(candle.close));
        let bottom = y(candle.open.min(candle.close));
        svg.push(Element::Rect {
            x,
            y: top,
            width: body_width,
            height: (bottom - top).max(1.0),
            fill: color.clone(),
            opacity: 1.0,
            rx: 0.0,
        });
    }

    if let (Some(first), Some(last)) = (valid.first(), valid.last()) {
        for (candle, anchor, x) in [(first, Anchor::Start, 0.0), (last, Anchor::End, svg.width)] {
            if !candle.label.is_empty() {
                svg.push(Element::Text {
                    x,
                    y: svg.height - 1.0,
                    content: candle.label.clone(),
                    size: 8.0,
                    anchor,
                    fill: "#6b7280".to_string(),
                });
            }
        }
    }
    svg
}

/// Group timestamped observations into one candle per local calendar day
pub fn daily_candles(observations: &[(i64, f64)]) -> Vec<Candle> {
    let mut sorted: Vec<(i64, f64)> = observations
        .iter()
        .copied()
        .filter(|(_, v)| v.is_finite())
        .collect();
    sorted.sort_by_key(|(ts, _)| *ts);

    let mut candles: Vec<Candle> = Vec::new();
    for (ts, value) in sorted {
        let day = match Local.timestamp_opt(ts, 0).single() {
            Some(dt) => dt.format("%m-%d").to_string(),
            None => continue,
        };
        match candles.last_mut() {
            Some(c) if c.label == day => {
                c.high = c.high.max(value);
                c.low = c.low.min(value);
                c.close = value;
            }
            _ => candles.push(Candle { label: day, open: value, high: value, low: value, close: value }),
        }
    }
    candles
}
