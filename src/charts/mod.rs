//! Stateless chart primitives for the dashboard.
//!
//! Every primitive maps a numeric series plus sizing options to an [`Svg`]
//! description. None of them perform I/O or keep state.

pub mod svg;
pub mod bars;
pub mod gauge;
pub mod candle;
pub mod pipeline;

pub use svg::{Anchor, Element, Svg};
pub use bars::{barcode_bars, svg_bar_chart, svg_horizontal_bar, BarChartOptions, BarcodeOptions, HorizontalBarOptions};
pub use gauge::{gauge, gauge_point, GaugeOptions};
pub use candle::{candle_chart, daily_candles, Candle, CandleOptions};
pub use pipeline::{pipeline_bar, PipelineOptions, PipelineSegment};
