//! Pixel geometry for a figure: axes box, limits, ticks, series and legend.
//!
//! Lengths from the theme and series styles are in points and are converted
//! with the figure's dpi. Data space maps onto the axes box with the first
//! limit at the left/bottom, so inverted limits flip the axis.

use crate::config::RenderConfig;
use crate::figure::{Figure, Series, SeriesStyle};
use crate::style::{Color, Dash, Marker};
use crate::text_metrics::text_width;
use crate::theme::Theme;

// matplotlib's default `figure.subplot.*` fractions.
const SUBPLOT_LEFT: f32 = 0.125;
const SUBPLOT_RIGHT: f32 = 0.9;
const SUBPLOT_BOTTOM: f32 = 0.11;
const SUBPLOT_TOP: f32 = 0.88;

const AXES_MARGIN: f64 = 0.05;
const MAX_TICK_INTERVALS: f64 = 8.0;
const NICE_STEPS: [f64; 5] = [1.0, 2.0, 2.5, 5.0, 10.0];

const TICK_LENGTH_PT: f32 = 3.5;
const TICK_PAD_PT: f32 = 3.5;
const LABEL_PAD_PT: f32 = 4.0;
const TITLE_PAD_PT: f32 = 6.0;

// Legend spacing, in font-size units.
const LEGEND_BORDER_PAD: f32 = 0.4;
const LEGEND_LABEL_SPACING: f32 = 0.5;
const LEGEND_HANDLE_LENGTH: f32 = 2.0;
const LEGEND_HANDLE_TEXT_PAD: f32 = 0.8;
const LEGEND_AXES_PAD: f32 = 0.5;

/// Baseline offset that visually centers a line of text on a y coordinate.
pub const BASELINE_SHIFT: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub text: String,
    /// Anchor point; `y` is the baseline.
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    /// Pixel coordinate along the axis.
    pub position: f32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisLayout {
    pub limits: (f64, f64),
    pub ticks: Vec<Tick>,
    pub label: Option<TextLayout>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesLayout {
    Line {
        /// Polylines; non-finite points split the series.
        segments: Vec<Vec<(f32, f32)>>,
        markers: Vec<(f32, f32)>,
        color: Color,
        dash: Dash,
        width: f32,
        marker: Marker,
        marker_size: f32,
        marker_face: Color,
    },
    Scatter {
        points: Vec<(f32, f32)>,
        color: Color,
        marker: Marker,
        /// Marker diameter in pixels.
        size: f32,
        edge_color: Color,
        edge_width: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub handle: SeriesLayout,
    pub label: TextLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendLayout {
    pub frame: Rect,
    pub entries: Vec<LegendEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FigureLayout {
    pub width: f32,
    pub height: f32,
    pub axes: Rect,
    pub x_axis: AxisLayout,
    pub y_axis: AxisLayout,
    pub tick_length: f32,
    /// Gap between a tick and its label.
    pub tick_pad: f32,
    pub font_size: f32,
    pub title: Option<TextLayout>,
    pub series: Vec<SeriesLayout>,
    pub legend: Option<LegendLayout>,
}

pub fn compute_layout(figure: &Figure, theme: &Theme, config: &RenderConfig) -> FigureLayout {
    let scale = config.dpi / 72.0;
    let font_size = theme.font_size * scale;
    let title_size = theme.title_font_size * scale;
    let tick_length = TICK_LENGTH_PT * scale;
    let tick_pad = TICK_PAD_PT * scale;
    let label_pad = LABEL_PAD_PT * scale;

    let width = figure.width.max(1.0);
    let height = figure.height.max(1.0);
    let axes = Rect {
        x: width * SUBPLOT_LEFT,
        y: height * (1.0 - SUBPLOT_TOP),
        width: width * (SUBPLOT_RIGHT - SUBPLOT_LEFT),
        height: height * (SUBPLOT_TOP - SUBPLOT_BOTTOM),
    };

    let (x_data, y_data) = data_bounds(&figure.series);
    let x_limits = resolve_limits(figure.xlim, x_data);
    let y_limits = resolve_limits(figure.ylim, y_data);
    let to_px = |x: f64, y: f64| -> (f32, f32) {
        let fx = (x - x_limits.0) / (x_limits.1 - x_limits.0);
        let fy = (y - y_limits.0) / (y_limits.1 - y_limits.0);
        (
            axes.x + fx as f32 * axes.width,
            axes.bottom() - fy as f32 * axes.height,
        )
    };

    let x_ticks: Vec<Tick> = nice_ticks(x_limits.0, x_limits.1)
        .into_iter()
        .map(|(value, label)| Tick {
            value,
            position: to_px(value, y_limits.0).0,
            label,
        })
        .collect();
    let y_ticks: Vec<Tick> = nice_ticks(y_limits.0, y_limits.1)
        .into_iter()
        .map(|(value, label)| Tick {
            value,
            position: to_px(x_limits.0, value).1,
            label,
        })
        .collect();

    let x_tick_baseline = axes.bottom() + tick_length + tick_pad + font_size;
    let x_label = figure.xlabel.as_ref().map(|text| TextLayout {
        text: text.clone(),
        x: axes.x + axes.width / 2.0,
        y: x_tick_baseline + label_pad + font_size,
        size: font_size,
    });

    let widest_y_tick = y_ticks
        .iter()
        .map(|tick| text_width(&tick.label, font_size, &theme.font_family))
        .fold(0.0f32, f32::max);
    let y_label = figure.ylabel.as_ref().map(|text| TextLayout {
        text: text.clone(),
        x: axes.x - tick_length - tick_pad - widest_y_tick - label_pad,
        y: axes.y + axes.height / 2.0,
        size: font_size,
    });

    let title = figure.title.as_ref().map(|text| TextLayout {
        text: text.clone(),
        x: axes.x + axes.width / 2.0,
        y: axes.y - TITLE_PAD_PT * scale,
        size: title_size,
    });

    let series = figure
        .series
        .iter()
        .map(|series| series_layout(series, scale, &to_px))
        .collect();

    let legend = figure
        .legend
        .as_deref()
        .and_then(|entries| legend_layout(figure, entries, &axes, font_size, scale, theme));

    FigureLayout {
        width,
        height,
        axes,
        x_axis: AxisLayout {
            limits: x_limits,
            ticks: x_ticks,
            label: x_label,
        },
        y_axis: AxisLayout {
            limits: y_limits,
            ticks: y_ticks,
            label: y_label,
        },
        tick_length,
        tick_pad,
        font_size,
        title,
        series,
        legend,
    }
}

fn series_layout(
    series: &Series,
    scale: f32,
    to_px: &impl Fn(f64, f64) -> (f32, f32),
) -> SeriesLayout {
    let finite = |x: f64, y: f64| x.is_finite() && y.is_finite();
    match &series.style {
        SeriesStyle::Line(style) => {
            let mut segments: Vec<Vec<(f32, f32)>> = Vec::new();
            let mut current: Vec<(f32, f32)> = Vec::new();
            let mut markers = Vec::new();
            for (&x, &y) in series.x.iter().zip(&series.y) {
                if !finite(x, y) {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                    continue;
                }
                let point = to_px(x, y);
                current.push(point);
                markers.push(point);
            }
            if !current.is_empty() {
                segments.push(current);
            }
            if style.dash == Dash::None {
                segments.clear();
            }
            if style.marker == Marker::None {
                markers.clear();
            }
            let marker_face = match style.marker_face {
                Some(face) => match style.alpha {
                    Some(alpha) => face.with_alpha(alpha),
                    None => face,
                },
                None => series.color,
            };
            SeriesLayout::Line {
                segments,
                markers,
                color: series.color,
                dash: style.dash,
                width: style.width * scale,
                marker: style.marker,
                marker_size: style.marker_size * scale,
                marker_face,
            }
        }
        SeriesStyle::Scatter(style) => {
            let points = series
                .x
                .iter()
                .zip(&series.y)
                .filter(|(x, y)| finite(**x, **y))
                .map(|(x, y)| to_px(*x, *y))
                .collect();
            let edge_color = match style.edge_color {
                Some(edge) => match style.alpha {
                    Some(alpha) => edge.with_alpha(alpha),
                    None => edge,
                },
                None => series.color,
            };
            SeriesLayout::Scatter {
                points,
                color: series.color,
                marker: style.marker,
                size: style.size.sqrt() * scale,
                edge_color,
                edge_width: style.edge_width * scale,
            }
        }
    }
}

fn legend_layout(
    figure: &Figure,
    entries: &[usize],
    axes: &Rect,
    font_size: f32,
    scale: f32,
    theme: &Theme,
) -> Option<LegendLayout> {
    let labelled: Vec<(&Series, &str)> = entries
        .iter()
        .filter_map(|&index| figure.series.get(index))
        .filter_map(|series| series.legend_label().map(|label| (series, label)))
        .collect();
    if labelled.is_empty() {
        return None;
    }

    let pad = LEGEND_BORDER_PAD * font_size;
    let handle_length = LEGEND_HANDLE_LENGTH * font_size;
    let text_pad = LEGEND_HANDLE_TEXT_PAD * font_size;
    let row_step = (1.0 + LEGEND_LABEL_SPACING) * font_size;
    let widest = labelled
        .iter()
        .map(|(_, label)| text_width(label, font_size, &theme.font_family))
        .fold(0.0f32, f32::max);
    let count = labelled.len() as f32;
    let frame = Rect {
        x: 0.0,
        y: axes.y + LEGEND_AXES_PAD * font_size,
        width: 2.0 * pad + handle_length + text_pad + widest,
        height: 2.0 * pad + count * font_size + (count - 1.0) * LEGEND_LABEL_SPACING * font_size,
    };
    let frame = Rect {
        x: axes.right() - LEGEND_AXES_PAD * font_size - frame.width,
        ..frame
    };

    let entries = labelled
        .into_iter()
        .enumerate()
        .map(|(idx, (series, label))| {
            let center_y = frame.y + pad + idx as f32 * row_step + font_size / 2.0;
            let start_x = frame.x + pad;
            let end_x = start_x + handle_length;
            let sample = |x: f64, y: f64| -> (f32, f32) {
                (
                    start_x + x as f32 * handle_length,
                    center_y - y as f32 * font_size,
                )
            };
            let mut handle = series_layout(&legend_sample(series), scale, &sample);
            if let SeriesLayout::Line { markers, .. } = &mut handle
                && !markers.is_empty()
            {
                *markers = vec![((start_x + end_x) / 2.0, center_y)];
            }
            LegendEntry {
                handle,
                label: TextLayout {
                    text: label.to_string(),
                    x: end_x + text_pad,
                    y: center_y + BASELINE_SHIFT * font_size,
                    size: font_size,
                },
            }
        })
        .collect();

    Some(LegendLayout { frame, entries })
}

// Two points spanning the handle for lines, one centered point for scatter.
fn legend_sample(series: &Series) -> Series {
    let (x, y) = match series.style {
        SeriesStyle::Line(_) => (vec![0.0, 1.0], vec![0.0, 0.0]),
        SeriesStyle::Scatter(_) => (vec![0.5], vec![0.0]),
    };
    Series {
        x,
        y,
        color: series.color,
        style: series.style.clone(),
    }
}

fn data_bounds(series: &[Series]) -> (Option<(f64, f64)>, Option<(f64, f64)>) {
    let mut x_bounds: Option<(f64, f64)> = None;
    let mut y_bounds: Option<(f64, f64)> = None;
    let widen = |bounds: &mut Option<(f64, f64)>, v: f64| {
        *bounds = Some(match *bounds {
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
            None => (v, v),
        });
    };
    for s in series {
        for (&x, &y) in s.x.iter().zip(&s.y) {
            if x.is_finite() && y.is_finite() {
                widen(&mut x_bounds, x);
                widen(&mut y_bounds, y);
            }
        }
    }
    (x_bounds, y_bounds)
}

/// Explicit limits win; otherwise the data range plus a 5% margin.
pub fn resolve_limits(explicit: Option<(f64, f64)>, data: Option<(f64, f64)>) -> (f64, f64) {
    if let Some((lo, hi)) = explicit {
        return if lo == hi { expand_singular(lo) } else { (lo, hi) };
    }
    match data {
        None => (0.0, 1.0),
        Some((lo, hi)) if lo == hi => expand_singular(lo),
        Some((lo, hi)) => {
            let margin = (hi - lo) * AXES_MARGIN;
            (lo - margin, hi + margin)
        }
    }
}

fn expand_singular(v: f64) -> (f64, f64) {
    let delta = if v == 0.0 { 0.5 } else { v.abs() * AXES_MARGIN };
    (v - delta, v + delta)
}

/// Tick values inside the limits, on a 1/2/2.5/5 × 10^k grid, with labels.
pub fn nice_ticks(a: f64, b: f64) -> Vec<(f64, String)> {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let span = hi - lo;
    if !span.is_finite() || span <= 0.0 {
        return vec![(lo, format_tick(lo, 0))];
    }
    let raw = span / MAX_TICK_INTERVALS;
    let exponent = raw.log10().floor();
    let magnitude = 10f64.powf(exponent);
    let (mantissa, step) = NICE_STEPS
        .iter()
        .map(|m| (*m, m * magnitude))
        .find(|(_, step)| *step >= raw * (1.0 - 1e-12))
        .unwrap_or((10.0, 10.0 * magnitude));

    let mut decimals = -(step.log10().floor() as i32);
    if mantissa == 2.5 {
        decimals += 1;
    }
    let decimals = decimals.max(0) as usize;

    let eps = step * 1e-9;
    let first = ((lo - eps) / step).ceil() as i64;
    let last = ((hi + eps) / step).floor() as i64;
    (first..=last)
        .take(1000)
        .map(|k| {
            let value = k as f64 * step;
            let value = if value == 0.0 { 0.0 } else { value };
            (value, format_tick(value, decimals))
        })
        .collect()
}

fn format_tick(value: f64, decimals: usize) -> String {
    let text = format!("{value:.decimals$}");
    if text.starts_with('-') && text.trim_start_matches(['-', '0', '.']).is_empty() {
        text[1..].to_string()
    } else {
        text
    }
}
