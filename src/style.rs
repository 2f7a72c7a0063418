//! Converts the session's option table into typed series styles.
//!
//! Keys follow matplotlib's keyword names and aliases. Unknown keys are
//! rejected the way `plot(**kwargs)` rejects them.

use crate::backend::{PlotError, SeriesKind};
use crate::store::OptionTable;
use crate::theme::Theme;
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

static HEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap()
});
static CYCLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^C(\d+)$").unwrap());

const NAMED_COLORS: &[(&str, &str)] = &[
    ("b", "#0000ff"),
    ("g", "#008000"),
    ("r", "#ff0000"),
    ("c", "#00bfbf"),
    ("m", "#bf00bf"),
    ("y", "#bfbf00"),
    ("k", "#000000"),
    ("w", "#ffffff"),
    ("tab:blue", "#1f77b4"),
    ("tab:orange", "#ff7f0e"),
    ("tab:green", "#2ca02c"),
    ("tab:red", "#d62728"),
    ("tab:purple", "#9467bd"),
    ("tab:brown", "#8c564b"),
    ("tab:pink", "#e377c2"),
    ("tab:gray", "#7f7f7f"),
    ("tab:grey", "#7f7f7f"),
    ("tab:olive", "#bcbd22"),
    ("tab:cyan", "#17becf"),
    ("black", "#000000"),
    ("white", "#ffffff"),
    ("red", "#ff0000"),
    ("green", "#008000"),
    ("blue", "#0000ff"),
    ("yellow", "#ffff00"),
    ("cyan", "#00ffff"),
    ("aqua", "#00ffff"),
    ("magenta", "#ff00ff"),
    ("fuchsia", "#ff00ff"),
    ("orange", "#ffa500"),
    ("purple", "#800080"),
    ("brown", "#a52a2a"),
    ("pink", "#ffc0cb"),
    ("gray", "#808080"),
    ("grey", "#808080"),
    ("lightgray", "#d3d3d3"),
    ("lightgrey", "#d3d3d3"),
    ("darkgray", "#a9a9a9"),
    ("darkgrey", "#a9a9a9"),
    ("silver", "#c0c0c0"),
    ("olive", "#808000"),
    ("navy", "#000080"),
    ("teal", "#008080"),
    ("maroon", "#800000"),
    ("lime", "#00ff00"),
    ("gold", "#ffd700"),
    ("indigo", "#4b0082"),
    ("violet", "#ee82ee"),
    ("crimson", "#dc143c"),
    ("coral", "#ff7f50"),
    ("salmon", "#fa8072"),
    ("orangered", "#ff4500"),
    ("turquoise", "#40e0d0"),
    ("skyblue", "#87ceeb"),
    ("steelblue", "#4682b4"),
    ("lightblue", "#add8e6"),
    ("darkblue", "#00008b"),
    ("darkred", "#8b0000"),
    ("darkgreen", "#006400"),
    ("forestgreen", "#228b22"),
    ("darkorange", "#ff8c00"),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self { a: alpha, ..self }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }
}

/// Parses a color the way matplotlib's `to_rgba` accepts it.
pub fn parse_color(value: &Value, theme: &Theme) -> Result<Color, String> {
    match value {
        Value::String(text) => parse_color_str(text, theme)
            .ok_or_else(|| format!("{text:?} is not a valid color value")),
        Value::Array(parts) => {
            if parts.len() != 3 && parts.len() != 4 {
                return Err(format!(
                    "RGB(A) colors need 3 or 4 components, got {}",
                    parts.len()
                ));
            }
            if parts.iter().any(|p| !(0.0..=1.0).contains(p)) {
                return Err("RGBA values should be within 0-1 range".to_string());
            }
            let channel = |v: f64| (v * 255.0).round() as u8;
            Ok(Color {
                r: channel(parts[0]),
                g: channel(parts[1]),
                b: channel(parts[2]),
                a: parts.get(3).copied().unwrap_or(1.0) as f32,
            })
        }
        Value::Double(v) => Err(format!("{v} is not a valid color value")),
    }
}

fn parse_color_str(text: &str, theme: &Theme) -> Option<Color> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("none") {
        return Some(Color::TRANSPARENT);
    }
    if let Some(caps) = CYCLE_RE.captures(trimmed) {
        let idx: usize = caps[1].parse().ok()?;
        return parse_plain_color(theme.cycle_color(idx));
    }
    parse_plain_color(trimmed)
}

fn parse_plain_color(text: &str) -> Option<Color> {
    if HEX_RE.is_match(text) {
        return parse_hex(&text[1..]);
    }
    if let Ok(gray) = text.parse::<f64>() {
        if !(0.0..=1.0).contains(&gray) {
            return None;
        }
        let level = (gray * 255.0).round() as u8;
        return Some(Color::rgb(level, level, level));
    }
    let lower = text.to_ascii_lowercase();
    let key = if text.len() == 1 { text } else { lower.as_str() };
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == key)
        .and_then(|(_, hex)| parse_hex(&hex[1..]))
}

fn parse_hex(digits: &str) -> Option<Color> {
    let expanded: String = if digits.len() <= 4 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };
    let byte = |idx: usize| u8::from_str_radix(expanded.get(idx..idx + 2)?, 16).ok();
    let alpha = if expanded.len() == 8 {
        byte(6)? as f32 / 255.0
    } else {
        1.0
    };
    Some(Color {
        r: byte(0)?,
        g: byte(2)?,
        b: byte(4)?,
        a: alpha,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dash {
    Solid,
    Dashed,
    DashDot,
    Dotted,
    None,
}

impl Dash {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "-" | "solid" => Some(Dash::Solid),
            "--" | "dashed" => Some(Dash::Dashed),
            "-." | "dashdot" => Some(Dash::DashDot),
            ":" | "dotted" => Some(Dash::Dotted),
            "None" | "none" | "" | " " => Some(Dash::None),
            _ => None,
        }
    }

    /// SVG dash pattern, scaled by line width like matplotlib's `lines.scale_dashes`.
    pub fn dasharray(self, width: f32) -> Option<String> {
        let pattern: &[f32] = match self {
            Dash::Dashed => &[3.7, 1.6],
            Dash::DashDot => &[6.4, 1.6, 1.0, 1.6],
            Dash::Dotted => &[1.0, 1.65],
            Dash::Solid | Dash::None => return None,
        };
        let scaled: Vec<String> = pattern
            .iter()
            .map(|len| format!("{:.2}", len * width.max(0.1)))
            .collect();
        Some(scaled.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    Point,
    Pixel,
    Circle,
    Square,
    TriangleUp,
    TriangleDown,
    TriangleLeft,
    TriangleRight,
    X,
    Plus,
    Star,
    Diamond,
    ThinDiamond,
}

impl Marker {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "None" | "none" | "" | " " => Some(Marker::None),
            "." => Some(Marker::Point),
            "," => Some(Marker::Pixel),
            "o" => Some(Marker::Circle),
            "s" => Some(Marker::Square),
            "^" => Some(Marker::TriangleUp),
            "v" => Some(Marker::TriangleDown),
            "<" => Some(Marker::TriangleLeft),
            ">" => Some(Marker::TriangleRight),
            "x" => Some(Marker::X),
            "+" => Some(Marker::Plus),
            "*" => Some(Marker::Star),
            "D" => Some(Marker::Diamond),
            "d" => Some(Marker::ThinDiamond),
            _ => None,
        }
    }

    /// Markers drawn as strokes only; they take the edge color.
    pub fn is_stroked(self) -> bool {
        matches!(self, Marker::X | Marker::Plus)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    /// `None` takes the next color from the figure's cycle.
    pub color: Option<Color>,
    pub dash: Dash,
    pub width: f32,
    pub marker: Marker,
    pub marker_size: f32,
    pub marker_face: Option<Color>,
    pub alpha: Option<f32>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterStyle {
    pub color: Option<Color>,
    /// Marker area in points², matplotlib's `s`.
    pub size: f32,
    pub marker: Marker,
    pub alpha: Option<f32>,
    pub edge_color: Option<Color>,
    pub edge_width: f32,
    pub label: Option<String>,
}

pub fn line_style(
    options: &OptionTable,
    label: Option<&str>,
    theme: &Theme,
) -> Result<LineStyle, PlotError> {
    let call = SeriesKind::Line.call_name();
    let mut style = LineStyle {
        color: None,
        dash: Dash::Solid,
        width: theme.line_width,
        marker: Marker::None,
        marker_size: theme.marker_size,
        marker_face: None,
        alpha: None,
        label: label.map(str::to_string),
    };
    for (key, value) in options.iter() {
        match key {
            "color" | "c" => style.color = Some(color_option(key, value, theme)?),
            "linestyle" | "ls" => {
                let text = string_option(key, value)?;
                style.dash = Dash::parse(text)
                    .ok_or_else(|| invalid(key, format!("{text:?} is not a valid linestyle")))?;
            }
            "linewidth" | "lw" => style.width = non_negative(key, value)?,
            "marker" => style.marker = marker_option(key, value)?,
            "markersize" | "ms" => style.marker_size = non_negative(key, value)?,
            "markerfacecolor" | "mfc" => {
                style.marker_face = Some(color_option(key, value, theme)?)
            }
            "alpha" => style.alpha = Some(alpha_option(key, value)?),
            "label" => style.label = Some(label_option(call, label, value)?),
            _ => {
                return Err(PlotError::UnknownOption {
                    call,
                    key: key.to_string(),
                });
            }
        }
    }
    Ok(style)
}

pub fn scatter_style(
    options: &OptionTable,
    label: Option<&str>,
    theme: &Theme,
) -> Result<ScatterStyle, PlotError> {
    let call = SeriesKind::Scatter.call_name();
    let mut style = ScatterStyle {
        color: None,
        size: theme.marker_size * theme.marker_size,
        marker: Marker::Circle,
        alpha: None,
        edge_color: None,
        edge_width: 1.0,
        label: label.map(str::to_string),
    };
    for (key, value) in options.iter() {
        match key {
            "color" | "c" => style.color = Some(color_option(key, value, theme)?),
            "s" => style.size = non_negative(key, value)?,
            "marker" => style.marker = marker_option(key, value)?,
            "alpha" => style.alpha = Some(alpha_option(key, value)?),
            "edgecolors" | "edgecolor" | "ec" => {
                style.edge_color = Some(color_option(key, value, theme)?)
            }
            "linewidths" | "linewidth" | "lw" => style.edge_width = non_negative(key, value)?,
            "label" => style.label = Some(label_option(call, label, value)?),
            _ => {
                return Err(PlotError::UnknownOption {
                    call,
                    key: key.to_string(),
                });
            }
        }
    }
    Ok(style)
}

fn invalid(key: &str, reason: impl Into<String>) -> PlotError {
    PlotError::InvalidOption {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn string_option<'a>(key: &str, value: &'a Value) -> Result<&'a str, PlotError> {
    value
        .as_str()
        .ok_or_else(|| invalid(key, format!("expected a string, got a {}", value.type_name())))
}

fn non_negative(key: &str, value: &Value) -> Result<f32, PlotError> {
    let number = value
        .as_f64()
        .ok_or_else(|| invalid(key, format!("expected a double, got a {}", value.type_name())))?;
    if !number.is_finite() || number < 0.0 {
        return Err(invalid(key, format!("{number} must be a finite, non-negative number")));
    }
    Ok(number as f32)
}

fn alpha_option(key: &str, value: &Value) -> Result<f32, PlotError> {
    let alpha = non_negative(key, value)?;
    if alpha > 1.0 {
        return Err(invalid(key, format!("alpha ({alpha}) is outside 0-1 range")));
    }
    Ok(alpha)
}

fn color_option(key: &str, value: &Value, theme: &Theme) -> Result<Color, PlotError> {
    parse_color(value, theme).map_err(|reason| invalid(key, reason))
}

fn marker_option(key: &str, value: &Value) -> Result<Marker, PlotError> {
    let text = string_option(key, value)?;
    Marker::parse(text).ok_or_else(|| invalid(key, format!("unrecognized marker style {text:?}")))
}

fn label_option(
    call: &'static str,
    label: Option<&str>,
    value: &Value,
) -> Result<String, PlotError> {
    if label.is_some() {
        return Err(PlotError::DuplicateLabel { call });
    }
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Double(v) => Ok(v.to_string()),
        Value::Array(_) => Err(invalid("label", "expected a string, got a array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, Value)]) -> OptionTable {
        entries.iter().cloned().collect()
    }

    #[test]
    fn parses_the_color_forms_matplotlib_accepts() {
        let theme = Theme::matplotlib_default();
        let parse = |v: Value| parse_color(&v, &theme);
        assert_eq!(parse(Value::from("red")).unwrap().hex(), "#ff0000");
        assert_eq!(parse(Value::from("k")).unwrap().hex(), "#000000");
        assert_eq!(parse(Value::from("C1")).unwrap().hex(), "#ff7f0e");
        assert_eq!(parse(Value::from("#abc")).unwrap().hex(), "#aabbcc");
        assert_eq!(parse(Value::from("0.5")).unwrap().hex(), "#808080");
        assert_eq!(parse(Value::from("tab:green")).unwrap().hex(), "#2ca02c");
        assert!(parse(Value::from("none")).unwrap().is_transparent());
        let rgba = parse(Value::from(vec![1.0, 0.0, 0.0, 0.5])).unwrap();
        assert_eq!((rgba.hex(), rgba.a), ("#ff0000".to_string(), 0.5));
        assert!(parse(Value::from("not-a-color")).is_err());
        assert!(parse(Value::from("1.5")).is_err());
        assert!(parse(Value::Double(1.0)).is_err());
        assert!(parse(Value::from(vec![2.0, 0.0, 0.0])).is_err());
    }

    #[test]
    fn empty_table_gives_theme_defaults() {
        let theme = Theme::matplotlib_default();
        let style = line_style(&OptionTable::new(), None, &theme).unwrap();
        assert_eq!(style.color, None);
        assert_eq!(style.dash, Dash::Solid);
        assert_eq!(style.width, theme.line_width);
        assert_eq!(style.marker, Marker::None);
        assert_eq!(style.label, None);
    }

    #[test]
    fn line_options_and_aliases() {
        let theme = Theme::matplotlib_default();
        let options = table(&[
            ("c", Value::from("black")),
            ("linestyle", Value::from("--")),
            ("lw", Value::Double(2.0)),
            ("marker", Value::from("o")),
        ]);
        let style = line_style(&options, Some("Data"), &theme).unwrap();
        assert_eq!(style.color.map(|c| c.hex()), Some("#000000".to_string()));
        assert_eq!(style.dash, Dash::Dashed);
        assert_eq!(style.width, 2.0);
        assert_eq!(style.marker, Marker::Circle);
        assert_eq!(style.label.as_deref(), Some("Data"));
    }

    #[test]
    fn unknown_keys_are_rejected_per_call() {
        let theme = Theme::matplotlib_default();
        let options = table(&[("s", Value::Double(20.0))]);
        assert!(scatter_style(&options, None, &theme).is_ok());
        let err = line_style(&options, None, &theme).unwrap_err();
        assert!(matches!(err, PlotError::UnknownOption { call: "plot", ref key } if key == "s"));
    }

    #[test]
    fn type_mismatches_are_invalid_options() {
        let theme = Theme::matplotlib_default();
        let options = table(&[("linewidth", Value::from("thick"))]);
        assert!(matches!(
            line_style(&options, None, &theme),
            Err(PlotError::InvalidOption { .. })
        ));
        let options = table(&[("alpha", Value::Double(1.5))]);
        assert!(matches!(
            scatter_style(&options, None, &theme),
            Err(PlotError::InvalidOption { .. })
        ));
    }

    #[test]
    fn label_option_conflicts_with_protocol_label() {
        let theme = Theme::matplotlib_default();
        let options = table(&[("label", Value::from("opt"))]);
        assert_eq!(
            line_style(&options, None, &theme).unwrap().label.as_deref(),
            Some("opt")
        );
        assert!(matches!(
            scatter_style(&options, Some("wire"), &theme),
            Err(PlotError::DuplicateLabel { call: "scatter" })
        ));
    }

    #[test]
    fn dash_patterns_scale_with_width() {
        assert_eq!(Dash::Dashed.dasharray(2.0).as_deref(), Some("7.40 3.20"));
        assert_eq!(Dash::Solid.dasharray(2.0), None);
    }
}
