use crate::backend::PlotError;
use crate::layout::{BASELINE_SHIFT, FigureLayout, LegendLayout, SeriesLayout, TextLayout};
use crate::style::{Color, Marker};
use crate::theme::Theme;
use std::io::Write;
use std::path::Path;

const CLIP_ID: &str = "axes-clip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "svg" => Some(OutputFormat::Svg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

pub fn render_svg(layout: &FigureLayout, theme: &Theme) -> String {
    let mut svg = String::new();
    let width = layout.width;
    let height = layout.height;
    let axes = layout.axes;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));
    svg.push_str(&format!(
        "<defs><clipPath id=\"{CLIP_ID}\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\"/></clipPath></defs>",
        axes.x, axes.y, axes.width, axes.height
    ));
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
        axes.x, axes.y, axes.width, axes.height, theme.axes_background
    ));

    if let Some(grid) = &theme.grid_color {
        for tick in &layout.x_axis.ticks {
            svg.push_str(&format!(
                "<line x1=\"{0:.2}\" y1=\"{1:.2}\" x2=\"{0:.2}\" y2=\"{2:.2}\" stroke=\"{grid}\" stroke-width=\"0.8\"/>",
                tick.position,
                axes.y,
                axes.bottom()
            ));
        }
        for tick in &layout.y_axis.ticks {
            svg.push_str(&format!(
                "<line x1=\"{1:.2}\" y1=\"{0:.2}\" x2=\"{2:.2}\" y2=\"{0:.2}\" stroke=\"{grid}\" stroke-width=\"0.8\"/>",
                tick.position,
                axes.x,
                axes.right()
            ));
        }
    }

    svg.push_str(&format!("<g clip-path=\"url(#{CLIP_ID})\">"));
    for series in &layout.series {
        svg.push_str(&series_svg(series));
    }
    svg.push_str("</g>");

    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/>",
        axes.x, axes.y, axes.width, axes.height, theme.axes_edge_color
    ));

    let tick_length = layout.tick_length;
    let label_gap = tick_length + layout.tick_pad;
    for tick in &layout.x_axis.ticks {
        svg.push_str(&format!(
            "<line x1=\"{0:.2}\" y1=\"{1:.2}\" x2=\"{0:.2}\" y2=\"{2:.2}\" stroke=\"{3}\" stroke-width=\"1\"/>",
            tick.position,
            axes.bottom(),
            axes.bottom() + tick_length,
            theme.tick_color
        ));
        svg.push_str(&text_svg(
            tick.position,
            axes.bottom() + label_gap + layout.font_size,
            &tick.label,
            layout.font_size,
            "middle",
            theme,
        ));
    }
    for tick in &layout.y_axis.ticks {
        svg.push_str(&format!(
            "<line x1=\"{1:.2}\" y1=\"{0:.2}\" x2=\"{2:.2}\" y2=\"{0:.2}\" stroke=\"{3}\" stroke-width=\"1\"/>",
            tick.position,
            axes.x - tick_length,
            axes.x,
            theme.tick_color
        ));
        svg.push_str(&text_svg(
            axes.x - label_gap,
            tick.position + BASELINE_SHIFT * layout.font_size,
            &tick.label,
            layout.font_size,
            "end",
            theme,
        ));
    }

    if let Some(label) = &layout.x_axis.label {
        svg.push_str(&text_layout_svg(label, "middle", theme));
    }
    if let Some(label) = &layout.y_axis.label {
        svg.push_str(&format!(
            "<g transform=\"rotate(-90 {:.2} {:.2})\">{}</g>",
            label.x,
            label.y,
            text_layout_svg(label, "middle", theme)
        ));
    }
    if let Some(title) = &layout.title {
        svg.push_str(&text_layout_svg(title, "middle", theme));
    }
    if let Some(legend) = &layout.legend {
        svg.push_str(&legend_svg(legend, theme));
    }

    svg.push_str("</svg>");
    svg
}

fn legend_svg(legend: &LegendLayout, theme: &Theme) -> String {
    let frame = legend.frame;
    let mut out = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"2\" ry=\"2\" fill=\"{}\" fill-opacity=\"0.8\" stroke=\"{}\" stroke-width=\"1\"/>",
        frame.x, frame.y, frame.width, frame.height, theme.legend_background, theme.legend_border
    );
    for entry in &legend.entries {
        out.push_str(&series_svg(&entry.handle));
        out.push_str(&text_layout_svg(&entry.label, "start", theme));
    }
    out
}

fn series_svg(series: &SeriesLayout) -> String {
    let mut out = String::new();
    match series {
        SeriesLayout::Line {
            segments,
            markers,
            color,
            dash,
            width,
            marker,
            marker_size,
            marker_face,
        } => {
            let dasharray = dash
                .dasharray(*width)
                .map(|d| format!(" stroke-dasharray=\"{d}\""))
                .unwrap_or_default();
            for segment in segments.iter().filter(|s| !s.is_empty()) {
                out.push_str(&format!(
                    "<path d=\"{}\" fill=\"none\" {} stroke-width=\"{:.2}\" stroke-linejoin=\"round\" stroke-linecap=\"square\"{dasharray}/>",
                    points_to_path(segment),
                    paint("stroke", *color),
                    width
                ));
            }
            for &(cx, cy) in markers {
                out.push_str(&marker_svg(*marker, cx, cy, *marker_size, *marker_face, *color, 1.0));
            }
        }
        SeriesLayout::Scatter {
            points,
            color,
            marker,
            size,
            edge_color,
            edge_width,
        } => {
            for &(cx, cy) in points {
                out.push_str(&marker_svg(*marker, cx, cy, *size, *color, *edge_color, *edge_width));
            }
        }
    }
    out
}

/// One marker centered on `(cx, cy)`; `size` is the diameter in pixels.
fn marker_svg(
    marker: Marker,
    cx: f32,
    cy: f32,
    size: f32,
    face: Color,
    edge: Color,
    edge_width: f32,
) -> String {
    let r = size / 2.0;
    let filled = format!(
        "{} {} stroke-width=\"{:.2}\"",
        paint("fill", face),
        paint("stroke", edge),
        edge_width
    );
    match marker {
        Marker::None => String::new(),
        Marker::Point => format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" {filled}/>",
            r * 0.5
        ),
        Marker::Pixel => format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"1\" height=\"1\" {}/>",
            cx - 0.5,
            cy - 0.5,
            paint("fill", face)
        ),
        Marker::Circle => format!("<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" {filled}/>"),
        Marker::Square => format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{size:.2}\" height=\"{size:.2}\" {filled}/>",
            cx - r,
            cy - r
        ),
        Marker::X | Marker::Plus => {
            // Stroke-only markers draw with the face color.
            let (dx, dy) = if marker == Marker::X {
                (r * std::f32::consts::FRAC_1_SQRT_2, r * std::f32::consts::FRAC_1_SQRT_2)
            } else {
                (r, 0.0)
            };
            format!(
                "<path d=\"M {:.2} {:.2} L {:.2} {:.2} M {:.2} {:.2} L {:.2} {:.2}\" fill=\"none\" {} stroke-width=\"{:.2}\"/>",
                cx - dx,
                cy - dy,
                cx + dx,
                cy + dy,
                cx + dy,
                cy - dx,
                cx - dy,
                cy + dx,
                paint("stroke", face),
                edge_width.max(1.0)
            )
        }
        _ => {
            let points = polygon_points(marker, cx, cy, r);
            let points: Vec<String> = points
                .iter()
                .map(|(x, y)| format!("{x:.2},{y:.2}"))
                .collect();
            format!("<polygon points=\"{}\" {filled}/>", points.join(" "))
        }
    }
}

fn polygon_points(marker: Marker, cx: f32, cy: f32, r: f32) -> Vec<(f32, f32)> {
    let regular = |count: usize, start_deg: f32, radius: f32| -> Vec<(f32, f32)> {
        (0..count)
            .map(|i| {
                let angle = (start_deg + i as f32 * 360.0 / count as f32).to_radians();
                (cx + radius * angle.cos(), cy - radius * angle.sin())
            })
            .collect()
    };
    match marker {
        Marker::TriangleUp => regular(3, 90.0, r),
        Marker::TriangleDown => regular(3, 270.0, r),
        Marker::TriangleLeft => regular(3, 180.0, r),
        Marker::TriangleRight => regular(3, 0.0, r),
        Marker::Diamond => regular(4, 90.0, r),
        Marker::ThinDiamond => vec![
            (cx, cy - r),
            (cx + 0.6 * r, cy),
            (cx, cy + r),
            (cx - 0.6 * r, cy),
        ],
        Marker::Star => {
            let outer = regular(5, 90.0, r);
            let inner = regular(5, 126.0, r * 0.381966);
            outer.into_iter().zip(inner).flat_map(|(o, i)| [o, i]).collect()
        }
        _ => Vec::new(),
    }
}

/// `fill`/`stroke` attributes for a color, with opacity when not opaque.
fn paint(attr: &str, color: Color) -> String {
    if color.is_transparent() {
        return format!("{attr}=\"none\"");
    }
    if color.a < 1.0 {
        format!("{attr}=\"{}\" {attr}-opacity=\"{:.3}\"", color.hex(), color.a)
    } else {
        format!("{attr}=\"{}\"", color.hex())
    }
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

fn text_layout_svg(text: &TextLayout, anchor: &str, theme: &Theme) -> String {
    text_svg(text.x, text.y, &text.text, text.size, anchor, theme)
}

fn text_svg(x: f32, y: f32, text: &str, size: f32, anchor: &str, theme: &Theme) -> String {
    format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{size:.2}\" fill=\"{}\">{}</text>",
        escape_xml(&theme.font_family),
        theme.text_color,
        escape_xml(text)
    )
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<(), PlotError> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(svg.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, theme: &Theme) -> Result<(), PlotError> {
    let mut opt = usvg::Options::default();
    if let Some(family) = theme.font_family.split(',').next() {
        opt.font_family = family.trim().to_string();
    }
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|err| PlotError::Render(err.to_string()))?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| PlotError::Render("failed to allocate pixmap".to_string()))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap
        .save_png(output)
        .map_err(|err| PlotError::Render(err.to_string()))?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, output: &Path, _theme: &Theme) -> Result<(), PlotError> {
    Err(PlotError::UnsupportedFormat(output.to_path_buf()))
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::figure::Figure;
    use crate::layout::compute_layout;
    use crate::style::{Dash, LineStyle, ScatterStyle};

    fn render(figure: &Figure, theme: &Theme) -> String {
        let layout = compute_layout(figure, theme, &RenderConfig::default());
        render_svg(&layout, theme)
    }

    #[test]
    fn renders_titles_labels_and_series() {
        let theme = Theme::matplotlib_default();
        let mut figure = Figure::new(640.0, 480.0);
        figure.add_line(
            &[0.0, 1.0, 2.0],
            &[0.0, 1.0, 4.0],
            LineStyle {
                color: None,
                dash: Dash::Dashed,
                width: 1.5,
                marker: Marker::Circle,
                marker_size: 6.0,
                marker_face: None,
                alpha: None,
                label: Some("x < y".to_string()),
            },
            &theme,
        );
        figure.title = Some("Growth".to_string());
        figure.xlabel = Some("time".to_string());
        figure.ylabel = Some("size".to_string());
        figure.snapshot_legend();

        let svg = render(&figure, &theme);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(">Growth</text>"));
        assert!(svg.contains(">time</text>"));
        assert!(svg.contains("rotate(-90"));
        assert!(svg.contains("x &lt; y"));
        assert!(svg.contains("stroke-dasharray"));
        assert!(svg.contains("stroke=\"#1f77b4\""));
        // Three data markers plus one legend marker.
        assert_eq!(svg.matches("<circle").count(), 4);
    }

    #[test]
    fn transparent_and_translucent_colors() {
        assert_eq!(paint("fill", Color::TRANSPARENT), "fill=\"none\"");
        assert_eq!(
            paint("fill", Color::rgb(255, 0, 0).with_alpha(0.5)),
            "fill=\"#ff0000\" fill-opacity=\"0.500\""
        );
    }

    #[test]
    fn scatter_markers_use_requested_shape() {
        let theme = Theme::matplotlib_default();
        let mut figure = Figure::new(320.0, 240.0);
        figure.add_scatter(
            &[0.0, 1.0],
            &[0.0, f64::NAN],
            ScatterStyle {
                color: None,
                size: 36.0,
                marker: Marker::Square,
                alpha: None,
                edge_color: None,
                edge_width: 1.0,
                label: None,
            },
            &theme,
        );
        let svg = render(&figure, &theme);
        // Background, clip, axes face, frame, and the one finite point.
        assert_eq!(svg.matches("<rect").count(), 5);
    }

    #[test]
    fn output_format_follows_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a.SVG")), Some(OutputFormat::Svg));
        assert_eq!(OutputFormat::from_path(Path::new("a.png")), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_path(Path::new("a.pdf")), None);
        assert_eq!(OutputFormat::from_path(Path::new("a")), None);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }
}
