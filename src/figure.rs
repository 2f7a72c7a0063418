//! In-memory figures and the [`Backend`] that renders them.

use crate::backend::{Backend, PlotError, coordinates};
use crate::config::RenderConfig;
use crate::layout::compute_layout;
use crate::render::{OutputFormat, render_svg, write_output_png, write_output_svg};
use crate::store::OptionTable;
use crate::style::{Color, LineStyle, ScatterStyle, line_style, parse_color, scatter_style};
use crate::theme::Theme;
use crate::value::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesStyle {
    Line(LineStyle),
    Scatter(ScatterStyle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Resolved stroke/fill color, alpha applied.
    pub color: Color,
    pub style: SeriesStyle,
}

impl Series {
    pub fn label(&self) -> Option<&str> {
        match &self.style {
            SeriesStyle::Line(style) => style.label.as_deref(),
            SeriesStyle::Scatter(style) => style.label.as_deref(),
        }
    }

    /// Labels starting with an underscore stay out of the legend.
    pub fn legend_label(&self) -> Option<&str> {
        self.label().filter(|label| !label.starts_with('_'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    /// Pixel size.
    pub width: f32,
    pub height: f32,
    pub series: Vec<Series>,
    pub xlim: Option<(f64, f64)>,
    pub ylim: Option<(f64, f64)>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub title: Option<String>,
    /// Series indices captured when the legend was requested.
    pub legend: Option<Vec<usize>>,
    cycle_index: usize,
}

impl Figure {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            series: Vec::new(),
            xlim: None,
            ylim: None,
            xlabel: None,
            ylabel: None,
            title: None,
            legend: None,
            cycle_index: 0,
        }
    }

    fn next_cycle_color(&mut self, theme: &Theme) -> Color {
        let name = theme.cycle_color(self.cycle_index);
        self.cycle_index += 1;
        parse_color(&Value::from(name), theme).unwrap_or(Color::rgb(0x1f, 0x77, 0xb4))
    }

    pub fn add_line(&mut self, x: &[f64], y: &[f64], style: LineStyle, theme: &Theme) {
        let base = match style.color {
            Some(color) => color,
            None => self.next_cycle_color(theme),
        };
        let color = match style.alpha {
            Some(alpha) => base.with_alpha(alpha),
            None => base,
        };
        self.series.push(Series {
            x: x.to_vec(),
            y: y.to_vec(),
            color,
            style: SeriesStyle::Line(style),
        });
    }

    pub fn add_scatter(&mut self, x: &[f64], y: &[f64], style: ScatterStyle, theme: &Theme) {
        let base = match style.color {
            Some(color) => color,
            None => self.next_cycle_color(theme),
        };
        let color = match style.alpha {
            Some(alpha) => base.with_alpha(alpha),
            None => base,
        };
        self.series.push(Series {
            x: x.to_vec(),
            y: y.to_vec(),
            color,
            style: SeriesStyle::Scatter(style),
        });
    }

    /// Freezes the legend to the labelled series present now. Series added
    /// later stay out of it. Returns false when nothing is labelled.
    pub fn snapshot_legend(&mut self) -> bool {
        let entries: Vec<usize> = self
            .series
            .iter()
            .enumerate()
            .filter(|(_, series)| series.legend_label().is_some())
            .map(|(index, _)| index)
            .collect();
        if entries.is_empty() {
            self.legend = None;
            return false;
        }
        self.legend = Some(entries);
        true
    }
}

/// Where ShowFig output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowSink {
    Stdout,
    Directory(PathBuf),
}

/// Backend that keeps a matplotlib-style figure stack; the last figure is current.
pub struct FigureBackend {
    render: RenderConfig,
    theme: Theme,
    figures: Vec<Figure>,
    sink: ShowSink,
    shown: usize,
}

impl FigureBackend {
    pub fn new(render: RenderConfig, theme: Theme) -> Self {
        let sink = match &render.show_dir {
            Some(dir) => ShowSink::Directory(dir.clone()),
            None => ShowSink::Stdout,
        };
        Self {
            render,
            theme,
            figures: Vec::new(),
            sink,
            shown: 0,
        }
    }

    pub fn with_sink(mut self, sink: ShowSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    pub fn current(&self) -> Option<&Figure> {
        self.figures.last()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Renders a figure to SVG text with this backend's theme.
    pub fn render_figure(&self, figure: &Figure) -> String {
        let layout = compute_layout(figure, &self.theme, &self.render);
        render_svg(&layout, &self.theme)
    }

    fn current_mut(&mut self) -> &mut Figure {
        ensure_figure(&mut self.figures, &self.render)
    }

    fn resolve_output(&self, path: &str) -> Result<(PathBuf, OutputFormat), PlotError> {
        let mut resolved = PathBuf::from(path);
        if resolved.extension().is_none() {
            resolved.set_extension("png");
        }
        if resolved.is_relative()
            && let Some(base) = &self.render.output_dir
        {
            resolved = base.join(resolved);
        }
        let format = OutputFormat::from_path(&resolved)
            .ok_or_else(|| PlotError::UnsupportedFormat(resolved.clone()))?;
        Ok((resolved, format))
    }

    fn write_figure(
        &self,
        figure: &Figure,
        path: &Path,
        format: OutputFormat,
    ) -> Result<(), PlotError> {
        let svg = self.render_figure(figure);
        match format {
            OutputFormat::Svg => write_output_svg(&svg, Some(path)),
            OutputFormat::Png => write_output_png(&svg, path, &self.theme),
        }
    }
}

impl Backend for FigureBackend {
    fn create_figure(&mut self, size: Option<(f64, f64)>) -> Result<(), PlotError> {
        let figure = match size {
            Some((width, height)) => {
                if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
                    return Err(PlotError::Render(format!(
                        "figure size must be positive and finite, got {width}x{height}"
                    )));
                }
                Figure::new(self.render.pixels(width), self.render.pixels(height))
            }
            None => default_figure(&self.render),
        };
        debug!(width = figure.width, height = figure.height, "new figure");
        self.figures.push(figure);
        Ok(())
    }

    fn close_all(&mut self) -> Result<(), PlotError> {
        self.figures.clear();
        Ok(())
    }

    fn plot_line(
        &mut self,
        x: &Value,
        y: &Value,
        label: Option<&str>,
        options: &OptionTable,
    ) -> Result<(), PlotError> {
        let (xs, ys) = coordinates(x, y)?;
        let style = line_style(options, label, &self.theme)?;
        ensure_figure(&mut self.figures, &self.render).add_line(xs, ys, style, &self.theme);
        Ok(())
    }

    fn plot_scatter(
        &mut self,
        x: &Value,
        y: &Value,
        label: Option<&str>,
        options: &OptionTable,
    ) -> Result<(), PlotError> {
        let (xs, ys) = coordinates(x, y)?;
        let style = scatter_style(options, label, &self.theme)?;
        ensure_figure(&mut self.figures, &self.render).add_scatter(xs, ys, style, &self.theme);
        Ok(())
    }

    fn set_xlim(&mut self, min: f64, max: f64) -> Result<(), PlotError> {
        check_limits("x", min, max)?;
        self.current_mut().xlim = Some((min, max));
        Ok(())
    }

    fn set_ylim(&mut self, min: f64, max: f64) -> Result<(), PlotError> {
        check_limits("y", min, max)?;
        self.current_mut().ylim = Some((min, max));
        Ok(())
    }

    fn show_legend(&mut self) -> Result<(), PlotError> {
        if !self.current_mut().snapshot_legend() {
            warn!("no artists with labels found to put in legend");
        }
        Ok(())
    }

    fn set_axis_labels(&mut self, x: Option<&str>, y: Option<&str>) -> Result<(), PlotError> {
        let figure = self.current_mut();
        if let Some(label) = x {
            figure.xlabel = Some(label.to_string());
        }
        if let Some(label) = y {
            figure.ylabel = Some(label.to_string());
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<(), PlotError> {
        self.current_mut().title = Some(title.to_string());
        Ok(())
    }

    fn save_figure(&mut self, path: &str) -> Result<(), PlotError> {
        let (resolved, format) = self.resolve_output(path)?;
        self.current_mut();
        if let Some(figure) = self.figures.last() {
            self.write_figure(figure, &resolved, format)?;
        }
        info!(path = %resolved.display(), "saved figure");
        Ok(())
    }

    fn show_figure(&mut self) -> Result<(), PlotError> {
        if self.figures.is_empty() {
            debug!("show requested with no open figures");
            return Ok(());
        }
        // A figure leaves the stack only once it has been written.
        while let Some(figure) = self.figures.first() {
            let index = self.shown + 1;
            match &self.sink {
                ShowSink::Stdout => {
                    let svg = self.render_figure(figure);
                    write_output_svg(&svg, None)?;
                    println!();
                }
                ShowSink::Directory(dir) => {
                    let path = dir.join(format!("figure-{index}.svg"));
                    self.write_figure(figure, &path, OutputFormat::Svg)?;
                    info!(path = %path.display(), "showed figure");
                }
            }
            self.figures.remove(0);
            self.shown = index;
        }
        Ok(())
    }
}

fn default_figure(render: &RenderConfig) -> Figure {
    Figure::new(
        render.pixels(render.figure_width as f64),
        render.pixels(render.figure_height as f64),
    )
}

// Every drawing call targets the last figure, creating one on first use.
fn ensure_figure<'a>(figures: &'a mut Vec<Figure>, render: &RenderConfig) -> &'a mut Figure {
    if figures.is_empty() {
        debug!("creating implicit figure");
        figures.push(default_figure(render));
    }
    let last = figures.len() - 1;
    &mut figures[last]
}

fn check_limits(axis: &str, min: f64, max: f64) -> Result<(), PlotError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(PlotError::Render(format!(
            "axis limits cannot be NaN or Inf, got {axis}lim({min}, {max})"
        )));
    }
    Ok(())
}
