//! The rendering surface the dispatcher drives.
//!
//! The session resolves buffer handles and hands the raw values to the
//! backend; checking that a value can serve as coordinates and making sense
//! of the option table is the backend's job.

use crate::store::OptionTable;
use crate::value::Value;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("no buffer stored under handle {0}")]
    MissingBuffer(i64),
    #[error("{axis} values must be a sequence of doubles, got a {found}")]
    NotASequence {
        axis: &'static str,
        found: &'static str,
    },
    #[error("x and y must have the same length, got {x} and {y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("{call}() got an unexpected keyword argument '{key}'")]
    UnknownOption { call: &'static str, key: String },
    #[error("invalid value for option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },
    #[error("{call}() got multiple values for keyword argument 'label'")]
    DuplicateLabel { call: &'static str },
    #[error("unsupported output format for {0}")]
    UnsupportedFormat(PathBuf),
    #[error("failed to write figure: {0}")]
    Io(#[from] io::Error),
    #[error("render failed: {0}")]
    Render(String),
}

/// Series flavor, used by backends that share one code path for both calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Line,
    Scatter,
}

impl SeriesKind {
    pub fn call_name(self) -> &'static str {
        match self {
            SeriesKind::Line => "plot",
            SeriesKind::Scatter => "scatter",
        }
    }
}

pub trait Backend {
    /// Opens a new current figure. `None` means the backend's default size;
    /// otherwise the size is in inches.
    fn create_figure(&mut self, size: Option<(f64, f64)>) -> Result<(), PlotError>;

    fn close_all(&mut self) -> Result<(), PlotError>;

    fn plot_line(
        &mut self,
        x: &Value,
        y: &Value,
        label: Option<&str>,
        options: &OptionTable,
    ) -> Result<(), PlotError>;

    fn plot_scatter(
        &mut self,
        x: &Value,
        y: &Value,
        label: Option<&str>,
        options: &OptionTable,
    ) -> Result<(), PlotError>;

    fn set_xlim(&mut self, min: f64, max: f64) -> Result<(), PlotError>;

    fn set_ylim(&mut self, min: f64, max: f64) -> Result<(), PlotError>;

    fn show_legend(&mut self) -> Result<(), PlotError>;

    fn set_axis_labels(&mut self, x: Option<&str>, y: Option<&str>) -> Result<(), PlotError>;

    fn set_title(&mut self, title: &str) -> Result<(), PlotError>;

    fn save_figure(&mut self, path: &str) -> Result<(), PlotError>;

    fn show_figure(&mut self) -> Result<(), PlotError>;
}

/// Borrows both values as equally long coordinate slices.
pub fn coordinates<'a>(x: &'a Value, y: &'a Value) -> Result<(&'a [f64], &'a [f64]), PlotError> {
    let xs = x.as_slice().ok_or(PlotError::NotASequence {
        axis: "x",
        found: x.type_name(),
    })?;
    let ys = y.as_slice().ok_or(PlotError::NotASequence {
        axis: "y",
        found: y.type_name(),
    })?;
    if xs.len() != ys.len() {
        return Err(PlotError::LengthMismatch {
            x: xs.len(),
            y: ys.len(),
        });
    }
    Ok((xs, ys))
}
