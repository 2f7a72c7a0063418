//! Client side of the protocol.
//!
//! Atomic methods map one-to-one onto commands. The composite helpers work
//! on two well-known buffers, [`X_BUFFER`] and [`Y_BUFFER`].

use crate::protocol::{Command, SeriesRequest};
use crate::value::Value;
use crate::wire::WireWriter;
use std::io::{self, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

pub const X_BUFFER: i64 = 1;
pub const Y_BUFFER: i64 = 2;

pub struct PlotClient<W: Write> {
    writer: WireWriter<W>,
}

impl PlotClient<BufWriter<TcpStream>> {
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(BufWriter::new(stream)))
    }
}

impl<W: Write> PlotClient<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: WireWriter::new(inner),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Encodes and flushes a single command.
    pub fn send(&mut self, command: &Command) -> io::Result<()> {
        trace!(command = %command.message_type(), "send");
        command.write_to(&mut self.writer)?;
        self.writer.flush()
    }

    pub fn clear_buffers(&mut self) -> io::Result<()> {
        self.send(&Command::ClearBuffers)
    }

    pub fn clear_fig(&mut self) -> io::Result<()> {
        self.send(&Command::ClearFig)
    }

    pub fn store_buffer(&mut self, handle: i64, value: impl Into<Value>) -> io::Result<()> {
        self.send(&Command::Store {
            handle,
            value: value.into(),
        })
    }

    pub fn plot(&mut self, x: i64, y: i64, label: Option<&str>) -> io::Result<()> {
        self.send(&Command::Plot(series(x, y, label)))
    }

    pub fn scatter(&mut self, x: i64, y: i64, label: Option<&str>) -> io::Result<()> {
        self.send(&Command::Scatter(series(x, y, label)))
    }

    pub fn save_fig(&mut self, path: &str) -> io::Result<()> {
        self.send(&Command::SaveFig {
            path: path.to_string(),
        })
    }

    pub fn show_fig(&mut self) -> io::Result<()> {
        self.send(&Command::ShowFig)
    }

    /// `(0.0, 0.0)` asks for the default size.
    pub fn make_fig(&mut self, width: f64, height: f64) -> io::Result<()> {
        self.send(&Command::MakeFig { width, height })
    }

    pub fn reset_opt(&mut self) -> io::Result<()> {
        self.send(&Command::ResetOpt)
    }

    pub fn add_opt(&mut self, key: &str, value: impl Into<Value>) -> io::Result<()> {
        self.send(&Command::AddOpt {
            key: key.to_string(),
            value: value.into(),
        })
    }

    pub fn xlim(&mut self, min: f64, max: f64) -> io::Result<()> {
        self.send(&Command::XLim { min, max })
    }

    pub fn ylim(&mut self, min: f64, max: f64) -> io::Result<()> {
        self.send(&Command::YLim { min, max })
    }

    pub fn legend(&mut self) -> io::Result<()> {
        self.send(&Command::Legend)
    }

    pub fn axis_labels(&mut self, xlabel: &str, ylabel: &str) -> io::Result<()> {
        self.send(&Command::AxisLabels {
            xlabel: xlabel.to_string(),
            ylabel: ylabel.to_string(),
        })
    }

    pub fn title(&mut self, title: &str) -> io::Result<()> {
        self.send(&Command::Title {
            title: title.to_string(),
        })
    }

    pub fn exit(&mut self) -> io::Result<()> {
        self.send(&Command::Exit)
    }

    /// Fresh figure with empty buffers and options.
    pub fn new_figure(&mut self, width: f64, height: f64) -> io::Result<()> {
        self.clear_fig()?;
        self.clear_buffers()?;
        self.reset_opt()?;
        self.make_fig(width, height)
    }

    pub fn store_x(&mut self, values: &[f64]) -> io::Result<()> {
        self.store_buffer(X_BUFFER, values)
    }

    pub fn store_y(&mut self, values: &[f64]) -> io::Result<()> {
        self.store_buffer(Y_BUFFER, values)
    }

    /// Line plot of the X/Y buffers; an empty label sends none.
    pub fn plot_xy(&mut self, label: &str) -> io::Result<()> {
        self.plot(X_BUFFER, Y_BUFFER, non_empty(label))
    }

    pub fn scatter_xy(&mut self, label: &str) -> io::Result<()> {
        self.scatter(X_BUFFER, Y_BUFFER, non_empty(label))
    }
}

fn series(x: i64, y: i64, label: Option<&str>) -> SeriesRequest {
    SeriesRequest {
        x,
        y,
        label: label.map(str::to_string),
    }
}

fn non_empty(label: &str) -> Option<&str> {
    (!label.is_empty()).then_some(label)
}
