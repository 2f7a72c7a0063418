use crate::backend::{Backend, PlotError};
use crate::protocol::{Command, MessageType, NO_MESSAGE, SeriesRequest};
use crate::store::{BufferStore, OptionTable};
use crate::wire::{WireError, WireReader};
use std::io::Read;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("unknown command tag {0}")]
    UnknownCommand(u64),
    #[error("{command} failed: {source}")]
    Plot {
        command: MessageType,
        #[source]
        source: PlotError,
    },
}

/// Outcome of reading one tag from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The sentinel tag arrived; nothing was dispatched.
    Idle,
    Dispatched(MessageType),
    Exit,
    Disconnected,
}

/// Why a session loop returned without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Exit,
    Disconnected,
}

/// Per-connection state: both stores plus the backend they feed.
pub struct Session<B> {
    buffers: BufferStore,
    options: OptionTable,
    backend: B,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self {
            buffers: BufferStore::new(),
            options: OptionTable::new(),
            backend,
        }
    }

    pub fn buffers(&self) -> &BufferStore {
        &self.buffers
    }

    pub fn options(&self) -> &OptionTable {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Runs the receive loop until Exit, disconnect, or the first error.
    pub fn run<R: Read>(
        &mut self,
        reader: &mut WireReader<R>,
        poll_interval: Duration,
    ) -> Result<SessionEnd, SessionError> {
        loop {
            if !poll_interval.is_zero() {
                thread::sleep(poll_interval);
            }
            match self.step(reader)? {
                Step::Exit => return Ok(SessionEnd::Exit),
                Step::Disconnected => return Ok(SessionEnd::Disconnected),
                Step::Idle | Step::Dispatched(_) => {}
            }
        }
    }

    /// Reads and executes a single command.
    pub fn step<R: Read>(&mut self, reader: &mut WireReader<R>) -> Result<Step, SessionError> {
        let Some(tag) = reader.read_tag()? else {
            return Ok(Step::Disconnected);
        };
        if tag == NO_MESSAGE {
            trace!("no message pending");
            return Ok(Step::Idle);
        }
        let kind = MessageType::from_wire(tag).ok_or(SessionError::UnknownCommand(tag))?;
        debug!(command = %kind, "message");
        let command = Command::read_payload(kind, reader)?;
        if self.apply(command)? {
            Ok(Step::Dispatched(kind))
        } else {
            Ok(Step::Exit)
        }
    }

    /// Executes a decoded command. Returns `false` once the session should end.
    pub fn apply(&mut self, command: Command) -> Result<bool, SessionError> {
        let kind = command.message_type();
        let result = match command {
            Command::ClearBuffers => {
                self.buffers.clear();
                Ok(())
            }
            Command::ClearFig => self.backend.close_all(),
            Command::MakeFig { width, height } => {
                let size = (width != 0.0 && height != 0.0).then_some((width, height));
                self.backend.create_figure(size)
            }
            Command::Store { handle, value } => {
                if !self.buffers.store(handle, value) {
                    debug!(handle, "ignoring store into non-positive handle");
                }
                Ok(())
            }
            Command::Plot(series) => self.draw(&series, false),
            Command::Scatter(series) => self.draw(&series, true),
            Command::SaveFig { path } => self.backend.save_figure(&path),
            Command::ShowFig => self.backend.show_figure(),
            Command::ResetOpt => {
                self.options.clear();
                Ok(())
            }
            Command::AddOpt { key, value } => {
                self.options.insert(key, value);
                Ok(())
            }
            Command::XLim { min, max } => self.backend.set_xlim(min, max),
            Command::YLim { min, max } => self.backend.set_ylim(min, max),
            Command::Legend => self.backend.show_legend(),
            Command::AxisLabels { xlabel, ylabel } => {
                let xlabel = (!xlabel.is_empty()).then_some(xlabel.as_str());
                let ylabel = (!ylabel.is_empty()).then_some(ylabel.as_str());
                self.backend.set_axis_labels(xlabel, ylabel)
            }
            Command::Title { title } => self.backend.set_title(&title),
            Command::Exit => return Ok(false),
        };
        result.map_err(|source| SessionError::Plot {
            command: kind,
            source,
        })?;
        Ok(true)
    }

    fn draw(&mut self, series: &SeriesRequest, scatter: bool) -> Result<(), PlotError> {
        let x = self
            .buffers
            .get(series.x)
            .ok_or(PlotError::MissingBuffer(series.x))?;
        let y = self
            .buffers
            .get(series.y)
            .ok_or(PlotError::MissingBuffer(series.y))?;
        let label = series.label.as_deref();
        if scatter {
            self.backend.plot_scatter(x, y, label, &self.options)
        } else {
            self.backend.plot_line(x, y, label, &self.options)
        }
    }
}
