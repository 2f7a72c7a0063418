use crate::value::Value;
use crate::wire::{WireError, WireReader, WireWriter};
use std::fmt;
use std::io::{self, Read, Write};

/// Tag value that means "nothing to do yet"; the dispatcher idles and retries.
pub const NO_MESSAGE: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    ClearBuffers = 1,
    ClearFig = 2,
    Store = 3,
    Plot = 4,
    Scatter = 5,
    SaveFig = 6,
    ShowFig = 7,
    MakeFig = 8,
    ResetOpt = 9,
    AddOpt = 10,
    XLim = 11,
    YLim = 12,
    Legend = 13,
    AxisLabels = 14,
    Title = 15,
    Exit = 16,
}

impl MessageType {
    pub const ALL: [MessageType; 16] = [
        MessageType::ClearBuffers,
        MessageType::ClearFig,
        MessageType::Store,
        MessageType::Plot,
        MessageType::Scatter,
        MessageType::SaveFig,
        MessageType::ShowFig,
        MessageType::MakeFig,
        MessageType::ResetOpt,
        MessageType::AddOpt,
        MessageType::XLim,
        MessageType::YLim,
        MessageType::Legend,
        MessageType::AxisLabels,
        MessageType::Title,
        MessageType::Exit,
    ];

    pub fn from_wire(tag: u64) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_wire() == tag)
    }

    pub fn as_wire(self) -> u64 {
        self as u64
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::ClearBuffers => "ClearBuffers",
            MessageType::ClearFig => "ClearFig",
            MessageType::Store => "Store",
            MessageType::Plot => "Plot",
            MessageType::Scatter => "Scatter",
            MessageType::SaveFig => "SaveFig",
            MessageType::ShowFig => "ShowFig",
            MessageType::MakeFig => "MakeFig",
            MessageType::ResetOpt => "ResetOpt",
            MessageType::AddOpt => "AddOpt",
            MessageType::XLim => "XLim",
            MessageType::YLim => "YLim",
            MessageType::Legend => "Legend",
            MessageType::AxisLabels => "AxisLabels",
            MessageType::Title => "Title",
            MessageType::Exit => "Exit",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Buffer references and optional label shared by Plot and Scatter.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub x: i64,
    pub y: i64,
    pub label: Option<String>,
}

/// A fully decoded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ClearBuffers,
    ClearFig,
    Store { handle: i64, value: Value },
    Plot(SeriesRequest),
    Scatter(SeriesRequest),
    SaveFig { path: String },
    ShowFig,
    MakeFig { width: f64, height: f64 },
    ResetOpt,
    AddOpt { key: String, value: Value },
    XLim { min: f64, max: f64 },
    YLim { min: f64, max: f64 },
    Legend,
    AxisLabels { xlabel: String, ylabel: String },
    Title { title: String },
    Exit,
}

impl Command {
    pub fn message_type(&self) -> MessageType {
        match self {
            Command::ClearBuffers => MessageType::ClearBuffers,
            Command::ClearFig => MessageType::ClearFig,
            Command::Store { .. } => MessageType::Store,
            Command::Plot(_) => MessageType::Plot,
            Command::Scatter(_) => MessageType::Scatter,
            Command::SaveFig { .. } => MessageType::SaveFig,
            Command::ShowFig => MessageType::ShowFig,
            Command::MakeFig { .. } => MessageType::MakeFig,
            Command::ResetOpt => MessageType::ResetOpt,
            Command::AddOpt { .. } => MessageType::AddOpt,
            Command::XLim { .. } => MessageType::XLim,
            Command::YLim { .. } => MessageType::YLim,
            Command::Legend => MessageType::Legend,
            Command::AxisLabels { .. } => MessageType::AxisLabels,
            Command::Title { .. } => MessageType::Title,
            Command::Exit => MessageType::Exit,
        }
    }

    /// Decodes the payload that follows a tag of the given type.
    pub fn read_payload<R: Read>(
        kind: MessageType,
        reader: &mut WireReader<R>,
    ) -> Result<Self, WireError> {
        let command = match kind {
            MessageType::ClearBuffers => Command::ClearBuffers,
            MessageType::ClearFig => Command::ClearFig,
            MessageType::Store => {
                let handle = reader.read_int()? as i64;
                let value = reader.read_value()?;
                Command::Store { handle, value }
            }
            MessageType::Plot => Command::Plot(read_series(reader)?),
            MessageType::Scatter => Command::Scatter(read_series(reader)?),
            MessageType::SaveFig => Command::SaveFig {
                path: reader.read_string()?,
            },
            MessageType::ShowFig => Command::ShowFig,
            MessageType::MakeFig => {
                let width = reader.read_double()?;
                let height = reader.read_double()?;
                Command::MakeFig { width, height }
            }
            MessageType::ResetOpt => Command::ResetOpt,
            MessageType::AddOpt => {
                let key = reader.read_string()?;
                let value = reader.read_value()?;
                Command::AddOpt { key, value }
            }
            MessageType::XLim => {
                let min = reader.read_double()?;
                let max = reader.read_double()?;
                Command::XLim { min, max }
            }
            MessageType::YLim => {
                let min = reader.read_double()?;
                let max = reader.read_double()?;
                Command::YLim { min, max }
            }
            MessageType::Legend => Command::Legend,
            MessageType::AxisLabels => {
                let xlabel = reader.read_string()?;
                let ylabel = reader.read_string()?;
                Command::AxisLabels { xlabel, ylabel }
            }
            MessageType::Title => Command::Title {
                title: reader.read_string()?,
            },
            MessageType::Exit => Command::Exit,
        };
        Ok(command)
    }

    /// Encodes the tag and payload exactly as `read_payload` expects them.
    pub fn write_to<W: Write>(&self, writer: &mut WireWriter<W>) -> io::Result<()> {
        writer.write_tag(self.message_type().as_wire())?;
        match self {
            Command::Store { handle, value } => {
                writer.write_int(*handle as u64)?;
                writer.write_value(value)?;
            }
            Command::Plot(series) | Command::Scatter(series) => {
                writer.write_int(series.x as u64)?;
                writer.write_int(series.y as u64)?;
                match &series.label {
                    Some(label) => {
                        writer.write_int(1)?;
                        writer.write_string(label)?;
                    }
                    None => writer.write_int(0)?,
                }
            }
            Command::SaveFig { path } => writer.write_string(path)?,
            Command::MakeFig { width, height } => {
                writer.write_double(*width)?;
                writer.write_double(*height)?;
            }
            Command::AddOpt { key, value } => {
                writer.write_string(key)?;
                writer.write_value(value)?;
            }
            Command::XLim { min, max } | Command::YLim { min, max } => {
                writer.write_double(*min)?;
                writer.write_double(*max)?;
            }
            Command::AxisLabels { xlabel, ylabel } => {
                writer.write_string(xlabel)?;
                writer.write_string(ylabel)?;
            }
            Command::Title { title } => writer.write_string(title)?,
            Command::ClearBuffers
            | Command::ClearFig
            | Command::ShowFig
            | Command::ResetOpt
            | Command::Legend
            | Command::Exit => {}
        }
        Ok(())
    }
}

// Any nonzero flag announces a label, for Plot and Scatter alike.
fn read_series<R: Read>(reader: &mut WireReader<R>) -> Result<SeriesRequest, WireError> {
    let x = reader.read_int()? as i64;
    let y = reader.read_int()? as i64;
    let has_label = reader.read_int()?;
    let label = if has_label != 0 {
        Some(reader.read_string()?)
    } else {
        None
    };
    Ok(SeriesRequest { x, y, label })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode(bytes: Vec<u8>) -> Command {
        let mut reader = WireReader::new(Cursor::new(bytes));
        let tag = reader.read_tag().unwrap().unwrap();
        let kind = MessageType::from_wire(tag).unwrap();
        Command::read_payload(kind, &mut reader).unwrap()
    }

    #[test]
    fn tags_match_the_published_table() {
        assert_eq!(MessageType::from_wire(1), Some(MessageType::ClearBuffers));
        assert_eq!(MessageType::from_wire(12), Some(MessageType::YLim));
        assert_eq!(MessageType::from_wire(16), Some(MessageType::Exit));
        assert_eq!(MessageType::from_wire(NO_MESSAGE), None);
        assert_eq!(MessageType::from_wire(17), None);
        for (idx, kind) in MessageType::ALL.iter().enumerate() {
            assert_eq!(kind.as_wire(), idx as u64 + 1);
        }
    }

    #[test]
    fn store_handle_is_reinterpreted_as_signed() {
        let mut writer = WireWriter::new(Vec::new());
        writer.write_int(MessageType::Store.as_wire()).unwrap();
        writer.write_int(u64::MAX).unwrap();
        writer.write_value(&Value::Double(1.0)).unwrap();
        match decode(writer.into_inner()) {
            Command::Store { handle, .. } => assert_eq!(handle, -1),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn any_truthy_label_flag_reads_a_label() {
        for kind in [MessageType::Plot, MessageType::Scatter] {
            let mut writer = WireWriter::new(Vec::new());
            writer.write_int(kind.as_wire()).unwrap();
            writer.write_int(1).unwrap();
            writer.write_int(2).unwrap();
            writer.write_int(7).unwrap();
            writer.write_string("Data").unwrap();
            let series = match decode(writer.into_inner()) {
                Command::Plot(series) | Command::Scatter(series) => series,
                other => panic!("unexpected command {other:?}"),
            };
            assert_eq!(series.label.as_deref(), Some("Data"));
        }
    }

    #[test]
    fn encoder_output_decodes_to_the_same_command() {
        let commands = vec![
            Command::MakeFig { width: 8.0, height: 6.0 },
            Command::Plot(SeriesRequest { x: 1, y: 2, label: None }),
            Command::AxisLabels { xlabel: String::new(), ylabel: "Y axis?".to_string() },
            Command::AddOpt { key: "c".to_string(), value: Value::from("black") },
            Command::Exit,
        ];
        let mut writer = WireWriter::new(Vec::new());
        for command in &commands {
            command.write_to(&mut writer).unwrap();
        }
        let mut reader = WireReader::new(Cursor::new(writer.into_inner()));
        for expected in &commands {
            let tag = reader.read_tag().unwrap().unwrap();
            let kind = MessageType::from_wire(tag).unwrap();
            assert_eq!(&Command::read_payload(kind, &mut reader).unwrap(), expected);
        }
        assert!(reader.read_tag().unwrap().is_none());
    }
}
