use std::io::Cursor;
use std::thread;
use std::time::Duration;

use plot_server_rs::backend::coordinates;
use plot_server_rs::config::Config;
use plot_server_rs::store::OptionTable;
use plot_server_rs::wire::{WireError, WireReader};
use plot_server_rs::{
    Backend, Command, MessageType, PlotClient, PlotError, Server, Session, SessionEnd,
    SessionError, Value,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    CreateFigure(Option<(f64, f64)>),
    CloseAll,
    Line {
        x: Vec<f64>,
        y: Vec<f64>,
        label: Option<String>,
        options: Vec<(String, Value)>,
    },
    Scatter {
        x: Vec<f64>,
        y: Vec<f64>,
        label: Option<String>,
    },
    XLim(f64, f64),
    YLim(f64, f64),
    Legend,
    AxisLabels(Option<String>, Option<String>),
    Title(String),
    Save(String),
    Show,
}

#[derive(Default)]
struct RecordingBackend {
    calls: Vec<Call>,
}

fn snapshot(options: &OptionTable) -> Vec<(String, Value)> {
    options
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

impl Backend for RecordingBackend {
    fn create_figure(&mut self, size: Option<(f64, f64)>) -> Result<(), PlotError> {
        self.calls.push(Call::CreateFigure(size));
        Ok(())
    }

    fn close_all(&mut self) -> Result<(), PlotError> {
        self.calls.push(Call::CloseAll);
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
        self.calls.push(Call::Line {
            x: xs.to_vec(),
            y: ys.to_vec(),
            label: label.map(str::to_string),
            options: snapshot(options),
        });
        Ok(())
    }

    fn plot_scatter(
        &mut self,
        x: &Value,
        y: &Value,
        label: Option<&str>,
        _options: &OptionTable,
    ) -> Result<(), PlotError> {
        let (xs, ys) = coordinates(x, y)?;
        self.calls.push(Call::Scatter {
            x: xs.to_vec(),
            y: ys.to_vec(),
            label: label.map(str::to_string),
        });
        Ok(())
    }

    fn set_xlim(&mut self, min: f64, max: f64) -> Result<(), PlotError> {
        self.calls.push(Call::XLim(min, max));
        Ok(())
    }

    fn set_ylim(&mut self, min: f64, max: f64) -> Result<(), PlotError> {
        self.calls.push(Call::YLim(min, max));
        Ok(())
    }

    fn show_legend(&mut self) -> Result<(), PlotError> {
        self.calls.push(Call::Legend);
        Ok(())
    }

    fn set_axis_labels(&mut self, x: Option<&str>, y: Option<&str>) -> Result<(), PlotError> {
        self.calls
            .push(Call::AxisLabels(x.map(str::to_string), y.map(str::to_string)));
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<(), PlotError> {
        self.calls.push(Call::Title(title.to_string()));
        Ok(())
    }

    fn save_figure(&mut self, path: &str) -> Result<(), PlotError> {
        self.calls.push(Call::Save(path.to_string()));
        Ok(())
    }

    fn show_figure(&mut self) -> Result<(), PlotError> {
        self.calls.push(Call::Show);
        Ok(())
    }
}

/// Encodes a script with the client library and replays it through a session.
fn replay(
    script: impl FnOnce(&mut PlotClient<Vec<u8>>),
) -> (Result<SessionEnd, SessionError>, Session<RecordingBackend>) {
    let mut client = PlotClient::new(Vec::new());
    script(&mut client);
    let mut reader = WireReader::new(Cursor::new(client.into_inner()));
    let mut session = Session::new(RecordingBackend::default());
    let result = session.run(&mut reader, Duration::ZERO);
    (result, session)
}

#[test]
fn options_and_buffers_reach_the_line_call() {
    let (result, session) = replay(|c| {
        c.add_opt("color", "red").unwrap();
        c.store_buffer(1, vec![0.0, 1.0, 2.0]).unwrap();
        c.store_buffer(2, vec![0.0, 1.0, 4.0]).unwrap();
        c.plot(1, 2, None).unwrap();
    });
    assert_eq!(result.unwrap(), SessionEnd::Disconnected);
    assert_eq!(
        session.backend().calls,
        vec![Call::Line {
            x: vec![0.0, 1.0, 2.0],
            y: vec![0.0, 1.0, 4.0],
            label: None,
            options: vec![("color".to_string(), Value::from("red"))],
        }]
    );
}

#[test]
fn scalar_buffer_cannot_be_plotted() {
    let (result, _) = replay(|c| {
        c.store_buffer(5, 2.5).unwrap();
        c.plot(5, 5, None).unwrap();
    });
    match result {
        Err(SessionError::Plot {
            command: MessageType::Plot,
            source: PlotError::NotASequence { axis: "x", found: "double" },
        }) => {}
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn zero_size_requests_the_default_figure() {
    let (_, session) = replay(|c| {
        c.make_fig(0.0, 0.0).unwrap();
        c.make_fig(8.0, 6.0).unwrap();
    });
    assert_eq!(
        session.backend().calls,
        vec![Call::CreateFigure(None), Call::CreateFigure(Some((8.0, 6.0)))]
    );
}

#[test]
fn limits_target_their_own_axis() {
    let (_, session) = replay(|c| {
        c.xlim(0.0, 10.0).unwrap();
        c.ylim(-1.0, 1.0).unwrap();
    });
    assert_eq!(
        session.backend().calls,
        vec![Call::XLim(0.0, 10.0), Call::YLim(-1.0, 1.0)]
    );
}

#[test]
fn reset_opt_empties_the_option_table() {
    let (_, session) = replay(|c| {
        c.add_opt("color", "red").unwrap();
        c.reset_opt().unwrap();
        c.store_x(&[0.0, 1.0]).unwrap();
        c.store_y(&[1.0, 0.0]).unwrap();
        c.plot_xy("line").unwrap();
    });
    assert!(session.options().is_empty());
    match &session.backend().calls[..] {
        [Call::Line { options, label, .. }] => {
            assert!(options.is_empty());
            assert_eq!(label.as_deref(), Some("line"));
        }
        other => panic!("unexpected calls {other:?}"),
    }
}

#[test]
fn cleared_buffers_are_missing() {
    let (result, session) = replay(|c| {
        c.store_x(&[0.0]).unwrap();
        c.store_y(&[0.0]).unwrap();
        c.clear_buffers().unwrap();
        c.scatter_xy("").unwrap();
    });
    assert!(session.buffers().is_empty());
    assert!(matches!(
        result,
        Err(SessionError::Plot {
            source: PlotError::MissingBuffer(1),
            ..
        })
    ));
}

#[test]
fn non_positive_handles_are_ignored() {
    let (result, session) = replay(|c| {
        c.store_buffer(0, 1.0).unwrap();
        c.store_buffer(-1, "ignored").unwrap();
        c.exit().unwrap();
    });
    assert_eq!(result.unwrap(), SessionEnd::Exit);
    assert!(session.buffers().is_empty());
}

#[test]
fn handles_with_the_top_bit_set_are_ignored() {
    // 1 << 63 on the wire.
    let (result, session) = replay(|c| {
        c.store_buffer(i64::MIN, 1.0).unwrap();
        c.store_buffer(i64::MAX, 2.0).unwrap();
        c.exit().unwrap();
    });
    assert_eq!(result.unwrap(), SessionEnd::Exit);
    assert_eq!(session.buffers().len(), 1);
    assert_eq!(session.buffers().get(i64::MAX), Some(&Value::Double(2.0)));
}

#[test]
fn commands_after_exit_are_not_read() {
    let (result, session) = replay(|c| {
        c.title("before").unwrap();
        c.exit().unwrap();
        c.title("after").unwrap();
    });
    assert_eq!(result.unwrap(), SessionEnd::Exit);
    assert_eq!(session.backend().calls, vec![Call::Title("before".to_string())]);
}

#[test]
fn empty_axis_labels_leave_that_axis_alone() {
    let (_, session) = replay(|c| {
        c.axis_labels("", "Y axis?").unwrap();
        c.legend().unwrap();
        c.show_fig().unwrap();
        c.save_fig("out.svg").unwrap();
        c.clear_fig().unwrap();
    });
    assert_eq!(
        session.backend().calls,
        vec![
            Call::AxisLabels(None, Some("Y axis?".to_string())),
            Call::Legend,
            Call::Show,
            Call::Save("out.svg".to_string()),
            Call::CloseAll,
        ]
    );
}

#[test]
fn idle_tags_are_skipped_and_unknown_tags_are_fatal() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0u64.to_le_bytes());
    bytes.extend_from_slice(&MessageType::Legend.as_wire().to_le_bytes());
    bytes.extend_from_slice(&99u64.to_le_bytes());
    let mut reader = WireReader::new(Cursor::new(bytes));
    let mut session = Session::new(RecordingBackend::default());
    let result = session.run(&mut reader, Duration::ZERO);
    assert!(matches!(result, Err(SessionError::UnknownCommand(99))));
    assert_eq!(session.backend().calls, vec![Call::Legend]);
}

#[test]
fn truncated_payload_is_a_transport_error() {
    let mut client = PlotClient::new(Vec::new());
    client
        .send(&Command::Title {
            title: "cut short".to_string(),
        })
        .unwrap();
    let mut bytes = client.into_inner();
    bytes.truncate(bytes.len() - 3);
    let mut reader = WireReader::new(Cursor::new(bytes));
    let mut session = Session::new(RecordingBackend::default());
    let result = session.run(&mut reader, Duration::ZERO);
    assert!(matches!(
        result,
        Err(SessionError::Wire(WireError::UnexpectedEof))
    ));
}

#[test]
fn client_and_server_produce_an_svg_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.server.port = 0;
    config.server.poll_interval_ms = 0;
    config.render.output_dir = Some(dir.path().to_path_buf());

    let server = Server::bind(config).unwrap();
    let addr = server.local_addr().unwrap();
    let handle = thread::spawn(move || server.serve());

    let mut client = PlotClient::connect(addr).unwrap();
    client.new_figure(0.0, 0.0).unwrap();
    client.store_x(&[0.0, 1.0, 2.0, 3.0]).unwrap();
    client.store_y(&[0.0, 1.0, 4.0, 9.0]).unwrap();
    client.add_opt("linestyle", "--").unwrap();
    client.plot_xy("Squares").unwrap();
    client.reset_opt().unwrap();
    client.add_opt("marker", "^").unwrap();
    client.scatter_xy("Samples").unwrap();
    client.axis_labels("X axis", "Y axis").unwrap();
    client.title("Over the wire").unwrap();
    client.legend().unwrap();
    client.save_fig("remote.svg").unwrap();
    client.exit().unwrap();

    let end = handle.join().unwrap().unwrap();
    assert_eq!(end, SessionEnd::Exit);

    let svg = std::fs::read_to_string(dir.path().join("remote.svg")).unwrap();
    for text in ["Over the wire", "X axis", "Y axis", "Squares", "Samples"] {
        assert!(svg.contains(text), "missing {text:?}");
    }
    assert!(svg.contains("<polygon"));
}
