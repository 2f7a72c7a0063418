//! Single-connection TCP front end.

use crate::backend::Backend;
use crate::config::Config;
use crate::figure::FigureBackend;
use crate::session::{Session, SessionEnd, SessionError};
use crate::wire::WireReader;
use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to accept a connection: {0}")]
    Accept(#[source] io::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A bound listener that serves exactly one client.
pub struct Server {
    listener: TcpListener,
    config: Config,
}

impl Server {
    pub fn bind(config: Config) -> io::Result<Self> {
        let listener = TcpListener::bind(config.server.address())?;
        info!(address = %listener.local_addr()?, "listening");
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves one client with the figure backend built from the config.
    pub fn serve(self) -> Result<SessionEnd, ServerError> {
        let backend = FigureBackend::new(self.config.render.clone(), self.config.theme.clone());
        self.serve_with(backend).map(|(end, _)| end)
    }

    /// Accepts one connection and runs the session to completion. The
    /// listener is dropped before the session starts, so later clients are
    /// refused.
    pub fn serve_with<B: Backend>(self, backend: B) -> Result<(SessionEnd, B), ServerError> {
        let Server { listener, config } = self;
        let (stream, peer) = listener.accept().map_err(ServerError::Accept)?;
        drop(listener);
        info!(%peer, "client connected");

        let mut reader =
            WireReader::with_limit(BufReader::new(stream), config.server.max_frame_bytes);
        let mut session = Session::new(backend);
        let end = match session.run(&mut reader, config.server.poll_interval()) {
            Ok(end) => end,
            Err(err) => {
                match &err {
                    SessionError::Wire(wire) if wire.is_transport() => {
                        warn!(%peer, error = %wire, "connection lost")
                    }
                    _ => error!(%peer, error = %err, "terminating session"),
                }
                return Err(err.into());
            }
        };
        match end {
            SessionEnd::Exit => info!(%peer, "client requested exit"),
            SessionEnd::Disconnected => info!(%peer, "client disconnected"),
        }
        Ok((end, session.into_backend()))
    }
}
