pub mod backend;
#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod config;
pub mod figure;
pub mod layout;
pub mod protocol;
pub mod render;
pub mod server;
pub mod session;
pub mod store;
pub mod style;
pub mod text_metrics;
pub mod theme;
pub mod value;
pub mod wire;

pub use backend::{Backend, PlotError};
#[cfg(feature = "cli")]
pub use cli::run;
pub use client::PlotClient;
pub use config::{Config, load_config};
pub use figure::FigureBackend;
pub use protocol::{Command, MessageType};
pub use server::{Server, ServerError};
pub use session::{Session, SessionEnd, SessionError};
pub use value::Value;
