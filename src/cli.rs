use crate::config::{Config, load_config};
use crate::server::Server;
use crate::session::SessionEnd;
use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "plotsrv", version, about = "Binary-protocol plot server (one client per run)")]
pub struct Args {
    /// Interface to listen on
    #[arg(long = "host")]
    pub host: Option<String>,

    /// TCP port
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Base directory for relative SaveFig paths
    #[arg(long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Write ShowFig output as figure-N.svg files here instead of stdout
    #[arg(long = "show-dir")]
    pub show_dir: Option<PathBuf>,

    /// Delay between reads, in milliseconds (0 disables it)
    #[arg(long = "poll-interval-ms")]
    pub poll_interval_ms: Option<u64>,

    /// More logging (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Flags win over the config file.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.server.poll_interval_ms = ms;
        }
        if let Some(dir) = &self.output_dir {
            config.render.output_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.show_dir {
            config.render.show_dir = Some(dir.clone());
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    let address = config.server.address();
    let server = Server::bind(config).with_context(|| format!("failed to bind {address}"))?;
    match server.serve()? {
        SessionEnd::Exit => info!("session finished"),
        SessionEnd::Disconnected => info!("session ended by disconnect"),
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_values() {
        let args = Args::parse_from([
            "plotsrv",
            "--port",
            "9100",
            "--poll-interval-ms",
            "0",
            "--show-dir",
            "/tmp/shown",
            "-vv",
        ]);
        let mut config = Config::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.server.address(), "127.0.0.1:9100");
        assert_eq!(config.server.poll_interval_ms, 0);
        assert_eq!(config.render.show_dir, Some(PathBuf::from("/tmp/shown")));
        assert_eq!(config.render.output_dir, None);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn config_file_flag_uses_camel_case() {
        let args = Args::parse_from(["plotsrv", "--configFile", "plot.json"]);
        assert_eq!(args.config, Some(PathBuf::from("plot.json")));
    }
}
