use clap::{Parser, Subcommand};

use crate::config::Config;

/// HTTP proxy between the studio front-end and its generation providers
#[derive(Debug, Parser)]
#[command(name = "studio-proxy", version)]
pub struct Cli {
    /// Bind address, overrides HOST
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port, overrides PORT
    #[arg(long)]
    pub port: Option<u16>,

    /// Log directory, overrides LOG_DIR
    #[arg(long)]
    pub log_dir: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Print the resolved configuration with secrets masked, then exit
    CheckConfig,
}

impl Cli {
    /// Apply command-line overrides on top of the environment configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = log_dir.clone();
        }
    }

    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Serve)
    }
}
