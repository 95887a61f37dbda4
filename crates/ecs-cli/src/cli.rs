//! CLI argument definitions.

use clap::{Args, Parser};

use crate::commands::Commands;

/// CLI tool for ECS management endpoints.
#[derive(Parser, Debug)]
#[command(name = "ecsctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where and as whom to log in.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Management endpoint base URL
    #[arg(long, env = "ECS_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Management user name
    #[arg(long, short = 'u', env = "ECS_USERNAME", global = true)]
    pub username: Option<String>,

    /// Management user password
    #[arg(long, env = "ECS_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Skip TLS certificate validation (self-signed endpoints)
    #[arg(long, short = 'k', env = "ECS_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}
