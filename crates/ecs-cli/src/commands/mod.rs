//! Subcommand implementations.

mod get;
mod login;
mod post;
mod put;

use std::collections::HashMap;
use std::io::{self, Read};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::Colorize;
use tracing::debug;

use ecs_session::{Credentials, Endpoint, Session, SessionConfig};

use crate::cli::ConnectionArgs;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and show the session
    Login(login::LoginArgs),

    /// Send a GET request
    Get(get::GetArgs),

    /// Send a POST request
    Post(post::PostArgs),

    /// Send a PUT request
    Put(put::PutArgs),
}

pub async fn handle(connection: ConnectionArgs, cmd: Commands) -> Result<()> {
    let session = connect(&connection).await?;

    let result = match cmd {
        Commands::Login(args) => login::run(&session, args).await,
        Commands::Get(args) => get::run(&session, args).await,
        Commands::Post(args) => post::run(&session, args).await,
        Commands::Put(args) => put::run(&session, args).await,
    };

    session.shutdown();
    result
}

async fn connect(args: &ConnectionArgs) -> Result<Session> {
    let endpoint = args
        .endpoint
        .as_deref()
        .context("No endpoint given. Pass --endpoint or set ECS_ENDPOINT.")?;
    let username = args
        .username
        .as_deref()
        .context("No username given. Pass --username or set ECS_USERNAME.")?;
    let password = args
        .password
        .as_deref()
        .context("No password given. Pass --password or set ECS_PASSWORD.")?;

    let endpoint = Endpoint::new(endpoint).context("Invalid endpoint URL")?;

    let mut config = SessionConfig::default().with_accept_invalid_certs(args.insecure);
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    eprintln!("{}", "Logging in...".dimmed());
    debug!(endpoint = %endpoint, insecure = args.insecure, "connecting");

    Session::connect_with_config(endpoint, Credentials::new(username, password), config)
        .await
        .context("Failed to login")
}

/// Parse a `key=value` argument.
pub(crate) fn parse_key_val(s: &str) -> Result<(String, String)> {
    let Some((key, value)) = s.split_once('=') else {
        bail!("expected key=value, got '{}'", s);
    };
    if key.is_empty() {
        bail!("empty key in '{}'", s);
    }
    Ok((key.to_string(), value.to_string()))
}

/// Borrow parsed query pairs in the shape the session expects.
pub(crate) fn query_pairs(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

/// Collect parsed header pairs; later duplicates win.
pub(crate) fn header_map(pairs: Vec<(String, String)>) -> HashMap<String, String> {
    pairs.into_iter().collect()
}

/// Read a request body from a file, or stdin for `-`.
pub(crate) fn read_body(source: Option<&str>) -> Result<Option<Vec<u8>>> {
    let Some(source) = source else {
        return Ok(None);
    };

    if source == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read from stdin")?;
        Ok(Some(buf))
    } else {
        let content = std::fs::read(source).context("Failed to read body file")?;
        Ok(Some(content))
    }
}
