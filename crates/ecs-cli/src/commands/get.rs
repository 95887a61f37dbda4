//! GET command implementation.

use anyhow::{Context, Result};
use clap::Args;

use ecs_session::Session;

use super::{header_map, parse_key_val, query_pairs};
use crate::output;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Sub-path of the endpoint (e.g., /object/bucket.json)
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", short = 'q', value_parser = parse_key_val)]
    pub query: Vec<(String, String)>,

    /// Extra header as name=value (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_key_val)]
    pub headers: Vec<(String, String)>,
}

pub async fn run(session: &Session, args: GetArgs) -> Result<()> {
    let query = query_pairs(&args.query);
    let headers = header_map(args.headers);

    let body = session
        .get(
            &args.path,
            (!query.is_empty()).then_some(query.as_slice()),
            (!headers.is_empty()).then_some(&headers),
        )
        .await
        .context("GET request failed")?;

    output::body(&body)
}
