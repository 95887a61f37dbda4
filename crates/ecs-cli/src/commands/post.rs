//! POST command implementation.

use anyhow::{Context, Result};
use clap::Args;

use ecs_session::Session;

use super::{header_map, parse_key_val, query_pairs, read_body};
use crate::output;

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Sub-path of the endpoint (e.g., /object/bucket.json)
    pub path: String,

    /// JSON file with the request body (use - for stdin)
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", short = 'q', value_parser = parse_key_val)]
    pub query: Vec<(String, String)>,

    /// Extra header as name=value (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_key_val)]
    pub headers: Vec<(String, String)>,
}

pub async fn run(session: &Session, args: PostArgs) -> Result<()> {
    let body = read_body(args.data.as_deref())?;
    let query = query_pairs(&args.query);
    let headers = header_map(args.headers);

    let response = session
        .post(
            &args.path,
            body.as_deref(),
            (!query.is_empty()).then_some(query.as_slice()),
            (!headers.is_empty()).then_some(&headers),
        )
        .await
        .context("POST request failed")?;

    output::body(&response)
}
