//! PUT command implementation.

use anyhow::{Context, Result};
use clap::Args;

use ecs_session::Session;

use super::{parse_key_val, query_pairs, read_body};
use crate::output;

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Sub-path of the endpoint (e.g., /object/bucket/b1/quota)
    pub path: String,

    /// JSON file with the request body (use - for stdin)
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", short = 'q', value_parser = parse_key_val)]
    pub query: Vec<(String, String)>,
}

pub async fn run(session: &Session, args: PutArgs) -> Result<()> {
    let body = read_body(args.data.as_deref())?;
    let query = query_pairs(&args.query);

    let response = session
        .put(
            &args.path,
            body.as_deref(),
            (!query.is_empty()).then_some(query.as_slice()),
        )
        .await
        .context("PUT request failed")?;

    output::body(&response)
}
