//! Login command implementation.

use anyhow::Result;
use clap::Args;

use ecs_session::Session;

use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Print the auth token
    #[arg(long)]
    pub show_token: bool,
}

pub async fn run(session: &Session, args: LoginArgs) -> Result<()> {
    output::success("Logged in successfully");
    println!();
    output::field("Endpoint", session.endpoint().as_str());
    output::field("Username", session.username());
    output::field(
        "Token refresh",
        if session.has_pending_refresh() {
            "scheduled"
        } else {
            "not scheduled"
        },
    );

    if args.show_token {
        output::field("Token", session.token().await.as_str());
    }

    Ok(())
}
