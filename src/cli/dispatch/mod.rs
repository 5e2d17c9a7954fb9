use crate::cli::{
    actions::{server::Args, Action},
    commands::{console, ARG_PORT},
};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if the console configuration cannot be built from the arguments.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let options = console::Options::parse(matches).context("invalid console configuration")?;

    Ok(Action::Server(Args {
        port,
        config: options.config,
    }))
}
