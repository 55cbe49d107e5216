mod cli;
mod error;
mod export;
mod git;
mod logging;
mod render;
mod summary;
mod time_utils;
mod track;

pub(crate) use error::{AppError, AppResult};

use clap::Parser;
use std::process::exit;
use tracing::error;

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();
    if let Some(shell) = &args.completions {
        cli::write_completions(shell);
        return;
    }
    logging::setup_logger(&args.verbosity);
    if let Err(e) = args.run().await {
        error!("{}", e);
        exit(1);
    }
}
