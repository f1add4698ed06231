//! Xferant maintenance CLI.
//!
//! - `xferant migrate` - Bring the schema up to date
//! - `xferant sweep` - Expire overdue users once
//! - `xferant run` - Run the reset policy, usage recorder and sweeps

use std::process::ExitCode;

use clap::Parser;
use xferant_rs::cli::{Args, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
