pub mod clean;
pub mod plan;
pub mod run;
pub mod verify;

use crate::cli::{Cli, Commands};
use std::process::ExitCode;

pub async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let global = cli.global;
    match cli.command {
        Commands::Run(args) => run::execute(args, &global).await,
        Commands::Plan(args) => plan::execute(&args, &global),
        Commands::Verify => verify::execute(&global),
        Commands::Clean(args) => clean::execute(&args, &global),
    }
}

/// Maps a run's exit code onto a process exit code.
pub fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}
