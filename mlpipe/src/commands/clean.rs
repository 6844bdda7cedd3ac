use crate::cli::GlobalFlags;
use clap::Args;
use mlpipe::cleanup::{remove_dirs, Confirm, TerminalConfirm, CLEANUP_QUESTION};
use std::process::ExitCode;

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Remove without asking
    #[arg(short, long)]
    pub yes: bool,
}

pub fn execute(args: &CleanArgs, global: &GlobalFlags) -> anyhow::Result<ExitCode> {
    let config = global.load_config()?;
    let dirs: Vec<_> = config
        .working_dirs()
        .into_iter()
        .filter(|d| d.exists())
        .collect();

    if dirs.is_empty() {
        println!("Nothing to clean");
        return Ok(ExitCode::SUCCESS);
    }

    if !args.yes && !TerminalConfirm.confirm(CLEANUP_QUESTION) {
        println!("Keeping working directories");
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = remove_dirs(&dirs);
    for dir in &outcome.removed {
        println!("Removed {}", dir.display());
    }
    for (dir, error) in &outcome.failed {
        eprintln!("Could not remove {}: {error}", dir.display());
    }
    Ok(ExitCode::SUCCESS)
}
