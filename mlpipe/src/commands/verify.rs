use crate::cli::GlobalFlags;
use comfy_table::Table;
use mlpipe::errors::FailureKind;
use mlpipe::pipeline::{model_artifact, predictions_artifact};
use mlpipe::stages::ArtifactVerifier;
use std::process::ExitCode;

pub fn execute(global: &GlobalFlags) -> anyhow::Result<ExitCode> {
    let config = global.load_config()?;
    let artifacts =
        ArtifactVerifier.check_all(&[model_artifact(&config), predictions_artifact(&config)]);

    let mut table = Table::new();
    table.set_header(vec!["Artifact", "Path", "Status", "Size"]);
    for artifact in &artifacts {
        table.add_row(vec![
            artifact.name.clone(),
            artifact.path.display().to_string(),
            if artifact.present { "present" } else { "missing" }.to_string(),
            artifact
                .size_bytes
                .map(|s| s.to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{table}");

    let missing: Vec<_> = artifacts.iter().filter(|a| !a.present).collect();
    if missing.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    for artifact in missing {
        eprintln!(
            "{}: Expected artifact not found: {}",
            FailureKind::MissingArtifact.label(),
            artifact.path.display()
        );
    }
    Ok(ExitCode::FAILURE)
}
