use crate::cli::GlobalFlags;
use clap::Args;
use comfy_table::{ContentArrangement, Table};
use mlpipe::cleanup::FixedAnswer;
use mlpipe::pipeline::ml_pipeline;
use serde_json::json;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: &PlanArgs, global: &GlobalFlags) -> anyhow::Result<ExitCode> {
    let config = global.load_config()?;
    config.validate()?;
    let pipeline = ml_pipeline(&config, Arc::new(FixedAnswer(false)))?;

    if args.json {
        let stages: Vec<serde_json::Value> = pipeline
            .stages()
            .iter()
            .enumerate()
            .map(|(position, spec)| {
                json!({
                    "position": position,
                    "name": spec.name,
                    "kind": spec.kind,
                    "description": spec.description,
                })
            })
            .collect();
        let plan = json!({
            "pipeline": pipeline.name(),
            "image": config.image,
            "workdir": config.workdir,
            "stages": stages,
        });
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Stage", "Kind", "Command"]);
    for (position, spec) in pipeline.stages().iter().enumerate() {
        table.add_row(vec![
            (position + 1).to_string(),
            spec.name.clone(),
            spec.kind.to_string(),
            spec.description.clone(),
        ]);
    }
    println!("Pipeline {} ({} in {})", pipeline.name(), config.image, config.workdir.display());
    println!("{table}");
    Ok(ExitCode::SUCCESS)
}
