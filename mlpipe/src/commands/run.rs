use crate::cli::GlobalFlags;
use anyhow::Context;
use clap::Args;
use mlpipe::cleanup::{Confirm, FixedAnswer, TerminalConfirm};
use mlpipe::container::DockerCli;
use mlpipe::context::PipelineContext;
use mlpipe::events::LoggingEventSink;
use mlpipe::pipeline::{ml_pipeline, SequentialRunner};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Reuse the existing image instead of building it
    #[arg(long)]
    pub no_build: bool,

    /// Prune old models and predictions, keeping this many
    #[arg(long, value_name = "N")]
    pub keep_count: Option<u32>,

    /// Fail a stage that runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub stage_timeout: Option<u64>,

    /// Write the run result as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Remove the working directories at the end without asking
    #[arg(short, long, conflicts_with = "keep")]
    pub yes: bool,

    /// Keep the working directories at the end without asking
    #[arg(long)]
    pub keep: bool,
}

pub async fn execute(args: RunArgs, global: &GlobalFlags) -> anyhow::Result<ExitCode> {
    let mut config = global.load_config()?;
    if args.no_build {
        config.build = false;
    }
    if args.keep_count.is_some() {
        config.keep_count = args.keep_count;
    }
    if args.stage_timeout.is_some() {
        config.stage_timeout_secs = args.stage_timeout;
    }
    config.validate().context("invalid configuration")?;

    let confirm: Arc<dyn Confirm> = if args.yes {
        Arc::new(FixedAnswer(true))
    } else if args.keep {
        Arc::new(FixedAnswer(false))
    } else {
        Arc::new(TerminalConfirm)
    };

    let pipeline = ml_pipeline(&config, confirm)?;
    let runner = SequentialRunner::new().with_stage_timeout(config.stage_timeout());
    let runtime = Arc::new(DockerCli::new(&config.docker_bin));
    let ctx = Arc::new(
        PipelineContext::new(config, runtime).with_event_sink(Arc::new(LoggingEventSink::debug())),
    );

    let result = runner.run(&pipeline, ctx).await;

    if let Some(path) = &args.summary {
        let written = result
            .to_json_pretty()
            .map_err(anyhow::Error::from)
            .and_then(|json| std::fs::write(path, json).map_err(anyhow::Error::from));
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "Failed to write run summary");
        }
    }

    match result.diagnostic() {
        Some(diagnostic) => eprintln!("{diagnostic}"),
        None => println!("Pipeline completed successfully (run {})", result.run_id),
    }
    Ok(super::exit_code(result.exit_code))
}
