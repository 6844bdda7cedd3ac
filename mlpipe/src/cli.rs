use crate::commands::{clean::CleanArgs, plan::PlanArgs, run::RunArgs};
use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use mlpipe::config::PipelineConfig;
use mlpipe::observability::LogFormat;
use std::path::PathBuf;

/// Build an ML image and verify its train/predict/validate flow locally.
#[derive(Parser, Debug)]
#[command(name = "mlpipe", author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the image and run every stage, stopping at the first failure
    Run(RunArgs),
    /// Print the stages a run would execute
    Plan(PlanArgs),
    /// Check that the model and predictions artifacts exist
    Verify,
    /// Remove the working directories
    Clean(CleanArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// Configuration file (defaults to mlpipe.json in the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory the working directories and build context live in
    #[arg(long, global = true, env = "MLPIPE_WORKDIR")]
    pub workdir: Option<PathBuf>,

    /// Image name and tag
    #[arg(long, global = true, env = "MLPIPE_IMAGE")]
    pub image: Option<String>,

    /// Container CLI executable
    #[arg(long, global = true, env = "MLPIPE_DOCKER")]
    pub docker_bin: Option<String>,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalFlags {
    /// Loads the configuration: defaults, then the config file, then
    /// environment and flags. `--workdir`/`MLPIPE_WORKDIR` also beat a
    /// `workdir` set in the file.
    pub fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        let workdir = match &self.workdir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd,
        };

        let mut config = PipelineConfig::discover(self.config.as_deref(), &workdir)
            .context("failed to load configuration")?;
        if self.workdir.is_some() {
            config.workdir = workdir;
        } else if config.workdir.is_relative() {
            config.workdir = workdir.join(&config.workdir);
        }
        if let Some(image) = &self.image {
            config.image = image.clone();
        }
        if let Some(docker_bin) = &self.docker_bin {
            config.docker_bin = docker_bin.clone();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "mlpipe", "-vv", "run", "--no-build", "--keep-count", "3", "--image", "ml:dev", "--keep",
        ])
        .unwrap();

        assert_eq!(cli.global.verbose, 2);
        assert_eq!(cli.global.image.as_deref(), Some("ml:dev"));
        match cli.command {
            Commands::Run(args) => {
                assert!(args.no_build);
                assert!(args.keep);
                assert_eq!(args.keep_count, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_yes_and_keep_conflict() {
        assert!(Cli::try_parse_from(["mlpipe", "run", "--yes", "--keep"]).is_err());
    }

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mlpipe.json");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_workdir_flag_beats_config_file() {
        let (_dir, path) = write_config(r#"{"workdir": "/from-file", "image": "file:tag"}"#);
        let cli = Cli::try_parse_from([
            "mlpipe",
            "--config",
            path.to_str().unwrap(),
            "--workdir",
            "/from-flag",
            "--image",
            "flag:tag",
            "verify",
        ])
        .unwrap();

        let config = cli.global.load_config().unwrap();

        assert_eq!(config.workdir, PathBuf::from("/from-flag"));
        assert_eq!(config.image, "flag:tag");
    }

    #[test]
    fn test_config_file_workdir_used_without_flag() {
        let (_dir, path) = write_config(r#"{"workdir": "/from-file"}"#);
        let mut cli = Cli::try_parse_from(["mlpipe", "--config", path.to_str().unwrap(), "verify"]).unwrap();
        cli.global.workdir = None;

        let config = cli.global.load_config().unwrap();

        assert_eq!(config.workdir, PathBuf::from("/from-file"));
    }
}
