//! # mlpipe
//!
//! Local build-and-test verification for containerized ML training and
//! prediction images.
//!
//! A run builds the image, then executes a fixed sequence of stages, each a
//! container invocation with the working directories bind-mounted:
//!
//! - **Fail-fast execution**: the first nonzero exit or missing artifact
//!   stops the run and its exit code is propagated
//! - **Artifact verification**: the model and predictions files must exist
//!   on the host after the stages that produce them
//! - **Diagnostics**: image metadata, directory listings, container
//!   environment and result summaries
//! - **Opt-in cleanup**: working directories are removed only on `y`/`Y`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mlpipe::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo() -> mlpipe::errors::Result<()> {
//! let config = PipelineConfig::default().with_workdir("/srv/project");
//! config.validate()?;
//!
//! let pipeline = ml_pipeline(&config, Arc::new(FixedAnswer(false)))?;
//! let runtime = Arc::new(DockerCli::new(&config.docker_bin));
//! let ctx = Arc::new(PipelineContext::new(config, runtime));
//!
//! let result = SequentialRunner::new().run(&pipeline, ctx).await;
//! std::process::exit(result.exit_code);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cleanup;
pub mod config;
pub mod container;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cleanup::{CleanupPrompt, Confirm, FixedAnswer, TerminalConfirm};
    pub use crate::config::{DirectoryLayout, MountConfig, PipelineConfig};
    pub use crate::container::{
        BuildRequest, ContainerRuntime, DockerCli, ImageInfo, Mount, ProcessExit, RunRequest,
    };
    pub use crate::context::{PipelineContext, RunIdentity, StageContext};
    pub use crate::core::{StageArtifact, StageEvent, StageKind, StageOutput, StageStatus};
    pub use crate::errors::{
        ConfigError, FailureKind, MlpipeError, PipelineValidationError, RuntimeError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{
        ml_pipeline, Pipeline, PipelineBuilder, PipelineRunResult, SequentialRunner,
        StageRunResult, StageSpec,
    };
    pub use crate::stages::{ArtifactVerifier, ExpectedArtifact, Stage};
    pub use crate::utils::{generate_run_id, iso_timestamp, Timestamp};
}
