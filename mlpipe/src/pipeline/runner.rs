//! Sequential, fail-fast pipeline execution.

use super::{Pipeline, PipelineRunResult, StageRunResult};
use crate::context::{PipelineContext, StageContext};
use crate::core::{StageEvent, StageKind, StageOutput, StageStatus};
use crate::errors::FailureKind;
use crate::observability::SpanTimer;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};

/// Runs stages one after another and stops at the first failure.
///
/// No stage is retried and nothing is rolled back; whatever completed
/// stages left on disk stays there for inspection.
#[derive(Debug, Clone, Default)]
pub struct SequentialRunner {
    stage_timeout: Option<Duration>,
}

impl SequentialRunner {
    /// Creates a runner without a stage timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a per-stage timeout for build and container stages. A stage that
    /// runs longer fails with [`FailureKind::Timeout`] and is asked to stop
    /// whatever it started through [`crate::stages::Stage::on_timeout`].
    ///
    /// Workspace, verify, report and cleanup stages are never timed: the
    /// cleanup prompt waits on the operator and the report must not fail a
    /// run.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Runs `pipeline` to completion or to its first failure.
    pub async fn run(&self, pipeline: &Pipeline, ctx: Arc<PipelineContext>) -> PipelineRunResult {
        let run_id = ctx.identity().run_id;
        let started_at = Utc::now();
        let timer = SpanTimer::start(pipeline.name());

        info!(pipeline = pipeline.name(), run_id = %run_id, stages = pipeline.len(), "Pipeline started");
        ctx.emit(StageEvent::pipeline_started(
            pipeline.name(),
            &run_id.to_string(),
            pipeline.len(),
        ))
        .await;

        let mut results = Vec::with_capacity(pipeline.len());
        let mut failure: Option<(String, FailureKind, i32)> = None;

        for (position, spec) in pipeline.stages().iter().enumerate() {
            if failure.is_some() {
                results.push(StageRunResult::not_run(&spec.name, position, spec.kind));
                continue;
            }

            let stage_ctx = StageContext::new(Arc::clone(&ctx), &spec.name, position);
            ctx.emit(StageEvent::started(&spec.name, position)).await;

            let stage_started = Utc::now();
            let stage_timer = SpanTimer::start(&spec.name);
            let span = info_span!("stage", name = %spec.name, position);
            let output = self
                .execute_stage(spec.runner.as_ref(), spec.kind, &stage_ctx)
                .instrument(span)
                .await;
            let duration_ms = stage_timer.finish();

            match output.status {
                StageStatus::Skip => {
                    let reason = output.skip_reason.clone().unwrap_or_default();
                    info!(stage = %spec.name, reason = %reason, "Stage skipped");
                    ctx.emit(StageEvent::skipped(&spec.name, &reason)).await;
                }
                StageStatus::Fail => {
                    let kind = output.failure.unwrap_or(FailureKind::StageExecution);
                    let message = output.error.clone().unwrap_or_default();
                    error!(
                        stage = %spec.name,
                        failure = %kind,
                        exit_code = output.propagated_exit_code(),
                        "{}: {message}",
                        kind.label()
                    );
                    ctx.emit(StageEvent::failed(&spec.name, &message)).await;
                    failure = Some((spec.name.clone(), kind, output.propagated_exit_code()));
                }
                _ => {
                    info!(stage = %spec.name, duration_ms, "Stage completed");
                    ctx.emit(StageEvent::completed(&spec.name, duration_ms)).await;
                }
            }

            results.push(StageRunResult::executed(
                &spec.name,
                position,
                spec.kind,
                output,
                stage_started,
                Utc::now(),
                duration_ms,
            ));
        }

        let duration_ms = timer.finish();
        let (failed_stage, failure_kind, exit_code) = match failure {
            Some((stage, kind, code)) => {
                ctx.emit(StageEvent::pipeline_failed(pipeline.name(), &stage, code))
                    .await;
                (Some(stage), Some(kind), code)
            }
            None => {
                info!(pipeline = pipeline.name(), duration_ms, "Pipeline completed");
                ctx.emit(StageEvent::pipeline_completed(pipeline.name(), duration_ms))
                    .await;
                (None, None, 0)
            }
        };

        PipelineRunResult {
            run_id,
            pipeline: pipeline.name().to_string(),
            started_at,
            ended_at: Utc::now(),
            duration_ms,
            success: failed_stage.is_none(),
            stages: results,
            failed_stage,
            failure: failure_kind,
            exit_code,
        }
    }

    async fn execute_stage(
        &self,
        stage: &dyn crate::stages::Stage,
        kind: StageKind,
        ctx: &StageContext,
    ) -> StageOutput {
        let limit = match self.stage_timeout {
            Some(limit) if matches!(kind, StageKind::Build | StageKind::Container) => limit,
            _ => return stage.execute(ctx).await,
        };
        match tokio::time::timeout(limit, stage.execute(ctx)).await {
            Ok(output) => output,
            Err(_) => {
                warn!(stage = ctx.stage_name(), timeout_secs = limit.as_secs(), "Stage timed out");
                stage.on_timeout(ctx).await;
                StageOutput::fail(
                    FailureKind::Timeout,
                    None,
                    format!("{} did not finish within {}s", ctx.stage_name(), limit.as_secs()),
                )
            }
        }
    }
}
