//! The sequential release pipeline.
//!
//! A run walks a fixed, linear sequence of stages. Stages execute one
//! at a time in declaration order; the first failing stage ends the
//! run. There is no retry and no parallelism between stages: each stage
//! consumes what its predecessors wrote to disk.

mod stages;
mod verify;

pub use stages::{
    AmalgamateStage, CleanStage, DocBuildStage, DocImagesStage, PackageStage,
};
pub use verify::{ToolchainVerification, Verifier, VerifyOptions, VerifyReport};

use crate::config::{ReleaseConfig, VariantKind};
use crate::context::{RunIdentity, StageContext};
use crate::core::StageOutput;
use crate::observability::{SpanTimer, StageSpanAttributes};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Position of a run in the release sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseState {
    /// Resetting the working directory.
    Clean,
    /// Merging source fragments.
    Amalgamate,
    /// Generating documentation images.
    DocImages,
    /// Building and post-processing documentation.
    DocBuild,
    /// Assembling and archiving package variants.
    Package,
    /// All stages completed.
    Done,
    /// A stage failed; the run ended early.
    Failed,
}

impl std::fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Clean => "clean",
            Self::Amalgamate => "amalgamate",
            Self::DocImages => "doc_images",
            Self::DocBuild => "doc_build",
            Self::Package => "package",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One pipeline stage.
///
/// Stages never return `Err`: every outcome, including failure, is a
/// [`StageOutput`] so the pipeline can report uniformly.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name used in reports and events.
    fn name(&self) -> String;

    /// The release state this stage represents.
    fn state(&self) -> ReleaseState;

    /// Executes the stage.
    async fn execute(&self, ctx: &StageContext) -> StageOutput;
}

/// Record of one executed stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Stage name.
    pub stage: String,
    /// Release state the stage represents.
    pub state: ReleaseState,
    /// What the stage produced.
    pub output: StageOutput,
    /// Wall-clock duration.
    pub duration_ms: f64,
}

/// Record of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run id.
    pub run_id: uuid::Uuid,
    /// When the run started.
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Executed stages, in order.
    pub stages: Vec<StageReport>,
    /// Terminal state of the run.
    pub final_state: ReleaseState,
}

impl RunReport {
    fn new(identity: &RunIdentity) -> Self {
        Self {
            run_id: identity.run_id,
            started_at: identity.started_at,
            stages: Vec::new(),
            final_state: ReleaseState::Done,
        }
    }

    /// Returns true if every stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.final_state == ReleaseState::Done
    }

    /// Returns the failed stage, if the run failed.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.output.is_failure())
    }

    /// Returns the total number of warnings across all stages.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.stages.iter().map(|s| s.output.warnings.len()).sum()
    }
}

/// The release pipeline: an ordered list of stages executed strictly
/// sequentially with fail-fast semantics.
pub struct ReleasePipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl ReleasePipeline {
    /// Returns a builder for the standard stage sequence.
    #[must_use]
    pub fn builder() -> ReleasePipelineBuilder {
        ReleasePipelineBuilder::default()
    }

    /// Creates a pipeline from an explicit stage list.
    #[must_use]
    pub fn from_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs all stages in order, stopping at the first failure.
    pub async fn run(&self, ctx: &StageContext) -> RunReport {
        let mut report = RunReport::new(&ctx.identity);

        for stage in &self.stages {
            let name = stage.name();
            ctx.try_emit_event(
                "stage.started",
                Some(serde_json::json!({ "stage": name })),
            );

            let timer = SpanTimer::start(name.clone());
            let output = stage.execute(ctx).await;
            let duration_ms = timer.finish();

            let mut span = StageSpanAttributes::new(name.clone())
                .with_status(output.status.to_string())
                .with_duration_ms(duration_ms);
            if let Some(err) = &output.error {
                span = span.with_error(err.clone());
            }
            debug!(span = ?span.to_attributes(), "stage span recorded");

            if output.is_failure() {
                let detail = output.error.clone().unwrap_or_default();
                error!(stage = %name, error = %detail, "stage failed");
                ctx.try_emit_event(
                    "stage.failed",
                    Some(serde_json::json!({ "stage": name, "error": detail })),
                );
                report.stages.push(StageReport {
                    stage: name,
                    state: stage.state(),
                    output,
                    duration_ms,
                });
                report.final_state = ReleaseState::Failed;
                return report;
            }

            info!(
                stage = %name,
                status = %output.status,
                duration_ms = duration_ms as u64,
                "stage finished"
            );
            ctx.try_emit_event(
                "stage.completed",
                Some(serde_json::json!({
                    "stage": name,
                    "status": output.status.to_string(),
                    "duration_ms": duration_ms,
                })),
            );
            report.stages.push(StageReport {
                stage: name,
                state: stage.state(),
                output,
                duration_ms,
            });
        }

        report.final_state = ReleaseState::Done;
        report
    }
}

impl std::fmt::Debug for ReleasePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleasePipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builds the standard stage sequence for a release configuration.
#[derive(Debug, Clone, Default)]
pub struct ReleasePipelineBuilder {
    clean_acknowledged: bool,
    skip_clean: bool,
    skip_docs: bool,
    skip_variants: Vec<VariantKind>,
}

impl ReleasePipelineBuilder {
    /// Records the operator's acknowledgement of the destructive clean.
    #[must_use]
    pub fn acknowledge_clean(mut self, acknowledged: bool) -> Self {
        self.clean_acknowledged = acknowledged;
        self
    }

    /// Leaves the working directory as it is.
    #[must_use]
    pub fn skip_clean(mut self) -> Self {
        self.skip_clean = true;
        self
    }

    /// Skips documentation image generation and the documentation build.
    #[must_use]
    pub fn skip_docs(mut self) -> Self {
        self.skip_docs = true;
        self
    }

    /// Skips all variants of the given kind.
    #[must_use]
    pub fn skip_variant(mut self, kind: VariantKind) -> Self {
        self.skip_variants.push(kind);
        self
    }

    /// Builds the pipeline for `config`.
    #[must_use]
    pub fn build(self, config: &ReleaseConfig) -> ReleasePipeline {
        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        if !self.skip_clean {
            stages.push(Box::new(CleanStage::new(self.clean_acknowledged)));
        }
        stages.push(Box::new(AmalgamateStage::new()));
        if !self.skip_docs {
            stages.push(Box::new(DocImagesStage::new()));
            stages.push(Box::new(DocBuildStage::new()));
        }
        for variant in &config.variants {
            let mut variant = variant.clone();
            if self.skip_variants.contains(&variant.kind) {
                variant.enabled = false;
            }
            stages.push(Box::new(PackageStage::new(variant)));
        }
        ReleasePipeline::from_stages(stages)
    }
}
