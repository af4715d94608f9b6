//! The concrete release stages.

use super::{ReleaseState, Stage};
use crate::amalgamate::SourceAmalgamator;
use crate::config::VariantConfig;
use crate::context::StageContext;
use crate::core::StageOutput;
use crate::docs::{HtmlRewriter, ImageCompressor};
use crate::errors::ShipflowError;
use crate::package::{ArchiveWriter, PackageAssembler};
use crate::toolchain::{Platform, ToolchainLocator};
use crate::tools::{catalog, ToolInvocation, ToolSpec};
use async_trait::async_trait;
use std::path::Path;

/// Runs a tool and maps an unsuccessful exit to a fatal error.
pub(crate) async fn run_expecting_success(
    ctx: &StageContext,
    spec: ToolSpec,
    dir: &Path,
) -> Result<(), ShipflowError> {
    let name = spec.name.clone();
    let output = ctx.runner.run(&ToolInvocation::new(spec, dir)).await?;
    if output.success() {
        Ok(())
    } else {
        Err(ShipflowError::tool_failure(name, output.describe_exit()))
    }
}

/// Resets the working directory to a pristine checkout.
///
/// Destructive, so it refuses to run without an explicit operator
/// acknowledgement recorded at pipeline construction.
#[derive(Debug, Clone, Copy)]
pub struct CleanStage {
    acknowledged: bool,
}

impl CleanStage {
    /// Creates the stage with the operator's acknowledgement.
    #[must_use]
    pub fn new(acknowledged: bool) -> Self {
        Self { acknowledged }
    }
}

#[async_trait]
impl Stage for CleanStage {
    fn name(&self) -> String {
        "clean".to_string()
    }

    fn state(&self) -> ReleaseState {
        ReleaseState::Clean
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        if !self.acknowledged {
            return StageOutput::fail(
                "repository clean removes all untracked files and was not acknowledged",
            );
        }
        match run_expecting_success(ctx, catalog::repository_cleaner(), &ctx.base_dir).await {
            Ok(()) => StageOutput::ok(),
            Err(err) => StageOutput::fail(err.to_string()),
        }
    }
}

/// Merges the configured source fragments into the two distributable
/// files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmalgamateStage;

impl AmalgamateStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for AmalgamateStage {
    fn name(&self) -> String {
        "amalgamate".to_string()
    }

    fn state(&self) -> ReleaseState {
        ReleaseState::Amalgamate
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        let amalgamator = SourceAmalgamator::new(ctx.config.amalgamation.clone());
        match amalgamator.amalgamate(&ctx.base_dir) {
            Ok(artifacts) => StageOutput::ok().with_artifacts(artifacts),
            Err(err) => StageOutput::fail(err.to_string()),
        }
    }
}

/// Builds and runs the documentation image generator project.
///
/// The generator is an ordinary toolchain project: build files are
/// generated with the first usable toolchain, the native driver builds
/// it, and the resulting executable writes the image files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocImagesStage;

impl DocImagesStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn build_and_run(&self, ctx: &StageContext) -> Result<String, ShipflowError> {
        let docs = &ctx.config.documentation;
        let ctx = ctx.in_dir(&docs.image_generator_dir);
        if !ctx.work_dir.is_dir() {
            return Err(ShipflowError::missing_artifact(self.name(), ctx.work_dir.clone()));
        }

        let locator = ToolchainLocator::from_config(&ctx.config.toolchain, None)?;
        let located = locator.locate_all(ctx.runner.as_ref(), &ctx.work_dir).await;
        let toolchain = located.first().ok_or_else(|| {
            ShipflowError::tool_failure(
                "build-file-generator",
                "no usable toolchain candidate found",
            )
        })?;

        let platform = Platform::current();
        run_expecting_success(
            &ctx,
            catalog::build_file_generator(toolchain.command.clone()),
            &ctx.work_dir,
        )
        .await?;
        run_expecting_success(
            &ctx,
            catalog::build_driver(platform, ctx.config.toolchain.parallel_jobs),
            &ctx.work_dir,
        )
        .await?;
        run_expecting_success(
            &ctx,
            ToolSpec::new(
                "doc-image-generator",
                platform.local_executable(&docs.image_generator_executable),
            ),
            &ctx.work_dir,
        )
        .await?;

        Ok(toolchain.command.clone())
    }
}

#[async_trait]
impl Stage for DocImagesStage {
    fn name(&self) -> String {
        "doc-images".to_string()
    }

    fn state(&self) -> ReleaseState {
        ReleaseState::DocImages
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        match self.build_and_run(ctx).await {
            Ok(toolchain) => {
                StageOutput::ok().add_metadata("toolchain", serde_json::json!(toolchain))
            }
            Err(err) => StageOutput::fail(err.to_string()),
        }
    }
}

/// Runs the external documentation generator, then post-processes its
/// output: HTML fixups first, image recompression second.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocBuildStage;

impl DocBuildStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn build(&self, ctx: &StageContext) -> Result<StageOutput, ShipflowError> {
        let docs = &ctx.config.documentation;
        let html_dir = ctx.resolve(&docs.html_dir);
        let generator_dir = html_dir
            .parent()
            .map_or_else(|| ctx.base_dir.clone(), Path::to_path_buf);

        run_expecting_success(ctx, catalog::documentation_generator(), &generator_dir).await?;

        let rewriter = HtmlRewriter::new(&docs.rewrite_rules)?;
        rewriter.rewrite_files(&html_dir, &docs.rewrite_files)?;

        let compressor = ImageCompressor::new(docs.palette_table.clone());
        let report = compressor.compress(ctx.runner.as_ref(), &html_dir).await?;

        Ok(StageOutput::ok()
            .with_warnings(report.warnings)
            .add_metadata("images_recompressed", serde_json::json!(report.recompressed))
            .add_metadata("images_skipped", serde_json::json!(report.skipped)))
    }
}

#[async_trait]
impl Stage for DocBuildStage {
    fn name(&self) -> String {
        "doc-build".to_string()
    }

    fn state(&self) -> ReleaseState {
        ReleaseState::DocBuild
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        match self.build(ctx).await {
            Ok(output) => output,
            Err(err) => StageOutput::fail(err.to_string()),
        }
    }
}

/// Assembles and archives one package variant.
#[derive(Debug, Clone)]
pub struct PackageStage {
    variant: VariantConfig,
}

impl PackageStage {
    /// Creates the stage for one variant.
    #[must_use]
    pub fn new(variant: VariantConfig) -> Self {
        Self { variant }
    }
}

#[async_trait]
impl Stage for PackageStage {
    fn name(&self) -> String {
        format!("package:{}", self.variant.kind)
    }

    fn state(&self) -> ReleaseState {
        ReleaseState::Package
    }

    async fn execute(&self, ctx: &StageContext) -> StageOutput {
        if !self.variant.enabled {
            return StageOutput::skip("variant disabled");
        }

        let archive_name = ctx.config.archive_name(&self.variant);
        let staging =
            match PackageAssembler::new().assemble(&ctx.base_dir, &ctx.base_dir, &self.variant) {
                Ok(staging) => staging,
                Err(err) => return StageOutput::fail(err.to_string()),
            };
        match ArchiveWriter::new().write(&staging, &archive_name, &ctx.base_dir) {
            Ok(artifact) => StageOutput::ok()
                .with_artifacts(vec![artifact])
                .add_metadata("archive", serde_json::json!(archive_name)),
            Err(err) => StageOutput::fail(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CopyMapping, ReleaseConfig, VariantKind};
    use crate::testing::ScriptedRunner;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Arc;

    fn context_in(dir: &Path, config: ReleaseConfig, runner: Arc<ScriptedRunner>) -> StageContext {
        StageContext::new(dir, Arc::new(config)).with_runner(runner)
    }

    #[tokio::test]
    async fn clean_refuses_without_acknowledgement() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(
            dir.path(),
            ReleaseConfig::for_product("QuickChart"),
            Arc::new(ScriptedRunner::new()),
        );

        let output = CleanStage::new(false).execute(&ctx).await;

        assert!(output.is_failure());
    }

    #[tokio::test]
    async fn clean_runs_the_repository_cleaner() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = context_in(
            dir.path(),
            ReleaseConfig::for_product("QuickChart"),
            runner.clone(),
        );

        let output = CleanStage::new(true).execute(&ctx).await;

        assert!(output.is_success());
        let invocations = runner.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].spec.program, "git");
        assert_eq!(invocations[0].spec.args, vec!["clean", "-dxf"]);
    }

    #[tokio::test]
    async fn disabled_variant_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ReleaseConfig::for_product("QuickChart");
        config.variants[2].enabled = false;
        let variant = config.variants[2].clone();
        let ctx = context_in(dir.path(), config, Arc::new(ScriptedRunner::new()));

        let output = PackageStage::new(variant).execute(&ctx).await;

        assert_eq!(output.skip_reason.as_deref(), Some("variant disabled"));
        assert!(output.is_success());
    }

    #[tokio::test]
    async fn package_stage_produces_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quickchart.h"), "// header\n").unwrap();
        fs::write(dir.path().join("GPL.txt"), "license\n").unwrap();

        let mut config = ReleaseConfig::for_product("QuickChart");
        config.variants[1].sources = vec![
            CopyMapping::new("quickchart.h", "."),
            CopyMapping::into_root("GPL.txt"),
        ];
        let variant = config.variants[1].clone();
        assert_eq!(variant.kind, VariantKind::SourceOnly);
        let ctx = context_in(dir.path(), config, Arc::new(ScriptedRunner::new()));

        let output = PackageStage::new(variant).execute(&ctx).await;

        assert!(output.is_success());
        assert!(dir.path().join("QuickChart-source.tar.gz").is_file());
        assert!(!dir.path().join("quickchart-source").exists());
    }

    #[tokio::test]
    async fn package_stage_fails_on_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReleaseConfig::for_product("QuickChart");
        let variant = config.variants[0].clone();
        let ctx = context_in(dir.path(), config, Arc::new(ScriptedRunner::new()));

        let output = PackageStage::new(variant).execute(&ctx).await;

        assert!(output.is_failure());
        assert!(output.error.as_deref().is_some_and(|e| e.contains("Missing artifact")));
    }

    #[tokio::test]
    async fn doc_images_fails_without_project_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(
            dir.path(),
            ReleaseConfig::for_product("QuickChart"),
            Arc::new(ScriptedRunner::new()),
        );

        let output = DocImagesStage::new().execute(&ctx).await;

        assert!(output.is_failure());
    }

    #[tokio::test]
    async fn doc_images_runs_tools_in_the_generator_directory() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("documentation/doc-image-generator");
        fs::create_dir_all(&project).unwrap();

        let mut config = ReleaseConfig::for_product("QuickChart");
        config.toolchain.candidates = vec!["true".to_string()];
        let runner = Arc::new(ScriptedRunner::new().with_stdout("true", ["v1", "v2"]));
        let ctx = context_in(dir.path(), config, runner.clone());

        let output = DocImagesStage::new().execute(&ctx).await;

        assert!(output.is_success());
        let invocations = runner.invocations();
        // Probe, build-file generation, native build, generator run.
        assert_eq!(invocations.len(), 4);
        assert!(invocations.iter().all(|i| i.cwd == project));
    }

    #[tokio::test]
    async fn doc_build_rewrites_and_recompresses() {
        let dir = tempfile::tempdir().unwrap();
        let html_dir = dir.path().join("documentation/html");
        fs::create_dir_all(&html_dir).unwrap();
        for file in ["pages.html", "annotated.html", "hierarchy.html", "inherits.html", "classoverview.html"] {
            fs::write(html_dir.join(file), "<div class=\"title\">Related Pages</div>\n").unwrap();
        }
        fs::write(html_dir.join("tab_b.png"), b"\x89PNG").unwrap();

        let runner = Arc::new(ScriptedRunner::new());
        let ctx = context_in(
            dir.path(),
            ReleaseConfig::for_product("QuickChart"),
            runner.clone(),
        );

        let output = DocBuildStage::new().execute(&ctx).await;

        assert!(output.is_success());
        let rewritten = fs::read_to_string(html_dir.join("pages.html")).unwrap();
        assert!(rewritten.contains("Special Pages"));
        // doxygen plus one mogrify call.
        let programs: Vec<String> = runner
            .invocations()
            .iter()
            .map(|i| i.spec.program.clone())
            .collect();
        assert_eq!(programs, vec!["doxygen", "mogrify"]);
    }
}
