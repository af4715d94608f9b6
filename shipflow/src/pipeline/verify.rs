//! Post-release verification.
//!
//! After a release run, the shipped archives are unpacked into a
//! scratch directory and their example projects are built and executed
//! against every usable toolchain. Build failures are fatal: a package
//! that does not compile must never ship. Execution failures of the
//! built examples are warnings only, because GUI executables routinely
//! fail in headless environments.

use super::stages::run_expecting_success;
use crate::config::{SharedLibVerification, VariantKind};
use crate::context::StageContext;
use crate::core::BuildArtifact;
use crate::errors::{ShipflowError, ShipflowWarning};
use crate::toolchain::{Platform, ToolchainLocator, ToolchainVersion};
use crate::tools::{catalog, ToolInvocation, ToolSpec};
use crate::utils::fs::extract_tar_gz;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Name used in missing-artifact diagnostics.
pub const STAGE_NAME: &str = "verify";

/// Callback invoked between toolchain iterations when pausing is
/// requested, so the operator can inspect the scratch directory.
/// Returning `false` stops the remaining iterations.
pub type PauseHook = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Options of one verification run.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Verify against a single toolchain version instead of all
    /// candidates.
    pub toolchain_override: Option<u32>,
    /// Build only the primary example project.
    pub short: bool,
    /// Let example executables run until the operator closes them
    /// instead of killing them after the grace period.
    pub interactive: bool,
    /// Reuse object files from the primary example when building the
    /// others, skipping recompilation of the amalgamated sources.
    pub reuse_objects: bool,
    /// Invoke the pause hook between toolchain iterations.
    pub pause_between_toolchains: bool,
    /// How long a non-interactive example may run before it is killed
    /// and counted as passing.
    pub grace: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            toolchain_override: None,
            short: false,
            interactive: false,
            reuse_objects: false,
            pause_between_toolchains: false,
            grace: Duration::from_secs(1),
        }
    }
}

/// Result of verifying against one toolchain.
#[derive(Debug)]
pub struct ToolchainVerification {
    /// The toolchain verified against.
    pub toolchain: ToolchainVersion,
    /// Example projects that built successfully.
    pub examples_built: usize,
    /// Whether the shared-library sub-verification ran and passed.
    pub sharedlib_verified: bool,
    /// Execution warnings collected during the iteration.
    pub warnings: Vec<ShipflowWarning>,
}

/// Result of a whole verification run.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Per-toolchain results, in probe order.
    pub toolchains: Vec<ToolchainVerification>,
    /// Candidates that were not installed and were skipped.
    pub candidates_skipped: usize,
}

impl VerifyReport {
    /// Returns true if at least one toolchain was verified.
    #[must_use]
    pub fn any_verified(&self) -> bool {
        !self.toolchains.is_empty()
    }

    /// Returns the total number of warnings across all iterations.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.toolchains.iter().map(|t| t.warnings.len()).sum()
    }
}

/// Unpacks release archives and builds their projects against every
/// usable toolchain.
pub struct Verifier {
    options: VerifyOptions,
    pause_hook: Option<PauseHook>,
}

impl Verifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new(options: VerifyOptions) -> Self {
        Self {
            options,
            pause_hook: None,
        }
    }

    /// Installs the pause hook.
    #[must_use]
    pub fn with_pause_hook(mut self, hook: PauseHook) -> Self {
        self.pause_hook = Some(hook);
        self
    }

    /// Runs the verification loop against the archives in the context's
    /// base directory.
    pub async fn verify(&self, ctx: &StageContext) -> Result<VerifyReport, ShipflowError> {
        let config = &ctx.config;
        let full_variant = config
            .variants
            .iter()
            .find(|v| v.kind == VariantKind::Full)
            .ok_or_else(|| {
                ShipflowError::Config("verification requires a full package variant".to_string())
            })?;
        let full_archive = ctx.resolve(config.archive_name(full_variant));
        BuildArtifact::new(full_archive.clone(), crate::package::STAGE_NAME).verify()?;

        let locator = ToolchainLocator::from_config(&config.toolchain, self.options.toolchain_override)?;
        let mut report = VerifyReport::default();
        let candidates = locator.candidates().to_vec();

        for (index, candidate) in candidates.iter().enumerate() {
            let toolchain = match locator
                .probe(ctx.runner.as_ref(), candidate, &ctx.base_dir)
                .await
            {
                Ok(toolchain) => toolchain,
                Err(err) if err.is_recoverable() => {
                    info!(candidate = %candidate, reason = %err, "candidate skipped");
                    ctx.try_emit_event(
                        "toolchain.skipped",
                        Some(serde_json::json!({ "command": candidate })),
                    );
                    report.candidates_skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            info!(
                toolchain = %toolchain.command,
                version = toolchain.version.as_deref().unwrap_or("unknown"),
                "verifying release packages"
            );
            let scratch = tempfile::tempdir()?;
            let verification = self
                .verify_one_toolchain(ctx, &toolchain, &full_archive, full_variant.staging_name.as_str(), scratch.path())
                .await?;
            report.toolchains.push(verification);

            let more_to_come = index + 1 < candidates.len();
            if self.options.pause_between_toolchains && more_to_come {
                if let Some(hook) = &self.pause_hook {
                    if !hook(&toolchain.command) {
                        info!("remaining toolchain iterations stopped by operator");
                        break;
                    }
                }
            }
        }

        Ok(report)
    }

    async fn verify_one_toolchain(
        &self,
        ctx: &StageContext,
        toolchain: &ToolchainVersion,
        full_archive: &Path,
        full_staging_name: &str,
        scratch: &Path,
    ) -> Result<ToolchainVerification, ShipflowError> {
        let unpack_dir = scratch.join("full");
        fs::create_dir_all(&unpack_dir)?;
        extract_tar_gz(full_archive, &unpack_dir)?;
        let package_root = unpack_dir.join(full_staging_name);
        if !package_root.is_dir() {
            return Err(ShipflowError::missing_artifact(STAGE_NAME, package_root));
        }

        let mut verification = ToolchainVerification {
            toolchain: toolchain.clone(),
            examples_built: 0,
            sharedlib_verified: false,
            warnings: Vec::new(),
        };

        let examples = &ctx.config.verification.examples;
        let selected = if self.options.short {
            &examples[..examples.len().min(1)]
        } else {
            &examples[..]
        };
        let primary_dir = selected.first().map(|e| package_root.join(&e.path));

        for (index, example) in selected.iter().enumerate() {
            let project_dir = package_root.join(&example.path);
            if !project_dir.is_dir() {
                return Err(ShipflowError::missing_artifact(STAGE_NAME, project_dir));
            }

            if self.options.reuse_objects && index > 0 {
                if let Some(primary) = &primary_dir {
                    copy_object_files(primary, &project_dir)?;
                }
            }

            self.build_project(ctx, &toolchain.command, &project_dir).await?;
            verification.examples_built += 1;

            if let Some(warning) = self
                .run_built_executable(ctx, &project_dir, &example.executable, &[])
                .await
            {
                verification.warnings.push(warning);
            }
        }

        // Short mode builds only the primary example; the source and
        // shared-library packages are not exercised.
        if !self.options.short {
            if let Some(sharedlib) = &ctx.config.verification.sharedlib {
                verification.sharedlib_verified = self
                    .verify_sharedlib(ctx, toolchain, sharedlib, scratch, &mut verification.warnings)
                    .await?;
            }
        }

        Ok(verification)
    }

    async fn verify_sharedlib(
        &self,
        ctx: &StageContext,
        toolchain: &ToolchainVersion,
        sharedlib: &SharedLibVerification,
        scratch: &Path,
        warnings: &mut Vec<ShipflowWarning>,
    ) -> Result<bool, ShipflowError> {
        let config = &ctx.config;
        let variant = config
            .variants
            .iter()
            .find(|v| v.kind == VariantKind::SharedLib)
            .ok_or_else(|| {
                ShipflowError::Config(
                    "shared-library verification requires a sharedlib variant".to_string(),
                )
            })?;
        let archive = ctx.resolve(config.archive_name(variant));
        BuildArtifact::new(archive.clone(), crate::package::STAGE_NAME).verify()?;

        let unpack_dir = scratch.join("sharedlib");
        fs::create_dir_all(&unpack_dir)?;
        extract_tar_gz(&archive, &unpack_dir)?;
        let package_root = unpack_dir.join(&variant.staging_name);

        let compile_dir = package_root.join(&sharedlib.compile_dir);
        let usage_dir = package_root.join(&sharedlib.usage_dir);
        for dir in [&compile_dir, &usage_dir] {
            if !dir.is_dir() {
                return Err(ShipflowError::missing_artifact(STAGE_NAME, dir.clone()));
            }
        }

        self.place_amalgamated_sources(ctx, scratch, &package_root)?;

        self.build_project(ctx, &toolchain.command, &compile_dir).await?;
        copy_by_prefix(&compile_dir, &usage_dir, &sharedlib.library_prefix)?;
        self.build_project(ctx, &toolchain.command, &usage_dir).await?;

        // The usage executable loads the library from its own directory.
        let envs = [("LD_LIBRARY_PATH".to_string(), ".".to_string())];
        match self
            .run_built_executable(ctx, &usage_dir, &sharedlib.usage_executable, &envs)
            .await
        {
            None => Ok(true),
            Some(warning) => {
                warnings.push(warning);
                Ok(false)
            }
        }
    }

    /// Unpacks the source-only package and copies the two amalgamated
    /// files one level above the shared-library project directories,
    /// where those projects expect to find them. This also makes the
    /// `-source` archive part of every verification.
    fn place_amalgamated_sources(
        &self,
        ctx: &StageContext,
        scratch: &Path,
        sharedlib_root: &Path,
    ) -> Result<(), ShipflowError> {
        let config = &ctx.config;
        let variant = config
            .variants
            .iter()
            .find(|v| v.kind == VariantKind::SourceOnly)
            .ok_or_else(|| {
                ShipflowError::Config(
                    "shared-library verification requires a source-only variant".to_string(),
                )
            })?;
        let archive = ctx.resolve(config.archive_name(variant));
        BuildArtifact::new(archive.clone(), crate::package::STAGE_NAME).verify()?;

        let unpack_dir = scratch.join("source");
        fs::create_dir_all(&unpack_dir)?;
        extract_tar_gz(&archive, &unpack_dir)?;
        let source_root = unpack_dir.join(&variant.staging_name);

        for output in [
            &config.amalgamation.interface_output,
            &config.amalgamation.implementation_output,
        ] {
            let name = output.file_name().ok_or_else(|| {
                ShipflowError::Config(format!(
                    "amalgamation output '{}' has no file name",
                    output.display()
                ))
            })?;
            let from = source_root.join(name);
            if !from.is_file() {
                return Err(ShipflowError::missing_artifact(STAGE_NAME, from));
            }
            fs::copy(&from, sharedlib_root.join(name))?;
        }
        Ok(())
    }

    async fn build_project(
        &self,
        ctx: &StageContext,
        toolchain_command: &str,
        project_dir: &Path,
    ) -> Result<(), ShipflowError> {
        run_expecting_success(
            ctx,
            catalog::build_file_generator(toolchain_command.to_string()),
            project_dir,
        )
        .await?;
        run_expecting_success(
            ctx,
            catalog::build_driver(Platform::current(), ctx.config.toolchain.parallel_jobs),
            project_dir,
        )
        .await
    }

    /// Runs a built example executable. Returns a warning on failure;
    /// execution problems never fail the verification.
    async fn run_built_executable(
        &self,
        ctx: &StageContext,
        project_dir: &Path,
        executable: &str,
        envs: &[(String, String)],
    ) -> Option<ShipflowWarning> {
        let program = Platform::current().local_executable(executable);
        let mut invocation =
            ToolInvocation::new(ToolSpec::new("example-executable", program), project_dir);
        for (key, value) in envs {
            invocation = invocation.env(key.clone(), value.clone());
        }

        let result = if self.options.interactive {
            ctx.runner.run(&invocation).await
        } else {
            ctx.runner.run_with_grace(&invocation, self.options.grace).await
        };

        let path = project_dir.join(executable);
        match result {
            Ok(output) if output.success() => None,
            Ok(output) => {
                warn!(executable = %path.display(), exit = %output.describe_exit(), "example execution failed");
                Some(ShipflowWarning::BestEffortFailure {
                    path,
                    detail: output.describe_exit(),
                })
            }
            Err(err) => {
                warn!(executable = %path.display(), error = %err, "example could not be started");
                Some(ShipflowWarning::BestEffortFailure {
                    path,
                    detail: err.to_string(),
                })
            }
        }
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("options", &self.options)
            .field("pause_hook", &self.pause_hook.is_some())
            .finish()
    }
}

/// Copies compiled object files between example project directories.
fn copy_object_files(from: &Path, to: &Path) -> Result<(), ShipflowError> {
    let extension = Platform::current().object_extension();
    for entry in fs::read_dir(from)?.filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == extension) {
            if let Some(name) = path.file_name() {
                fs::copy(&path, to.join(name))?;
            }
        }
    }
    Ok(())
}

/// Copies files whose names start with `prefix` between directories.
fn copy_by_prefix(from: &Path, to: &Path, prefix: &str) -> Result<Vec<PathBuf>, ShipflowError> {
    let mut copied = Vec::new();
    for entry in fs::read_dir(from)?.filter_map(Result::ok) {
        let path = entry.path();
        let starts = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix));
        if starts && path.is_file() {
            if let Some(name) = path.file_name() {
                let dest = to.join(name);
                fs::copy(&path, &dest)?;
                copied.push(dest);
            }
        }
    }
    Ok(copied)
}
