//! Shipflow command line.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use shipflow::prelude::*;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "shipflow",
    version,
    about = "Sequential build-and-release pipeline for source-distributed libraries"
)]
struct Cli {
    /// Base directory of the release checkout.
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Release configuration file (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Product name; uses the standard variant layout when no
    /// configuration file is given.
    #[arg(long, global = true)]
    product: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the release pipeline end to end.
    Release(ReleaseArgs),
    /// Unpack the shipped archives and build their example projects
    /// against every usable toolchain.
    Verify(VerifyArgs),
}

#[derive(Args)]
struct ReleaseArgs {
    /// Acknowledge the destructive repository clean without prompting.
    #[arg(long)]
    yes: bool,

    /// Leave the working directory as it is.
    #[arg(long)]
    skip_clean: bool,

    /// Skip documentation image generation and the documentation build.
    #[arg(long)]
    skip_docs: bool,

    /// Skip the full package variant.
    #[arg(long)]
    skip_full: bool,

    /// Skip the source-only package variant.
    #[arg(long)]
    skip_source: bool,

    /// Skip the shared-library package variant.
    #[arg(long)]
    skip_sharedlib: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct VerifyArgs {
    /// Verify against a single toolchain version, e.g. 474.
    #[arg(short = 'q', long = "qt")]
    qt: Option<u32>,

    /// Pause between toolchain iterations for manual inspection.
    #[arg(short, long)]
    pause: bool,

    /// Build only the primary example project.
    #[arg(short, long)]
    short: bool,

    /// Let example executables run until closed manually.
    #[arg(short, long)]
    interactive: bool,

    /// Reuse object files from the primary example across projects.
    #[arg(short, long)]
    reuse_object: bool,
}

fn load_config(cli: &Cli) -> Result<ReleaseConfig> {
    if let Some(path) = &cli.config {
        return ReleaseConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()));
    }
    if let Some(product) = &cli.product {
        return Ok(ReleaseConfig::for_product(product.clone()));
    }
    bail!("either --config or --product is required");
}

fn confirm_clean(reporter: &ConsoleReporter) -> Result<bool> {
    reporter.warn(
        "The clean stage runs 'git clean -dxf' and removes every untracked file. Type 'yes' to proceed:",
    );
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

async fn run_release(cli: &Cli, args: &ReleaseArgs) -> Result<()> {
    let reporter = ConsoleReporter::new();
    let config = Arc::new(load_config(cli)?);
    config.validate().context("invalid configuration")?;

    let acknowledged = if args.skip_clean {
        false
    } else if args.yes {
        true
    } else {
        confirm_clean(&reporter)?
    };
    if !args.skip_clean && !acknowledged {
        bail!("release aborted: repository clean was not acknowledged");
    }

    let mut builder = ReleasePipeline::builder().acknowledge_clean(acknowledged);
    if args.skip_clean {
        builder = builder.skip_clean();
    }
    if args.skip_docs {
        builder = builder.skip_docs();
    }
    if args.skip_full {
        builder = builder.skip_variant(VariantKind::Full);
    }
    if args.skip_source {
        builder = builder.skip_variant(VariantKind::SourceOnly);
    }
    if args.skip_sharedlib {
        builder = builder.skip_variant(VariantKind::SharedLib);
    }
    let pipeline = builder.build(&config);

    let ctx = StageContext::new(cli.dir.clone(), config).with_events(Arc::new(reporter));
    let report = pipeline.run(&ctx).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    for stage in &report.stages {
        for warning in &stage.output.warnings {
            reporter.warn(&format!("[{}] {warning}", stage.stage));
        }
    }

    if let Some(failed) = report.failed_stage() {
        bail!(
            "release failed at stage '{}': {}",
            failed.stage,
            failed.output.error.as_deref().unwrap_or("unknown error")
        );
    }
    reporter.info(&format!(
        "Release complete: {} stages, {} warnings.",
        report.stages.len(),
        report.warning_count()
    ));
    Ok(())
}

async fn run_verify(cli: &Cli, args: &VerifyArgs) -> Result<()> {
    let reporter = ConsoleReporter::new();
    let config = Arc::new(load_config(cli)?);
    config.validate().context("invalid configuration")?;

    let options = VerifyOptions {
        toolchain_override: args.qt,
        short: args.short,
        interactive: args.interactive,
        reuse_objects: args.reuse_object,
        pause_between_toolchains: args.pause,
        ..VerifyOptions::default()
    };
    let verifier = Verifier::new(options).with_pause_hook(Box::new(|toolchain: &str| {
        println!("Finished with toolchain '{toolchain}'. Press enter to continue, or 'q' to stop.");
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        !line.trim().eq_ignore_ascii_case("q")
    }));

    let ctx = StageContext::new(cli.dir.clone(), config);
    let report = verifier.verify(&ctx).await?;

    for verification in &report.toolchains {
        reporter.info(&format!(
            "{} ({}): {} example project(s) built{}",
            verification.toolchain.command,
            verification.toolchain.version.as_deref().unwrap_or("unknown version"),
            verification.examples_built,
            if verification.sharedlib_verified {
                ", shared library verified"
            } else {
                ""
            }
        ));
        for warning in &verification.warnings {
            reporter.warn(&warning.to_string());
        }
    }
    if report.candidates_skipped > 0 {
        reporter.warn(&format!(
            "{} toolchain candidate(s) not installed, skipped.",
            report.candidates_skipped
        ));
    }
    if !report.any_verified() {
        bail!("no toolchain could be verified");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Release(args) => run_release(&cli, args).await,
        Command::Verify(args) => run_verify(&cli, args).await,
    }
}
