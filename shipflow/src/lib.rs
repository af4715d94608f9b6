//! # Shipflow
//!
//! A sequential build-and-release pipeline for source-distributed
//! libraries.
//!
//! Shipflow drives one release run end to end:
//!
//! - **Toolchain discovery**: probe versioned build-file generators and
//!   skip the ones that are not installed
//! - **Source amalgamation**: merge ordered source fragments into the
//!   two distributable files
//! - **Documentation post-processing**: fix up generated HTML and
//!   recompress image palettes, best effort
//! - **Packaging**: assemble staging directories per variant and ship
//!   them as gzip tar archives
//! - **Verification**: unpack the shipped archives and build their
//!   example projects against every usable toolchain
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shipflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = Arc::new(ReleaseConfig::for_product("QuickChart"));
//! let ctx = StageContext::new("/path/to/checkout", config.clone());
//!
//! let pipeline = ReleasePipeline::builder()
//!     .acknowledge_clean(true)
//!     .build(&config);
//! let report = pipeline.run(&ctx).await;
//! assert!(report.is_success());
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

pub mod amalgamate;
pub mod config;
pub mod context;
pub mod core;
pub mod docs;
pub mod errors;
pub mod events;
pub mod observability;
pub mod package;
pub mod pipeline;
pub mod testing;
pub mod toolchain;
pub mod tools;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::amalgamate::SourceAmalgamator;
    pub use crate::config::{
        AmalgamationConfig, CopyMapping, DocumentationConfig, PaletteEntry, ReleaseConfig,
        RewriteRule, ToolchainConfig, VariantConfig, VariantKind, VerificationConfig,
    };
    pub use crate::context::{RunIdentity, StageContext};
    pub use crate::core::{BuildArtifact, StageOutput, StageStatus};
    pub use crate::docs::{HtmlRewriter, ImageCompressor};
    pub use crate::errors::{ShipflowError, ShipflowWarning};
    pub use crate::events::{
        CollectingEventSink, ConsoleReporter, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::package::{ArchiveWriter, PackageAssembler};
    pub use crate::pipeline::{
        ReleasePipeline, ReleaseState, RunReport, Stage, StageReport, Verifier, VerifyOptions,
        VerifyReport,
    };
    pub use crate::toolchain::{Platform, ToolchainLocator, ToolchainVersion};
    pub use crate::tools::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner, ToolSpec};
}
