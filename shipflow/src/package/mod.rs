//! Package assembly and archiving.
//!
//! Each variant goes through two steps: [`PackageAssembler`] builds a
//! staging directory from the variant's copy mappings, then
//! [`ArchiveWriter`] compresses it and moves the archive to the release
//! root. On archiving failure the staging directory is left in place
//! for inspection.

mod archive;
mod assembler;

pub use archive::ArchiveWriter;
pub use assembler::PackageAssembler;

/// Name used in missing-artifact diagnostics.
pub const STAGE_NAME: &str = "package";
