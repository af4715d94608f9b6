//! Core value types shared by all pipeline stages.

mod artifact;
mod output;
mod status;

pub use artifact::BuildArtifact;
pub use output::StageOutput;
pub use status::StageStatus;
