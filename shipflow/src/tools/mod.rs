//! External tool modeling and execution.
//!
//! Every external collaborator of the pipeline is described by a narrow
//! [`ToolSpec`] (program, required arguments, exit-code contract) and
//! executed through the [`ToolRunner`] seam. Orchestration code never
//! constructs ad hoc shell strings.

pub mod catalog;
mod runner;
mod spec;

pub use runner::{ProcessRunner, ToolRunner};
pub use spec::{ToolInvocation, ToolOutput, ToolSpec};
