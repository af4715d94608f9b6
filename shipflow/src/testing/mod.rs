//! Test support: scripted tool runners and release-tree fixtures.
//!
//! Shipped as a regular module so integration tests and downstream
//! consumers can drive the pipeline without spawning real build tools.

mod fixtures;
mod mocks;

pub use fixtures::ReleaseTreeFixture;
pub use mocks::ScriptedRunner;
