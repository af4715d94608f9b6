//! Toolchain discovery and platform dispatch.

mod locator;
mod platform;

pub use locator::{ToolchainLocator, ToolchainVersion};
pub use platform::Platform;
