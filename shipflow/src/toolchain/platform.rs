//! Host platform dispatch.
//!
//! Platform-dependent behavior goes through this enum and a `match`,
//! never through name-keyed lookups.

use serde::{Deserialize, Serialize};

/// The host platform the pipeline runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Windows hosts.
    Windows,
    /// Linux hosts.
    Linux,
    /// Everything else.
    Other,
}

impl Platform {
    /// Detects the current host platform.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    /// The default native build driver for this platform.
    #[must_use]
    pub fn build_driver(self) -> &'static str {
        match self {
            Self::Windows => "jom",
            Self::Linux | Self::Other => "make",
        }
    }

    /// Whether the build driver accepts a `-j` job count.
    #[must_use]
    pub fn driver_supports_parallel_jobs(self) -> bool {
        match self {
            // nmake would not, but the default Windows driver is jom.
            Self::Windows | Self::Linux | Self::Other => true,
        }
    }

    /// Invocation of an executable sitting in the working directory.
    #[must_use]
    pub fn local_executable(self, name: &str) -> String {
        match self {
            Self::Windows => format!("{name}.exe"),
            Self::Linux | Self::Other => format!("./{name}"),
        }
    }

    /// The object-file extension the native compiler emits.
    #[must_use]
    pub fn object_extension(self) -> &'static str {
        match self {
            Self::Windows => "obj",
            Self::Linux | Self::Other => "o",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_executables() {
        assert_eq!(Platform::Linux.local_executable("plots"), "./plots");
        assert_eq!(Platform::Windows.local_executable("plots"), "plots.exe");
    }

    #[test]
    fn drivers() {
        assert_eq!(Platform::Linux.build_driver(), "make");
        assert_eq!(Platform::Windows.build_driver(), "jom");
    }

    #[test]
    fn current_is_consistent() {
        // Smoke check: detection never panics and is stable.
        assert_eq!(Platform::current(), Platform::current());
    }
}
