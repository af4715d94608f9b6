//! Specifications for the external tools the pipeline drives.
//!
//! Each function describes one collaborator's invocation contract. The
//! build driver is the only tool with platform-dependent shape; see
//! [`Platform`](crate::toolchain::Platform).

use super::ToolSpec;
use crate::toolchain::Platform;
use std::path::Path;

/// Resets the working directory to a pristine checkout.
///
/// Destructive: removes everything the version-control ignore rules
/// exclude. Callers must obtain operator confirmation first.
#[must_use]
pub fn repository_cleaner() -> ToolSpec {
    ToolSpec::new("repository-cleaner", "git").args(["clean", "-dxf"])
}

/// The build-file generator for one toolchain version, run in a project
/// directory with no arguments.
#[must_use]
pub fn build_file_generator(command: impl Into<String>) -> ToolSpec {
    ToolSpec::new("build-file-generator", command)
}

/// Version probe for a toolchain candidate. Stdout-line contract: the
/// second non-empty line names the runtime version the candidate
/// builds against.
#[must_use]
pub fn version_probe(command: impl Into<String>, flag: impl Into<String>) -> ToolSpec {
    ToolSpec::new("version-probe", command).arg(flag)
}

/// The native build driver. May internally fan out compilation jobs;
/// the pipeline only waits for its all-or-nothing exit.
#[must_use]
pub fn build_driver(platform: Platform, parallel_jobs: u32) -> ToolSpec {
    let program = platform.build_driver();
    let mut spec = ToolSpec::new("build-driver", program);
    if platform.driver_supports_parallel_jobs() {
        spec = spec.arg(format!("-j{parallel_jobs}"));
    }
    spec
}

/// The documentation generator, run in the documentation directory with
/// no arguments.
#[must_use]
pub fn documentation_generator() -> ToolSpec {
    ToolSpec::new("documentation-generator", "doxygen")
}

/// The palette-reduction image tool, run per file with a numeric color
/// count.
#[must_use]
pub fn palette_reducer(colors: u16, file: &Path) -> ToolSpec {
    ToolSpec::new("palette-reducer", "mogrify")
        .args(["-colorspace", "RGB"])
        .arg("-colors")
        .arg(colors.to_string())
        .arg("+dither")
        .arg(file.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cleaner_contract() {
        let spec = repository_cleaner();
        assert_eq!(spec.program, "git");
        assert_eq!(spec.args, vec!["clean", "-dxf"]);
    }

    #[test]
    fn palette_reducer_contract() {
        let spec = palette_reducer(64, &PathBuf::from("html/chart.png"));
        assert_eq!(spec.program, "mogrify");
        assert_eq!(
            spec.args,
            vec!["-colorspace", "RGB", "-colors", "64", "+dither", "html/chart.png"]
        );
    }

    #[test]
    fn build_driver_parallelism_depends_on_platform() {
        let linux = build_driver(Platform::Linux, 5);
        assert_eq!(linux.program, "make");
        assert_eq!(linux.args, vec!["-j5"]);

        let windows = build_driver(Platform::Windows, 5);
        assert_eq!(windows.program, "jom");
        assert_eq!(windows.args, vec!["-j5"]);
    }

}
