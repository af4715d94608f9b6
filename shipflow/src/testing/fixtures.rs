//! Release-tree fixtures.

#![allow(clippy::expect_used)]

use crate::config::{ExampleProject, ReleaseConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A temporary checkout containing everything a full release run
/// consumes: source fragments, license and changelog files, a demo
/// project, generated documentation HTML, and the shared-library build
/// projects.
#[derive(Debug)]
pub struct ReleaseTreeFixture {
    dir: TempDir,
}

impl ReleaseTreeFixture {
    /// Creates a populated release tree.
    ///
    /// # Panics
    ///
    /// Panics if the temporary tree cannot be created. Test-only code.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create fixture dir");
        let base = dir.path();

        fs::create_dir_all(base.join("src")).expect("create src");
        fs::write(base.join("src/quickchart_core.h"), "// core decl\n").expect("write fragment");
        fs::write(base.join("src/quickchart_items.h"), "// items decl\n").expect("write fragment");
        fs::write(base.join("src/quickchart_core.cpp"), "// core impl\n").expect("write fragment");
        fs::write(base.join("src/quickchart_items.cpp"), "// items impl\n")
            .expect("write fragment");

        fs::write(base.join("GPL.txt"), "license text\n").expect("write license");
        fs::write(base.join("changelog.txt"), "1.0.0\n").expect("write changelog");

        fs::create_dir_all(base.join("demos/plots/screenshots")).expect("create demos");
        fs::write(base.join("demos/plots/plots.pro"), "TEMPLATE = app\n").expect("write demo");
        fs::write(base.join("demos/plots/main.cpp"), "int main() {}\n").expect("write demo");
        fs::write(base.join("demos/plots/screenshots/shot.png"), "png").expect("write demo");
        fs::write(base.join("demos/.gitignore"), "*.o\n").expect("write ignore file");

        let html = base.join("documentation/html");
        fs::create_dir_all(&html).expect("create html dir");
        for file in [
            "pages.html",
            "annotated.html",
            "hierarchy.html",
            "inherits.html",
            "classoverview.html",
        ] {
            fs::write(
                html.join(file),
                "<div class=\"title\">Related Pages</div>\n",
            )
            .expect("write html");
        }
        fs::write(html.join("tab_b.png"), b"\x89PNG").expect("write image");

        fs::create_dir_all(base.join("documentation/doc-image-generator"))
            .expect("create generator dir");
        fs::write(
            base.join("documentation/doc-image-generator/doc-image-generator.pro"),
            "TEMPLATE = app\n",
        )
        .expect("write generator project");

        fs::create_dir_all(base.join("sharedlib/sharedlib-compilation")).expect("create sharedlib");
        fs::create_dir_all(base.join("sharedlib/sharedlib-usage")).expect("create sharedlib");
        fs::write(
            base.join("sharedlib/sharedlib-compilation/sharedlib.pro"),
            "TEMPLATE = lib\n",
        )
        .expect("write sharedlib project");

        Self { dir }
    }

    /// The tree's root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A release configuration matching the fixture's layout, probing
    /// only the always-present `true` binary as its toolchain.
    #[must_use]
    pub fn config(&self) -> ReleaseConfig {
        let mut config = ReleaseConfig::for_product("QuickChart");
        config.toolchain.candidates = vec!["true".to_string()];
        config.amalgamation.interface_fragments = vec![
            "src/quickchart_core.h".into(),
            "src/quickchart_items.h".into(),
        ];
        config.amalgamation.implementation_fragments = vec![
            "src/quickchart_core.cpp".into(),
            "src/quickchart_items.cpp".into(),
        ];
        config.verification.examples = vec![ExampleProject::new("demos/plots", "plots")];
        config
    }
}

impl Default for ReleaseTreeFixture {
    fn default() -> Self {
        Self::new()
    }
}
