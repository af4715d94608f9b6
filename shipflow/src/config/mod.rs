//! Release configuration.
//!
//! A [`ReleaseConfig`] describes one product's release run: the
//! toolchain candidates to probe, the source fragments to amalgamate,
//! the documentation post-processing tables, the package variants to
//! assemble, and the verification projects. All paths are relative to
//! the run's base directory; nothing in the pipeline consults ambient
//! process state.
//!
//! The rewrite-rule and palette tables are fixed per product because the
//! external documentation generator's output set is stable across
//! versions except for incidental drift, which the warning path catches.

use crate::errors::ShipflowError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The kind of a package variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantKind {
    /// Full package: sources, documentation and examples.
    Full,
    /// Amalgamated sources and licensing files only.
    SourceOnly,
    /// Shared-library build projects.
    SharedLib,
}

impl std::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Full => "full",
            Self::SourceOnly => "source-only",
            Self::SharedLib => "sharedlib",
        };
        write!(f, "{s}")
    }
}

/// A single source path copied into a variant's staging directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyMapping {
    /// Source path, relative to the base directory.
    pub from: PathBuf,
    /// Destination inside the staging directory. `.` copies into the
    /// staging root.
    pub to: PathBuf,
}

impl CopyMapping {
    /// Creates a mapping.
    #[must_use]
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a mapping into the staging root.
    #[must_use]
    pub fn into_root(from: impl Into<PathBuf>) -> Self {
        Self::new(from, ".")
    }
}

/// Configuration for one package variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Variant kind.
    pub kind: VariantKind,
    /// Directory name used for staging and as the archive's top-level
    /// entry.
    pub staging_name: String,
    /// Archive file name without the compression suffix.
    pub archive_stem: String,
    /// Paths copied into the staging directory.
    pub sources: Vec<CopyMapping>,
    /// Paths removed from the staging directory after copying.
    #[serde(default)]
    pub prune: Vec<PathBuf>,
    /// Whether the variant is built. Disabled variants are skipped
    /// without affecting the others.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Toolchain probing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Candidate build-file generator commands, probed in order.
    pub candidates: Vec<String>,
    /// Flag passed to a candidate to query its version.
    #[serde(default = "default_version_flag")]
    pub version_flag: String,
    /// Parallel job count handed to the build driver.
    #[serde(default = "default_jobs")]
    pub parallel_jobs: u32,
}

fn default_version_flag() -> String {
    "-v".to_string()
}

fn default_jobs() -> u32 {
    4
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            candidates: default_toolchain_candidates(),
            version_flag: default_version_flag(),
            parallel_jobs: default_jobs(),
        }
    }
}

/// The fixed candidate list probed when no override is given.
#[must_use]
pub fn default_toolchain_candidates() -> Vec<String> {
    [
        "qmake464", "qmake474", "qmake486", "qmake501", "qmake511", "qmake520", "qmake532",
        "qmake540",
    ]
    .iter()
    .map(std::string::ToString::to_string)
    .collect()
}

/// Source amalgamation configuration.
///
/// Fragment order is a build-time constant, never computed; the merge is
/// a deterministic byte concatenation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmalgamationConfig {
    /// Fragments of the interface declaration file, in merge order.
    pub interface_fragments: Vec<PathBuf>,
    /// Fragments of the implementation file, in merge order.
    pub implementation_fragments: Vec<PathBuf>,
    /// Output path of the interface declaration file.
    pub interface_output: PathBuf,
    /// Output path of the implementation file.
    pub implementation_output: PathBuf,
}

/// One ordered HTML rewrite rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Regex applied to every line.
    pub pattern: String,
    /// Replacement text.
    pub replacement: String,
}

impl RewriteRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// One palette-reduction table entry.
///
/// `pattern` is a file name with at most one `*` wildcard. A color
/// count of 0 marks the file as already optimized: it is covered by the
/// table but not recompressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteEntry {
    /// File name pattern within the HTML output directory.
    pub pattern: String,
    /// Target palette size; 0 skips recompression.
    pub colors: u16,
}

impl PaletteEntry {
    /// Creates a table entry.
    #[must_use]
    pub fn new(pattern: impl Into<String>, colors: u16) -> Self {
        Self {
            pattern: pattern.into(),
            colors,
        }
    }
}

/// Documentation build and post-processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentationConfig {
    /// Directory the external generator writes HTML into.
    pub html_dir: PathBuf,
    /// Project directory of the documentation image generator.
    pub image_generator_dir: PathBuf,
    /// Executable name the image generator project builds.
    pub image_generator_executable: String,
    /// HTML files the rewrite pass must find and transform.
    pub rewrite_files: Vec<String>,
    /// Ordered rewrite rules applied to every line of every file.
    pub rewrite_rules: Vec<RewriteRule>,
    /// Palette-reduction expectation table.
    pub palette_table: Vec<PaletteEntry>,
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            html_dir: PathBuf::from("documentation/html"),
            image_generator_dir: PathBuf::from("documentation/doc-image-generator"),
            image_generator_executable: "doc-image-generator".to_string(),
            rewrite_files: vec![
                "pages.html".to_string(),
                "annotated.html".to_string(),
                "hierarchy.html".to_string(),
                "inherits.html".to_string(),
                "classoverview.html".to_string(),
            ],
            rewrite_rules: default_rewrite_rules(),
            palette_table: default_palette_table(),
        }
    }
}

/// The default HTML fixups for the external documentation generator's
/// stock output.
#[must_use]
pub fn default_rewrite_rules() -> Vec<RewriteRule> {
    vec![
        RewriteRule::new(
            "<div class=\"title\">Related Pages</div>",
            "<div class=\"title\">Special Pages</div>",
        ),
        RewriteRule::new(
            "<div class=\"textblock\">Here is a list of all related documentation pages:</div>",
            "",
        ),
        RewriteRule::new(
            "<div class=\"textblock\">Here are the data structures with brief descriptions:</div>",
            "",
        ),
        RewriteRule::new(
            "This inheritance list is sorted roughly, but not completely, alphabetically:",
            "",
        ),
        RewriteRule::new(
            "<div class=\"levels\">\\[detail level (<span onclick=\"javascript:toggleLevel\\(\\d\\);\">\\d</span>)+\\]</div>",
            "",
        ),
        RewriteRule::new("Go to the graphical class hierarchy", "Switch to graphical view"),
        RewriteRule::new("Go to the textual class hierarchy", "Switch to list view"),
    ]
}

/// The default palette table for the generator's own images. Product
/// images are appended per product.
#[must_use]
pub fn default_palette_table() -> Vec<PaletteEntry> {
    let mut table = vec![
        PaletteEntry::new("class*__inherit__graph.png", 16),
        PaletteEntry::new("inherit_graph_*.png", 16),
        PaletteEntry::new("ftv2*.png", 16),
        PaletteEntry::new("tab_*.png", 16),
        PaletteEntry::new("nav_*.png", 16),
        PaletteEntry::new("closed.png", 16),
        PaletteEntry::new("open.png", 16),
        PaletteEntry::new("bdwn.png", 16),
        PaletteEntry::new("bc_s.png", 16),
        PaletteEntry::new("sync_off.png", 16),
        PaletteEntry::new("sync_on.png", 16),
    ];
    table.push(PaletteEntry::new("doxygen.png", 2));
    table
}

/// One example project built and run during verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleProject {
    /// Project directory, relative to the unpacked full package.
    pub path: PathBuf,
    /// Executable name the project builds.
    pub executable: String,
}

impl ExampleProject {
    /// Creates an example project entry.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, executable: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            executable: executable.into(),
        }
    }
}

/// Shared-library verification sub-step configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedLibVerification {
    /// Directory of the library compilation project, relative to the
    /// unpacked shared-library package.
    pub compile_dir: PathBuf,
    /// Directory of the usage project.
    pub usage_dir: PathBuf,
    /// Executable name the usage project builds.
    pub usage_executable: String,
    /// File-name prefix of the built library artifacts copied to the
    /// usage project.
    pub library_prefix: String,
}

/// Verification loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VerificationConfig {
    /// Example projects built from the unpacked full package. The first
    /// entry is the primary example; short mode builds only that one.
    pub examples: Vec<ExampleProject>,
    /// Shared-library sub-verification, if the product ships one.
    pub sharedlib: Option<SharedLibVerification>,
}

/// Complete configuration of a release run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Product name; archives are named `<product><suffix>` etc.
    pub product: String,
    /// Compression suffix of the release archives.
    #[serde(default = "default_suffix")]
    pub archive_suffix: String,
    /// Toolchain probing settings.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    /// Source amalgamation settings.
    pub amalgamation: AmalgamationConfig,
    /// Documentation build and post-processing settings.
    #[serde(default)]
    pub documentation: DocumentationConfig,
    /// Package variants, assembled in order.
    pub variants: Vec<VariantConfig>,
    /// Verification loop settings.
    #[serde(default)]
    pub verification: VerificationConfig,
}

fn default_suffix() -> String {
    ".tar.gz".to_string()
}

impl ReleaseConfig {
    /// Creates a configuration with the standard three variants for a
    /// product whose amalgamated sources are `<stem>.h` / `<stem>.cpp`.
    #[must_use]
    pub fn for_product(product: impl Into<String>) -> Self {
        let product = product.into();
        let stem = product.to_lowercase();
        let header = PathBuf::from(format!("{stem}.h"));
        let implementation = PathBuf::from(format!("{stem}.cpp"));

        let full = VariantConfig {
            kind: VariantKind::Full,
            staging_name: stem.clone(),
            archive_stem: product.clone(),
            sources: vec![
                CopyMapping::new("documentation/html", "documentation/html"),
                CopyMapping::new(header.clone(), "."),
                CopyMapping::new(implementation.clone(), "."),
                CopyMapping::into_root("GPL.txt"),
                CopyMapping::into_root("changelog.txt"),
                CopyMapping::new("demos", "demos"),
            ],
            prune: vec![PathBuf::from("demos/plots/screenshots")],
            enabled: true,
        };
        let source_only = VariantConfig {
            kind: VariantKind::SourceOnly,
            staging_name: format!("{stem}-source"),
            archive_stem: format!("{product}-source"),
            sources: vec![
                CopyMapping::new(header, "."),
                CopyMapping::new(implementation, "."),
                CopyMapping::into_root("GPL.txt"),
                CopyMapping::into_root("changelog.txt"),
            ],
            prune: Vec::new(),
            enabled: true,
        };
        let sharedlib = VariantConfig {
            kind: VariantKind::SharedLib,
            staging_name: format!("{stem}-sharedlib"),
            archive_stem: format!("{product}-sharedlib"),
            sources: vec![CopyMapping::new("sharedlib", ".")],
            prune: Vec::new(),
            enabled: true,
        };

        Self {
            product,
            archive_suffix: default_suffix(),
            toolchain: ToolchainConfig::default(),
            amalgamation: AmalgamationConfig {
                interface_fragments: Vec::new(),
                implementation_fragments: Vec::new(),
                interface_output: full.sources[1].from.clone(),
                implementation_output: full.sources[2].from.clone(),
            },
            documentation: DocumentationConfig::default(),
            variants: vec![full, source_only, sharedlib],
            verification: VerificationConfig::default(),
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ShipflowError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, ShipflowError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ShipflowError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field invariants.
    pub fn validate(&self) -> Result<(), ShipflowError> {
        if self.product.is_empty() {
            return Err(ShipflowError::Config("product name is empty".to_string()));
        }
        if self.variants.is_empty() {
            return Err(ShipflowError::Config(
                "no package variants declared".to_string(),
            ));
        }
        for entry in &self.documentation.palette_table {
            if entry.pattern.matches('*').count() > 1 {
                return Err(ShipflowError::Config(format!(
                    "palette pattern '{}' has more than one wildcard",
                    entry.pattern
                )));
            }
        }
        Ok(())
    }

    /// Returns the archive file name for a variant.
    #[must_use]
    pub fn archive_name(&self, variant: &VariantConfig) -> String {
        format!("{}{}", variant.archive_stem, self.archive_suffix)
    }

    /// Returns the enabled variants in declaration order.
    #[must_use]
    pub fn enabled_variants(&self) -> Vec<&VariantConfig> {
        self.variants.iter().filter(|v| v.enabled).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn for_product_declares_three_variants() {
        let config = ReleaseConfig::for_product("QuickChart");
        assert_eq!(config.variants.len(), 3);
        assert_eq!(config.variants[0].kind, VariantKind::Full);
        assert_eq!(config.archive_name(&config.variants[0]), "QuickChart.tar.gz");
        assert_eq!(
            config.archive_name(&config.variants[1]),
            "QuickChart-source.tar.gz"
        );
        assert_eq!(
            config.archive_name(&config.variants[2]),
            "QuickChart-sharedlib.tar.gz"
        );
    }

    #[test]
    fn disabled_variants_are_filtered() {
        let mut config = ReleaseConfig::for_product("QuickChart");
        config.variants[2].enabled = false;
        assert_eq!(config.enabled_variants().len(), 2);
    }

    #[test]
    fn default_candidates_are_ordered() {
        let candidates = default_toolchain_candidates();
        assert_eq!(candidates.first().map(String::as_str), Some("qmake464"));
        assert_eq!(candidates.last().map(String::as_str), Some("qmake540"));
    }

    #[test]
    fn json_roundtrip() {
        let config = ReleaseConfig::for_product("QuickChart");
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = ReleaseConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.product, "QuickChart");
        assert_eq!(parsed.variants.len(), 3);
    }

    #[test]
    fn empty_product_is_rejected() {
        let mut config = ReleaseConfig::for_product("QuickChart");
        config.product = String::new();
        assert!(matches!(
            config.validate(),
            Err(ShipflowError::Config(_))
        ));
    }

    #[test]
    fn double_wildcard_pattern_is_rejected() {
        let mut config = ReleaseConfig::for_product("QuickChart");
        config
            .documentation
            .palette_table
            .push(PaletteEntry::new("a*b*.png", 8));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rewrite_rules_keep_listed_order() {
        let rules = default_rewrite_rules();
        assert!(rules[0].pattern.contains("Related Pages"));
        assert_eq!(rules[0].replacement, "<div class=\"title\">Special Pages</div>");
    }
}
