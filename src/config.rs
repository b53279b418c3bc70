//! Configuration management for esmify.
//!
//! Options are layered: built-in defaults, then the `"esmify"` key of the
//! project package.json, then command line flags. All paths are resolved
//! against the project root before the pipeline sees them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::error::{EsmifyError, Result};

/// Extension (without dot) of the files picked up from the input trees.
pub const SOURCE_EXTENSION: &str = "js";

/// Directory name of the dependency cache, excluded from collection and
/// used as the probe root for bare specifiers.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// A configured prefix rewrite for bare module specifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasRule {
    /// Alias name, matched as a whole leading path segment
    pub name: String,

    /// Optional custom match pattern; overrides the name-prefix match
    #[serde(default)]
    pub find: Option<String>,

    /// Replacement path substituted for the matched prefix
    pub path: String,
}

/// Options for one conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionOptions {
    /// Source directories to convert
    pub input: Vec<PathBuf>,

    /// Output directory, owned exclusively by one run
    pub output: PathBuf,

    /// Extension for converted files, including the dot
    pub extension: String,

    /// Specifier patterns exempt from rewriting
    pub ignore: Vec<String>,

    /// Alias rules applied to import specifiers
    pub aliases: Vec<AliasRule>,

    /// Keep the input directory name under the output root even for a
    /// single input
    pub force_directory: bool,

    /// Add a "module" entry to the project package.json
    pub add_module_entry: bool,

    /// Write a package.json declaring the output tree an ES module tree
    pub add_output_manifest: bool,

    /// Source-path patterns of files carrying an interpreter directive
    pub files_with_shebang: Vec<String>,

    /// Number of files processed concurrently within a pass
    pub concurrency: usize,

    /// Project root the run was invoked from
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            input: vec![PathBuf::from("src")],
            output: PathBuf::from("esm"),
            extension: ".mjs".to_string(),
            ignore: Vec::new(),
            aliases: Vec::new(),
            force_directory: false,
            add_module_entry: true,
            add_output_manifest: true,
            files_with_shebang: Vec::new(),
            concurrency: num_cpus::get() * 2,
            project_root: PathBuf::from("."),
        }
    }
}

impl ConversionOptions {
    /// Load options for a project directory, applying CLI overrides.
    pub fn load(project_root: &Path, cli: &Cli) -> Result<Self> {
        let mut options = Self::from_package_json(project_root)?;

        if !cli.input.is_empty() {
            options.input = cli.input.clone();
        }
        if let Some(ref output) = cli.output {
            options.output = output.clone();
        }
        if let Some(ref extension) = cli.extension {
            options.extension = extension.clone();
        }
        if cli.force_directory {
            options.force_directory = true;
        }
        if cli.no_module_entry {
            options.add_module_entry = false;
        }
        if cli.no_output_manifest {
            options.add_output_manifest = false;
        }
        if let Some(concurrency) = cli.concurrency {
            options.concurrency = concurrency;
        }

        options.resolve_paths(project_root);
        options.validate()?;

        Ok(options)
    }

    /// Read the `"esmify"` key of the project package.json, if present.
    fn from_package_json(project_root: &Path) -> Result<Self> {
        let manifest = project_root.join("package.json");
        if !manifest.is_file() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&manifest)?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| EsmifyError::InvalidPackageJson(e.to_string()))?;

        match value.get("esmify") {
            Some(section) => serde_json::from_value(section.clone())
                .map_err(|e| EsmifyError::Config(format!("invalid esmify section: {}", e))),
            None => Ok(Self::default()),
        }
    }

    /// Anchor input and output paths at the project root.
    fn resolve_paths(&mut self, project_root: &Path) {
        self.project_root = project_root.to_path_buf();
        for input in &mut self.input {
            *input = project_root.join(&*input);
        }
        self.output = project_root.join(&self.output);
    }

    /// Reject options the pipeline cannot honor.
    fn validate(&self) -> Result<()> {
        if self.input.is_empty() {
            return Err(EsmifyError::Config("no input directories".into()));
        }
        if !self.extension.starts_with('.') {
            return Err(EsmifyError::Config(format!(
                "extension must include the leading dot: {}",
                self.extension
            )));
        }
        if self.concurrency == 0 {
            return Err(EsmifyError::Config("concurrency must be at least 1".into()));
        }

        // Compile every configured pattern once so bad ones fail the run
        // up front instead of mid-pass.
        for pattern in self
            .ignore
            .iter()
            .chain(self.files_with_shebang.iter())
            .chain(self.aliases.iter().filter_map(|a| a.find.as_ref()))
        {
            compile_pattern(pattern)?;
        }

        Ok(())
    }

    /// Dependency cache root for bare-specifier probing.
    pub fn dependency_root(&self) -> PathBuf {
        self.project_root.join(DEPENDENCY_DIR)
    }
}

/// Compile a configured pattern, mapping failures to a config error.
pub fn compile_pattern(pattern: &str) -> Result<regex::Regex> {
    regex::Regex::new(pattern).map_err(|e| EsmifyError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
