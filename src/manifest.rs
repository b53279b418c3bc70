//! Package.json reading and patching.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{ConversionOptions, SOURCE_EXTENSION};
use crate::copier::CopiedFile;
use crate::error::{EsmifyError, Result};

/// The package.json fields the tool reads or writes. Everything else is
/// carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageJson {
    /// Package name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Package version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Main entry point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    /// Module entry point (ES modules)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Package type (commonjs or module)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub package_type: Option<String>,

    /// Production dependencies
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    /// Additional fields not explicitly defined
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PackageJson {
    /// Read package.json from a file path.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EsmifyError::PackageJsonNotFound(
                    path.as_ref()
                        .parent()
                        .unwrap_or(path.as_ref())
                        .display()
                        .to_string(),
                )
            } else {
                e.into()
            }
        })?;
        serde_json::from_str(&content).map_err(|e| EsmifyError::InvalidPackageJson(e.to_string()))
    }

    /// Write package.json to a file path.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content + "\n")?;
        Ok(())
    }
}

/// Patches the project manifest after a successful transformation.
pub struct ManifestPatcher<'a> {
    options: &'a ConversionOptions,
}

impl<'a> ManifestPatcher<'a> {
    pub fn new(options: &'a ConversionOptions) -> Self {
        Self { options }
    }

    /// Point the project manifest's `module` field at the converted
    /// entry file. Best-effort: a missing manifest, a missing `main`
    /// field, or an entry file outside the copied set is a warning,
    /// not an error.
    pub fn update_module_entry(&self, files: &[CopiedFile]) -> Result<Option<String>> {
        let manifest_path = self.options.project_root.join("package.json");
        if !manifest_path.is_file() {
            warn!("no package.json at project root, skipping module entry");
            return Ok(None);
        }

        let mut manifest = PackageJson::read(&manifest_path)?;
        let Some(ref main) = manifest.main else {
            warn!("package.json has no main field, skipping module entry");
            return Ok(None);
        };

        let declared = self.options.project_root.join(main);
        let Some(entry) = self.resolve_entry(&declared) else {
            warn!("entry file {} does not exist, skipping module entry", declared.display());
            return Ok(None);
        };

        let Some(copied) = files.iter().find(|f| f.from == entry) else {
            warn!(
                "entry file {} was not part of the converted tree, skipping module entry",
                entry.display()
            );
            return Ok(None);
        };

        let relative = pathdiff::diff_paths(&copied.to, &self.options.project_root)
            .unwrap_or_else(|| copied.to.clone());
        let mut pointer = relative.to_string_lossy().replace('\\', "/");
        if !pointer.starts_with('.') {
            pointer = format!("./{}", pointer);
        }

        manifest.module = Some(pointer.clone());
        manifest.write(&manifest_path)?;
        info!("module entry set to {}", pointer);
        Ok(Some(pointer))
    }

    /// Resolve the declared entry the same way specifier resolution
    /// handles directories: exact file, file with the source extension
    /// appended, or an index entry file.
    fn resolve_entry(&self, declared: &Path) -> Option<PathBuf> {
        if declared.is_file() {
            return Some(declared.to_path_buf());
        }

        let appended = PathBuf::from(format!("{}.{}", declared.display(), SOURCE_EXTENSION));
        if appended.is_file() {
            return Some(appended);
        }

        if declared.is_dir() {
            // A directory with its own manifest resolves through the
            // module system, not index probing.
            if declared.join("package.json").is_file() {
                return None;
            }
            let entries = [
                format!("index{}", self.options.extension),
                format!("index.{}", SOURCE_EXTENSION),
            ];
            for name in entries {
                let candidate = declared.join(&name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        None
    }

    /// Write a minimal manifest into the output root declaring the tree
    /// an ES module tree.
    pub fn write_output_manifest(&self) -> Result<()> {
        let manifest = json!({ "type": "module" });
        let path = self.options.output.join("package.json");
        std::fs::write(&path, serde_json::to_string_pretty(&manifest)? + "\n")?;
        Ok(())
    }
}
