//! Specifier resolution.
//!
//! Given an import/export specifier and the file it appears in, computes
//! the replacement string the static module system needs: extension
//! normalization, directory-to-entry-file resolution, and alias
//! remapping. Resolution is fail-open: a specifier that cannot be
//! mapped to an on-disk target is returned unchanged, which covers
//! specifiers resolving into dependency trees the tool did not copy.

use regex::Regex;
use std::path::{Path, PathBuf};

use crate::config::{AliasRule, ConversionOptions, SOURCE_EXTENSION, compile_pattern};
use crate::error::Result;

/// Manifest file name that delegates directory resolution to the module
/// system instead of index probing.
const DIRECTORY_MANIFEST: &str = "package.json";

struct CompiledAlias {
    name: String,
    find: Option<Regex>,
    path: String,
}

impl CompiledAlias {
    fn compile(rule: &AliasRule) -> Result<Self> {
        Ok(Self {
            name: rule.name.clone(),
            find: rule.find.as_deref().map(compile_pattern).transpose()?,
            path: rule.path.clone(),
        })
    }
}

/// Computes on-disk replacement specifiers.
pub struct SpecifierResolver {
    target_extension: String,
    ignore: Vec<Regex>,
    aliases: Vec<CompiledAlias>,
    dependency_root: PathBuf,
}

impl SpecifierResolver {
    pub fn new(options: &ConversionOptions) -> Result<Self> {
        Ok(Self {
            target_extension: options.extension.clone(),
            ignore: options
                .ignore
                .iter()
                .map(|p| compile_pattern(p))
                .collect::<Result<Vec<_>>>()?,
            aliases: options
                .aliases
                .iter()
                .map(CompiledAlias::compile)
                .collect::<Result<Vec<_>>>()?,
            dependency_root: options.dependency_root(),
        })
    }

    /// Whether a specifier is exempt from both rewrite sub-passes.
    pub fn is_ignored(&self, specifier: &str) -> bool {
        self.ignore.iter().any(|p| p.is_match(specifier))
    }

    /// Compute the replacement for a specifier appearing in `source_file`.
    ///
    /// Relative specifiers are probed against the statement's directory,
    /// bare ones against the dependency cache root as a best-effort
    /// guess. Anything else passes through unchanged.
    pub fn resolve(&self, source_file: &Path, specifier: &str) -> String {
        let candidate = if specifier.starts_with('.') {
            source_file
                .parent()
                .unwrap_or(Path::new("."))
                .join(specifier)
        } else if starts_with_word_char(specifier) {
            self.dependency_root.join(specifier)
        } else {
            return specifier.to_string();
        };

        if candidate.is_dir() {
            return self.resolve_directory(specifier, &candidate);
        }

        if let Some(found) = self.probe_file(&candidate) {
            let name = found
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return ensure_relative_marker(specifier, replace_last_segment(specifier, &name));
        }

        specifier.to_string()
    }

    /// Probe a candidate path as a file, trying the exact path, the path
    /// with the target extension appended, and a source-extension path
    /// with its extension swapped for the target one.
    fn probe_file(&self, candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }

        let appended = PathBuf::from(format!(
            "{}{}",
            candidate.display(),
            self.target_extension
        ));
        if appended.is_file() {
            return Some(appended);
        }

        if crate::collector::has_source_extension(candidate) {
            let swapped = candidate.with_extension(&self.target_extension[1..]);
            if swapped.is_file() {
                return Some(swapped);
            }
        }

        None
    }

    /// Resolve a specifier naming a directory: manifest directories are
    /// left to the module system, otherwise the entry file name is
    /// appended, target extension taking priority.
    fn resolve_directory(&self, specifier: &str, dir: &Path) -> String {
        if dir.join(DIRECTORY_MANIFEST).is_file() {
            return specifier.to_string();
        }

        let entries = [
            format!("index{}", self.target_extension),
            format!("index.{}", SOURCE_EXTENSION),
        ];
        for name in entries {
            if dir.join(&name).is_file() {
                let joined = if specifier.ends_with('/') {
                    format!("{}{}", specifier, name)
                } else {
                    format!("{}/{}", specifier, name)
                };
                return ensure_relative_marker(specifier, joined);
            }
        }

        specifier.to_string()
    }

    /// Apply the first matching alias rule, if any. A rule with a custom
    /// `find` pattern rewrites via regex replacement; otherwise the rule
    /// name must match the specifier's leading path segment.
    pub fn apply_alias(&self, specifier: &str) -> Option<String> {
        for alias in &self.aliases {
            if let Some(ref find) = alias.find {
                if find.is_match(specifier) {
                    return Some(find.replace(specifier, alias.path.as_str()).into_owned());
                }
            } else if specifier == alias.name {
                return Some(alias.path.clone());
            } else if let Some(rest) = specifier.strip_prefix(alias.name.as_str()) {
                if rest.starts_with('/') {
                    return Some(format!("{}{}", alias.path, rest));
                }
            }
        }
        None
    }
}

fn starts_with_word_char(specifier: &str) -> bool {
    specifier
        .chars()
        .next()
        .map(|c| c.is_alphanumeric() || c == '_')
        .unwrap_or(false)
}

/// Replace the final path segment of a specifier, keeping its directory
/// portion intact.
fn replace_last_segment(specifier: &str, name: &str) -> String {
    match specifier.rfind('/') {
        Some(i) => format!("{}/{}", &specifier[..i], name),
        None => name.to_string(),
    }
}

/// A specifier that began with an explicit relative marker must still
/// begin with one after replacement.
fn ensure_relative_marker(original: &str, replaced: String) -> String {
    if original.starts_with('.') && !replaced.starts_with('.') {
        format!("./{}", replaced)
    } else {
        replaced
    }
}
