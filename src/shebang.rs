//! Shielding interpreter directives from the codemod engine.
//!
//! The engine cannot parse a file that begins with `#!`, so directives
//! are stripped before the transformation passes and restored once all
//! passes have run.

use futures::StreamExt;
use futures::stream;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::compile_pattern;
use crate::copier::CopiedFile;
use crate::error::Result;

/// Removes and restores leading interpreter directives.
pub struct ShebangShield {
    /// Source-path patterns selecting the affected files
    patterns: Vec<Regex>,
    /// Leading directive matcher
    directive: Regex,
    /// Removed directive text keyed by output path
    records: HashMap<PathBuf, String>,
}

impl ShebangShield {
    pub fn new(patterns: &[String]) -> Result<Self> {
        Ok(Self {
            patterns: patterns
                .iter()
                .map(|p| compile_pattern(p))
                .collect::<Result<Vec<_>>>()?,
            directive: Regex::new(r"^#![^\n]*").expect("directive pattern"),
            records: HashMap::new(),
        })
    }

    /// Whether a source path is configured as carrying a directive.
    fn matches(&self, source: &Path) -> bool {
        let text = source.to_string_lossy();
        self.patterns.iter().any(|p| p.is_match(&text))
    }

    /// Strip the leading directive from every matching copied file,
    /// recording the removed text for later restoration. Files without
    /// a directive are left alone and not recorded.
    pub async fn shield(&mut self, files: &[CopiedFile], concurrency: usize) -> Result<()> {
        let affected: Vec<PathBuf> = files
            .iter()
            .filter(|f| self.matches(&f.from))
            .map(|f| f.to.clone())
            .collect();

        let directive = self.directive.clone();
        let stripped = stream::iter(affected.into_iter().map(|path| {
            let directive = directive.clone();
            async move { strip_directive(path, directive).await }
        }))
        .buffer_unordered(concurrency)
        .collect::<Vec<Result<Option<(PathBuf, String)>>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        for (path, text) in stripped.into_iter().flatten() {
            self.records.insert(path, text);
        }

        debug!("shielded {} shebang files", self.records.len());
        Ok(())
    }

    /// Re-insert each recorded directive, followed by a blank line, at
    /// the top of its file. No records means nothing to restore.
    pub async fn unshield(&mut self, concurrency: usize) -> Result<()> {
        let records = std::mem::take(&mut self.records);

        stream::iter(records.into_iter().map(|(path, text)| async move {
            let content = tokio::fs::read_to_string(&path).await?;
            tokio::fs::write(&path, format!("{}\n\n{}", text, content)).await?;
            Ok(())
        }))
        .buffer_unordered(concurrency)
        .collect::<Vec<Result<()>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<()>>>()?;

        Ok(())
    }
}

async fn strip_directive(path: PathBuf, directive: Regex) -> Result<Option<(PathBuf, String)>> {
    let content = tokio::fs::read_to_string(&path).await?;
    let Some(found) = directive.find(&content) else {
        return Ok(None);
    };
    let text = found.as_str().to_string();
    let rest = content[found.end()..].trim_start().to_string();
    tokio::fs::write(&path, rest).await?;
    Ok(Some((path, text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copied(dir: &Path, name: &str, content: &str) -> CopiedFile {
        let to = dir.join(name);
        std::fs::write(&to, content).unwrap();
        CopiedFile {
            from: PathBuf::from("bin").join(name),
            to,
        }
    }

    #[tokio::test]
    async fn test_round_trip_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let original = "#!/usr/bin/env node\n\nconsole.log('hi');\n";
        let file = copied(dir.path(), "cli.mjs", original);

        let mut shield = ShebangShield::new(&["bin/".to_string()]).unwrap();
        shield.shield(std::slice::from_ref(&file), 4).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&file.to).unwrap(),
            "console.log('hi');\n"
        );

        shield.unshield(4).await.unwrap();
        assert_eq!(std::fs::read_to_string(&file.to).unwrap(), original);
    }

    #[tokio::test]
    async fn test_non_matching_files_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let original = "#!/usr/bin/env node\n\nmain();\n";
        let file = CopiedFile {
            from: PathBuf::from("src/app.js"),
            to: dir.path().join("app.mjs"),
        };
        std::fs::write(&file.to, original).unwrap();

        let mut shield = ShebangShield::new(&["bin/".to_string()]).unwrap();
        shield.shield(std::slice::from_ref(&file), 4).await.unwrap();
        assert_eq!(std::fs::read_to_string(&file.to).unwrap(), original);
    }

    #[tokio::test]
    async fn test_file_without_directive_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let file = copied(dir.path(), "plain.mjs", "export default 1;\n");

        let mut shield = ShebangShield::new(&["bin/".to_string()]).unwrap();
        shield.shield(std::slice::from_ref(&file), 4).await.unwrap();
        shield.unshield(4).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&file.to).unwrap(),
            "export default 1;\n"
        );
    }

    #[tokio::test]
    async fn test_unshield_with_no_records_is_a_no_op() {
        let mut shield = ShebangShield::new(&[]).unwrap();
        shield.unshield(4).await.unwrap();
    }
}
