//! Copying the collected files into the output tree.

use futures::StreamExt;
use futures::stream;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::collector::collect_files;
use crate::config::ConversionOptions;
use crate::error::{EsmifyError, Result};

/// A source file and the output path it was copied to.
///
/// Both paths are absolute. One record exists per source file for the
/// duration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Copies source trees into the output root, renaming extensions.
pub struct TreeCopier<'a> {
    options: &'a ConversionOptions,
}

impl<'a> TreeCopier<'a> {
    pub fn new(options: &'a ConversionOptions) -> Self {
        Self { options }
    }

    /// Clear and recreate the output root, then copy every source file
    /// into it with the target extension.
    ///
    /// A single input root has its contents copied directly into the
    /// output root unless `force_directory` is set; multiple roots keep
    /// their directory names.
    pub async fn copy_tree(&self) -> Result<Vec<CopiedFile>> {
        let output = &self.options.output;
        match tokio::fs::remove_dir_all(output).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(output).await?;

        let elide_root = self.options.input.len() == 1 && !self.options.force_directory;
        let mut copies = Vec::new();

        for root in &self.options.input {
            let base = if elide_root {
                output.clone()
            } else {
                output.join(root.file_name().unwrap_or(root.as_os_str()))
            };

            for from in collect_files(root).await? {
                let relative = from.strip_prefix(root).map_err(|_| {
                    EsmifyError::Other(format!(
                        "collected file {} is outside its root {}",
                        from.display(),
                        root.display()
                    ))
                })?;
                let mut to = base.join(relative);
                to.set_file_name(self.output_name(&from));
                copies.push(CopiedFile { from, to });
            }
        }

        // Destination paths must be unique; case-variant source names
        // and roots sharing a directory name can collide.
        let mut seen: HashMap<&Path, &Path> = HashMap::new();
        for file in &copies {
            if let Some(first) = seen.insert(file.to.as_path(), file.from.as_path()) {
                return Err(EsmifyError::DestinationCollision {
                    first: first.display().to_string(),
                    second: file.from.display().to_string(),
                    to: file.to.display().to_string(),
                });
            }
        }

        stream::iter(copies.iter().map(copy_one))
            .buffer_unordered(self.options.concurrency)
            .collect::<Vec<Result<()>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>>>()?;

        debug!("copied {} files to {}", copies.len(), output.display());
        Ok(copies)
    }

    /// Destination file name: source stem plus the target extension.
    fn output_name(&self, from: &Path) -> String {
        let stem = from
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}{}", stem, self.options.extension)
    }
}

async fn copy_one(file: &CopiedFile) -> Result<()> {
    if let Some(parent) = file.to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(&file.from, &file.to).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn options_for(root: &Path, input: Vec<PathBuf>) -> ConversionOptions {
        ConversionOptions {
            input,
            output: root.join("esm"),
            project_root: root.to_path_buf(),
            ..ConversionOptions::default()
        }
    }

    #[tokio::test]
    async fn test_single_root_contents_elide_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("src/a.js"), "1;");
        write(&dir.path().join("src/lib/b.js"), "2;");

        let options = options_for(dir.path(), vec![dir.path().join("src")]);
        let mut copies = TreeCopier::new(&options).copy_tree().await.unwrap();
        copies.sort_by(|a, b| a.to.cmp(&b.to));

        assert_eq!(copies[0].to, dir.path().join("esm/a.mjs"));
        assert_eq!(copies[1].to, dir.path().join("esm/lib/b.mjs"));
        assert_eq!(std::fs::read_to_string(&copies[0].to).unwrap(), "1;");
    }

    #[tokio::test]
    async fn test_multiple_roots_keep_directory_names() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("src/a.js"), "");
        write(&dir.path().join("bin/cli.js"), "");

        let options = options_for(
            dir.path(),
            vec![dir.path().join("src"), dir.path().join("bin")],
        );
        let copies = TreeCopier::new(&options).copy_tree().await.unwrap();

        let targets: Vec<_> = copies.iter().map(|c| c.to.clone()).collect();
        assert!(targets.contains(&dir.path().join("esm/src/a.mjs")));
        assert!(targets.contains(&dir.path().join("esm/bin/cli.mjs")));
    }

    #[tokio::test]
    async fn test_force_directory_keeps_single_root_name() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("src/a.js"), "");

        let mut options = options_for(dir.path(), vec![dir.path().join("src")]);
        options.force_directory = true;
        let copies = TreeCopier::new(&options).copy_tree().await.unwrap();

        assert_eq!(copies[0].to, dir.path().join("esm/src/a.mjs"));
    }

    #[tokio::test]
    async fn test_extension_rewritten_regardless_of_case() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("src/a.JS"), "");

        let options = options_for(dir.path(), vec![dir.path().join("src")]);
        let copies = TreeCopier::new(&options).copy_tree().await.unwrap();
        assert_eq!(copies[0].to, dir.path().join("esm/a.mjs"));
    }

    #[tokio::test]
    async fn test_case_variant_sources_collide_instead_of_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("src/a.js"), "lower");
        write(&dir.path().join("src/a.JS"), "upper");

        let options = options_for(dir.path(), vec![dir.path().join("src")]);
        let err = TreeCopier::new(&options).copy_tree().await.unwrap_err();
        match err {
            EsmifyError::DestinationCollision { first, second, to } => {
                assert!(to.ends_with("a.mjs"));
                assert_ne!(first, second);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_roots_sharing_a_directory_name_collide() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("one/lib/a.js"), "");
        write(&dir.path().join("two/lib/a.js"), "");

        let options = options_for(
            dir.path(),
            vec![dir.path().join("one/lib"), dir.path().join("two/lib")],
        );
        let err = TreeCopier::new(&options).copy_tree().await.unwrap_err();
        assert!(matches!(err, EsmifyError::DestinationCollision { .. }));
    }

    #[tokio::test]
    async fn test_output_root_is_cleared_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("src/a.js"), "");
        write(&dir.path().join("esm/stale.mjs"), "");

        let options = options_for(dir.path(), vec![dir.path().join("src")]);
        TreeCopier::new(&options).copy_tree().await.unwrap();
        assert!(!dir.path().join("esm/stale.mjs").exists());
        assert!(dir.path().join("esm/a.mjs").exists());
    }
}
