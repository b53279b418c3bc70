//! Source file discovery.

use futures::future::{BoxFuture, try_join_all};
use std::path::{Path, PathBuf};

use crate::config::{DEPENDENCY_DIR, SOURCE_EXTENSION};
use crate::error::Result;

/// Recursively enumerate source files under a root.
///
/// Produces a flat list in no particular order; sibling entries and
/// sibling subdirectories are traversed concurrently. The dependency
/// cache directory is excluded wholesale.
pub async fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    walk(root.to_path_buf()).await
}

fn walk(dir: PathBuf) -> BoxFuture<'static, Result<Vec<PathBuf>>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut files = Vec::new();
        let mut subdirs = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                if entry.file_name() == DEPENDENCY_DIR {
                    continue;
                }
                subdirs.push(path);
            } else if file_type.is_file() && has_source_extension(&path) {
                files.push(path);
            }
        }

        for mut nested in try_join_all(subdirs.into_iter().map(walk)).await? {
            files.append(&mut nested);
        }

        Ok(files)
    })
}

/// Whether a path carries the recognized source extension, case-insensitively.
pub fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
        .unwrap_or(false)
}
