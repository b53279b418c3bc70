//! Specifier rewrite pass.
//!
//! Applies the resolver to every import and re-export specifier in the
//! output tree, replacing only the specifier literals. Must run after
//! the external conversion passes, which is when import/export
//! statements first exist.

use futures::StreamExt;
use futures::stream;
use std::path::Path;
use tracing::warn;

use crate::codemod::PassStats;
use crate::config::ConversionOptions;
use crate::copier::CopiedFile;
use crate::error::Result;
use crate::resolver::SpecifierResolver;
use crate::statement::{StatementKind, StatementScanner};

/// Name the pass is reported under.
pub const REWRITE_PASS_NAME: &str = "specifier-rewrite";

/// Rewrites specifiers across the whole output tree.
pub struct RewritePass {
    resolver: SpecifierResolver,
    scanner: StatementScanner,
    concurrency: usize,
}

impl RewritePass {
    pub fn new(options: &ConversionOptions) -> Result<Self> {
        Ok(Self {
            resolver: SpecifierResolver::new(options)?,
            scanner: StatementScanner::new(),
            concurrency: options.concurrency,
        })
    }

    /// Run over every copied file, reporting stats under the same
    /// contract as external passes.
    pub async fn run(&self, files: &[CopiedFile]) -> Result<PassStats> {
        let started = std::time::Instant::now();

        let outcomes = stream::iter(files.iter().map(|f| self.rewrite_file(&f.to)))
            .buffer_unordered(self.concurrency)
            .collect::<Vec<Result<bool>>>()
            .await;

        let mut stats = PassStats::default();
        for outcome in outcomes {
            match outcome {
                Ok(true) => stats.ok += 1,
                Ok(false) => stats.nochange += 1,
                Err(e) => {
                    warn!("specifier rewrite failed: {}", e);
                    stats.errors += 1;
                }
            }
        }
        stats.elapsed = started.elapsed();
        Ok(stats)
    }

    async fn rewrite_file(&self, path: &Path) -> Result<bool> {
        let source = tokio::fs::read_to_string(path).await?;
        match self.rewrite_source(path, &source) {
            Some(updated) => {
                tokio::fs::write(path, updated).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Rewrite every statement specifier in one file's source text.
    /// Returns `None` when nothing changed.
    pub fn rewrite_source(&self, path: &Path, source: &str) -> Option<String> {
        let mut edits = Vec::new();

        for statement in self.scanner.scan(source) {
            let Some(literal) = statement.specifier else {
                continue;
            };
            if self.resolver.is_ignored(&literal.value) {
                continue;
            }

            let mut replacement = self.resolver.resolve(path, &literal.value);
            // Alias remapping is wired to imports only, matching the
            // reference behavior; re-exports keep their prefixes.
            if statement.kind == StatementKind::Import {
                if let Some(aliased) = self.resolver.apply_alias(&replacement) {
                    replacement = aliased;
                }
            }

            if replacement != literal.value {
                edits.push((literal.span, replacement));
            }
        }

        if edits.is_empty() {
            return None;
        }

        let mut updated = source.to_string();
        for (span, replacement) in edits.into_iter().rev() {
            updated.replace_range(span, &replacement);
        }
        Some(updated)
    }
}
