//! External codemod engine interface.
//!
//! The per-statement require/exports conversion is delegated to an
//! external engine, invoked as an opaque batch operation over the whole
//! output tree. The core depends only on the `CodemodEngine` contract
//! and the per-pass statistics it returns.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{EsmifyError, Result};

/// Per-pass statistics reported by the engine.
#[derive(Debug, Clone, Default)]
pub struct PassStats {
    /// Files the pass modified
    pub ok: usize,
    /// Files the pass saw and left intact
    pub nochange: usize,
    /// Files the pass could not process
    pub errors: usize,
    /// Wall time the pass took
    pub elapsed: Duration,
}

impl PassStats {
    /// Files accounted for as successfully handled.
    pub fn processed(&self) -> usize {
        self.ok + self.nochange
    }
}

/// Identity of a transform module the engine should run.
#[derive(Debug, Clone)]
pub struct TransformModule {
    /// Short name used in logs and error messages
    pub name: String,
    /// Path of the transform module on disk
    pub path: PathBuf,
}

/// Options forwarded to the engine for every pass.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// File extension (without dot) the engine should pick up
    pub extensions: String,
    /// Verbose engine output
    pub verbose: bool,
}

/// An opaque multi-pass batch transformer.
///
/// One operation: run a single transform module over a directory and
/// report how many files it handled. A pass is successful when every
/// file was either modified or left unchanged.
pub trait CodemodEngine: Send + Sync {
    fn run_pass(
        &self,
        transform: &TransformModule,
        target_dir: &Path,
        options: &EngineOptions,
    ) -> Result<PassStats>;
}

/// Production engine: shells out to the jscodeshift CLI.
pub struct JscodeshiftEngine {
    binary: PathBuf,
}

impl JscodeshiftEngine {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| PathBuf::from("jscodeshift")),
        }
    }
}

impl CodemodEngine for JscodeshiftEngine {
    fn run_pass(
        &self,
        transform: &TransformModule,
        target_dir: &Path,
        options: &EngineOptions,
    ) -> Result<PassStats> {
        let started = Instant::now();

        let mut command = Command::new(&self.binary);
        command
            .arg("-t")
            .arg(&transform.path)
            .arg(format!("--extensions={}", options.extensions))
            .arg(target_dir);
        if options.verbose {
            command.arg("--verbose=1");
        }

        debug!("running codemod pass {} over {}", transform.name, target_dir.display());
        let output = command.output().map_err(|e| {
            EsmifyError::Engine(format!(
                "could not launch {}: {}",
                self.binary.display(),
                e
            ))
        })?;

        if !output.status.success() {
            return Err(EsmifyError::Engine(format!(
                "pass {} exited with {}: {}",
                transform.name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut stats = parse_summary(&String::from_utf8_lossy(&output.stdout))?;
        stats.elapsed = started.elapsed();
        Ok(stats)
    }
}

/// Parse the engine's summary block:
///
/// ```text
/// 0 errors
/// 2 unmodified
/// 0 skipped
/// 5 ok
/// Time elapsed: 1.234
/// ```
///
/// Skipped files were seen and left intact, so they count as unchanged.
fn parse_summary(output: &str) -> Result<PassStats> {
    let line = Regex::new(r"(?m)^\s*(\d+)\s+(errors|unmodified|skipped|ok)\b")
        .expect("summary pattern");

    let mut stats = PassStats::default();
    let mut seen = false;
    for caps in line.captures_iter(output) {
        let count: usize = caps[1].parse().unwrap_or(0);
        seen = true;
        match &caps[2] {
            "ok" => stats.ok += count,
            "unmodified" | "skipped" => stats.nochange += count,
            "errors" => stats.errors += count,
            _ => unreachable!(),
        }
    }

    if !seen {
        return Err(EsmifyError::Engine(format!(
            "unrecognized engine output: {}",
            output.trim()
        )));
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_summary_block() {
        let output = "Processing 7 files...\n0 errors\n2 unmodified\n0 skipped\n5 ok\nTime elapsed: 1.234\n";
        let stats = parse_summary(output).unwrap();
        assert_eq!(stats.ok, 5);
        assert_eq!(stats.nochange, 2);
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.processed(), 7);
    }

    #[test]
    fn test_skipped_counts_as_unchanged() {
        let output = "1 errors\n2 unmodified\n3 skipped\n4 ok\n";
        let stats = parse_summary(output).unwrap();
        assert_eq!(stats.nochange, 5);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.processed(), 9);
    }

    #[test]
    fn test_rejects_unrecognized_output() {
        assert!(parse_summary("something went sideways\n").is_err());
    }
}
