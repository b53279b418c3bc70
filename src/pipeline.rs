//! The transformation pipeline.
//!
//! A linear state machine: collect and copy the source trees, shield
//! shebangs, run the conversion passes followed by the specifier
//! rewrite, unshield, patch manifests, report. Passes run over the
//! whole output tree and are strictly sequential; a pass that leaves
//! any file unprocessed aborts the run.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::codemod::{CodemodEngine, EngineOptions, PassStats, TransformModule};
use crate::config::ConversionOptions;
use crate::copier::TreeCopier;
use crate::error::{EsmifyError, Result};
use crate::manifest::ManifestPatcher;
use crate::rewrite::{REWRITE_PASS_NAME, RewritePass};
use crate::shebang::ShebangShield;

/// Transform modules run by the engine, in order. The specifier rewrite
/// runs after all of them, once import/export statements exist.
const CONVERSION_TRANSFORMS: [&str; 3] = ["cjs", "exports", "named-export-generation"];

/// Injected callback invoked with the failure that aborted a run.
pub type FailureReporter = Arc<dyn Fn(&EsmifyError) + Send + Sync>;

/// Holds the failure reporter for exactly one run; dropping it releases
/// the registration whatever the outcome.
struct ReporterScope {
    reporter: Option<FailureReporter>,
}

impl ReporterScope {
    fn register(reporter: Option<FailureReporter>) -> Self {
        if reporter.is_some() {
            debug!("failure reporter registered");
        }
        Self { reporter }
    }

    fn report(&self, err: &EsmifyError) {
        if let Some(ref reporter) = self.reporter {
            reporter(err);
        }
    }
}

impl Drop for ReporterScope {
    fn drop(&mut self) {
        if self.reporter.take().is_some() {
            debug!("failure reporter released");
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Files copied and transformed
    pub files: usize,
    /// Module entry written into the project manifest, if any
    pub module_entry: Option<String>,
    /// Total wall time
    pub elapsed: Duration,
}

/// Orchestrates one conversion run.
pub struct TransformPipeline<'a> {
    options: &'a ConversionOptions,
    engine: &'a dyn CodemodEngine,
    reporter: Option<FailureReporter>,
}

impl<'a> TransformPipeline<'a> {
    pub fn new(options: &'a ConversionOptions, engine: &'a dyn CodemodEngine) -> Self {
        Self {
            options,
            engine,
            reporter: None,
        }
    }

    /// Install a failure reporter for the next run.
    pub fn with_failure_reporter(mut self, reporter: FailureReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Run the pipeline to completion. Fails atomically at a pass
    /// boundary; recovery is a re-run from the clean output root.
    pub async fn run(&self) -> Result<PipelineReport> {
        let scope = ReporterScope::register(self.reporter.clone());
        let result = self.run_inner().await;
        if let Err(ref err) = result {
            scope.report(err);
        }
        result
    }

    async fn run_inner(&self) -> Result<PipelineReport> {
        let started = std::time::Instant::now();

        let files = TreeCopier::new(self.options).copy_tree().await?;
        let total = files.len();
        info!(
            "copied {} files into {}",
            total,
            self.options.output.display()
        );

        let mut shield = ShebangShield::new(&self.options.files_with_shebang)?;
        shield.shield(&files, self.options.concurrency).await?;

        let engine_options = EngineOptions {
            extensions: self.options.extension.trim_start_matches('.').to_string(),
            verbose: false,
        };
        for transform in self.conversion_transforms() {
            let stats = self
                .engine
                .run_pass(&transform, &self.options.output, &engine_options)?;
            verify_pass(&transform.name, total, &stats)?;
            log_pass(&transform.name, &stats);
        }

        let rewrite = RewritePass::new(self.options)?;
        let stats = rewrite.run(&files).await?;
        verify_pass(REWRITE_PASS_NAME, total, &stats)?;
        log_pass(REWRITE_PASS_NAME, &stats);

        shield.unshield(self.options.concurrency).await?;

        let patcher = ManifestPatcher::new(self.options);
        let module_entry = if self.options.add_module_entry {
            patcher.update_module_entry(&files)?
        } else {
            None
        };
        if self.options.add_output_manifest {
            patcher.write_output_manifest()?;
        }

        Ok(PipelineReport {
            files: total,
            module_entry,
            elapsed: started.elapsed(),
        })
    }

    /// The engine's transform modules, resolved under the dependency
    /// cache where the codemod package installs them.
    fn conversion_transforms(&self) -> Vec<TransformModule> {
        let transforms = self
            .options
            .dependency_root()
            .join("5to6-codemod")
            .join("transforms");
        CONVERSION_TRANSFORMS
            .iter()
            .map(|name| TransformModule {
                name: name.to_string(),
                path: transforms.join(format!("{}.js", name)),
            })
            .collect()
    }
}

/// A pass succeeds only when every file was modified or left unchanged.
fn verify_pass(pass: &str, total: usize, stats: &PassStats) -> Result<()> {
    if stats.processed() != total {
        return Err(EsmifyError::PassFailed {
            pass: pass.to_string(),
            errors: total.saturating_sub(stats.processed()),
            total,
        });
    }
    Ok(())
}

fn log_pass(pass: &str, stats: &PassStats) {
    info!(
        "pass {} complete: {} modified, {} unchanged in {:.2}s",
        pass,
        stats.ok,
        stats.nochange,
        stats.elapsed.as_secs_f64()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_pass_accepts_full_coverage() {
        let stats = PassStats {
            ok: 3,
            nochange: 2,
            errors: 0,
            elapsed: Duration::ZERO,
        };
        assert!(verify_pass("cjs", 5, &stats).is_ok());
    }

    #[test]
    fn test_verify_pass_rejects_shortfall_naming_the_pass() {
        let stats = PassStats {
            ok: 3,
            nochange: 1,
            errors: 1,
            elapsed: Duration::ZERO,
        };
        let err = verify_pass("exports", 5, &stats).unwrap_err();
        match err {
            EsmifyError::PassFailed { pass, errors, total } => {
                assert_eq!(pass, "exports");
                assert_eq!(errors, 1);
                assert_eq!(total, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
