//! esmify - Converts CommonJS source trees to ES modules
//!
//! This is the main entry point for the esmify binary.

use clap::Parser;
use owo_colors::OwoColorize;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use esmify::cli::Cli;
use esmify::codemod::JscodeshiftEngine;
use esmify::config::ConversionOptions;
use esmify::error::Result;
use esmify::pipeline::TransformPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("esmify=debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    let project_root = std::env::current_dir()?;
    let options = ConversionOptions::load(&project_root, &cli)?;
    let engine = JscodeshiftEngine::new(cli.jscodeshift.clone());

    let quiet = cli.quiet;
    let pipeline = TransformPipeline::new(&options, &engine).with_failure_reporter(Arc::new(
        move |err| {
            if !quiet {
                eprintln!("{} {}", "error:".red().bold(), err);
            }
        },
    ));

    let report = pipeline.run().await?;

    if !cli.quiet {
        println!(
            "{} {} files converted in {:.2}s",
            "✓".green().bold(),
            report.files,
            report.elapsed.as_secs_f64()
        );
        if let Some(entry) = report.module_entry {
            println!("  module entry: {}", entry.cyan());
        }
    }

    Ok(())
}
