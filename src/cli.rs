//! CLI argument parsing for esmify.

use clap::Parser;
use std::path::PathBuf;

/// esmify - Converts CommonJS source trees to ES modules
#[derive(Parser, Debug, Default)]
#[command(name = "esmify")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source directories to convert (default: src)
    #[arg(short, long)]
    pub input: Vec<PathBuf>,

    /// Output directory for the converted tree (default: esm)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Extension for converted files, including the dot (default: .mjs)
    #[arg(long)]
    pub extension: Option<String>,

    /// Keep the input directory name under the output root even for a single input
    #[arg(long)]
    pub force_directory: bool,

    /// Do not add a "module" entry to the project package.json
    #[arg(long)]
    pub no_module_entry: bool,

    /// Do not write a package.json into the output directory
    #[arg(long)]
    pub no_output_manifest: bool,

    /// Number of files processed concurrently (default: CPU count * 2)
    #[arg(long, env = "ESMIFY_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Path to the jscodeshift executable
    #[arg(long, env = "ESMIFY_JSCODESHIFT")]
    pub jscodeshift: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}
