use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stencil",
    about = "Stencil: update a project's template files without losing local edits",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with updater settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum AlgorithmArg {
    Sha256,
    Blake3,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the normalized content hash of files
    Hash(HashArgs),
    /// Identify the installed release from a fingerprint database
    Detect(DetectArgs),
    /// Three-way structural merge of markdown documents
    Merge(MergeArgs),
    /// Produce the conflict artifact for a file changed on both sides
    Resolve(ResolveArgs),
    /// Update a project to a release
    Update(UpdateArgs),
}

#[derive(Args)]
pub struct HashArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    #[arg(long)]
    pub algorithm: Option<AlgorithmArg>,
}

#[derive(Args)]
pub struct DetectArgs {
    /// Fingerprint database (JSON)
    #[arg(long)]
    pub database: PathBuf,
    /// Project root
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

#[derive(Args)]
pub struct MergeArgs {
    pub current: PathBuf,
    pub incoming: PathBuf,
    /// Common ancestor; merged without one if omitted
    #[arg(long)]
    pub base: Option<PathBuf>,
    #[arg(long, default_value = "base")]
    pub base_label: String,
    #[arg(long, default_value = "incoming")]
    pub incoming_label: String,
    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub current: PathBuf,
    pub incoming: PathBuf,
    #[arg(long)]
    pub base: Option<PathBuf>,
    #[arg(long, default_value = "base")]
    pub base_label: String,
    #[arg(long, default_value = "incoming")]
    pub incoming_label: String,
    /// Replace the current file (or write the side report) instead of printing
    #[arg(long)]
    pub write: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Directory of extracted releases, one subdirectory per version
    #[arg(long)]
    pub releases: PathBuf,
    /// Target release; the most recent one if omitted
    #[arg(long)]
    pub to: Option<String>,
    /// Fingerprint database used when the project has no manifest yet
    #[arg(long)]
    pub database: Option<PathBuf>,
    /// Without a database, treat the installed release as unknown: every
    /// file counts as customized and merges without a base
    #[arg(long, conflicts_with = "database")]
    pub assume_undetected: bool,
    /// Project root
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Report what would happen without writing anything
    #[arg(long)]
    pub dry_run: bool,
}
