//! gqlet: incremental GraphQL code generation.
//!
//! # Usage
//!
//! ```text
//! gqlet gen [--jobs N] [--no-prune]
//! gqlet status [--json]
//! gqlet load <FILE>
//! ```
//!
//! Every command accepts `--cwd <DIR>` (project root, default: current
//! directory) and `--config <FILE>` (default: `<root>/.gqlet.yml`).

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::{gen::GenArgs, load::LoadArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gqlet",
    version,
    about = "Generate TypeScript modules from GraphQL documents, regenerating only what changed",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project root.
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Config file, relative to the project root unless absolute.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bring every document's generated artifacts up to date.
    Gen(GenArgs),

    /// Show which documents a run would regenerate, and why.
    Status(StatusArgs),

    /// Process one document and print its generated module.
    Load(LoadArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Gen(args) => args.run(&cli.global),
        Commands::Status(args) => args.run(&cli.global),
        Commands::Load(args) => args.run(&cli.global),
    }
}
