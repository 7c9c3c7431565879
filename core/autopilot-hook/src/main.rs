//! autopilot-hook: CLI hook handler for session automation.
//!
//! Rust binary that handles Claude Code hook events and drives the
//! automation engine. Called directly by Claude Code hooks configured in
//! ~/.claude/settings.json.
//!
//! ## Subcommands
//!
//! - `handle`: Main hook handler, reads one JSON event from stdin and
//!   writes one JSON decision to stdout. Exit 0 continues, exit 2 blocks.
//! - `recover`: Prints the crash-recovery report for a project directory.

mod handle;
mod logging;
mod recover;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "autopilot-hook")]
#[command(about = "Session automation for Claude Code hooks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a hook event (reads JSON from stdin)
    Handle,

    /// Print the crash-recovery report for a project directory
    Recover {
        /// Project directory (defaults to the current directory)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Handle => {
            let code = handle::run();
            std::process::exit(code);
        }
        Commands::Recover { path } => {
            if let Err(e) = recover::run(path) {
                tracing::error!(error = %e, "autopilot-hook recover failed");
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }
}
