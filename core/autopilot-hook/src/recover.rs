//! `recover` subcommand: crash-recovery report on demand.

use std::path::PathBuf;

use autopilot_core::recovery;
use autopilot_core::ProjectPaths;

pub fn run(path: Option<PathBuf>) -> Result<(), String> {
    let root = match path {
        Some(p) => p,
        None => std::env::current_dir().map_err(|e| format!("Cannot resolve cwd: {}", e))?,
    };

    let info = recovery::check_crash_recovery(&ProjectPaths::new(root));
    if info.needs_recovery {
        println!("{}", recovery::format_recovery_context(&info));
    } else {
        println!("No recovery needed.");
    }
    Ok(())
}
