//! Command-line entry point for the layer lint.
//!
//! Usage: `architecture-lint [BACKEND_DIR]`. Without an argument the
//! `backend/` directory of the enclosing Cargo workspace is linted.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let backend_dir = match env::args_os().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => match workspace_backend() {
            Some(dir) => dir,
            None => {
                report("no Cargo workspace found above the current directory");
                return ExitCode::FAILURE;
            }
        },
    };

    match architecture_lint::lint_backend_sources(&backend_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

fn report(message: &str) {
    // Nothing useful can be done if stderr itself is gone.
    let _ = writeln!(io::stderr().lock(), "architecture-lint: {message}");
}

/// `backend/` under the nearest ancestor whose manifest declares a workspace.
///
/// Starts from `CARGO_WORKSPACE_DIR` when set, then the current directory,
/// then this tool's own manifest directory.
fn workspace_backend() -> Option<PathBuf> {
    let starts = [
        env::var_os("CARGO_WORKSPACE_DIR").map(PathBuf::from),
        env::current_dir().ok(),
        Some(PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
    ];
    starts
        .into_iter()
        .flatten()
        .find_map(|start| start.ancestors().find(|dir| is_workspace_root(dir)).map(Path::to_path_buf))
        .map(|root| root.join("backend"))
}

fn is_workspace_root(dir: &Path) -> bool {
    fs::read_to_string(dir.join("Cargo.toml"))
        .is_ok_and(|manifest| manifest.lines().any(|line| line.trim() == "[workspace]"))
}
