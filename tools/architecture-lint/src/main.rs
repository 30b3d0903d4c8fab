//! Command-line entry point: find the workspace root and check it.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unable to locate the workspace root (a Cargo.toml declaring [workspace])")]
struct WorkspaceNotFound;

fn main() -> ExitCode {
    let outcome = workspace_root()
        .map_err(|err| err.to_string())
        .and_then(|root| architecture_lint::check_workspace(&root).map_err(|err| err.to_string()));
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            let _ = writeln!(io::stderr().lock(), "{message}");
            ExitCode::FAILURE
        }
    }
}

fn workspace_root() -> Result<PathBuf, WorkspaceNotFound> {
    let candidates = [
        std::env::var_os("CARGO_WORKSPACE_DIR").map(PathBuf::from),
        std::env::current_dir().ok(),
        Some(PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
    ];
    candidates
        .iter()
        .flatten()
        .find_map(|start| start.ancestors().find(|dir| declares_workspace(dir)))
        .map(Path::to_path_buf)
        .ok_or(WorkspaceNotFound)
}

fn declares_workspace(dir: &Path) -> bool {
    Dir::open_ambient_dir(dir, ambient_authority())
        .and_then(|handle| handle.read_to_string("Cargo.toml"))
        .is_ok_and(|manifest| manifest.contains("[workspace]"))
}
