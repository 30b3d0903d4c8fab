//! Collect workspace sources through a capability handle on the root.

use std::io;
use std::path::{Path, PathBuf};

use cap_std::ambient_authority;
use cap_std::fs::Dir;

use crate::SourceFile;

/// Read every `.rs` file below each of `roots`, sorted by path.
pub(crate) fn collect_sources(workspace: &Path, roots: &[&str]) -> io::Result<Vec<SourceFile>> {
    let workspace = Dir::open_ambient_dir(workspace, ambient_authority())?;
    let mut sources = Vec::new();
    for root in roots {
        match workspace.open_dir(root) {
            Ok(dir) => read_tree(&dir, PathBuf::from(root), &mut sources)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
    }
    sources.sort_by(|left, right| left.path.cmp(&right.path));
    Ok(sources)
}

fn read_tree(dir: &Dir, prefix: PathBuf, sources: &mut Vec<SourceFile>) -> io::Result<()> {
    for entry in dir.entries()? {
        let entry = entry?;
        let name = PathBuf::from(entry.file_name());
        if entry.file_type()?.is_dir() {
            read_tree(&entry.open_dir()?, prefix.join(&name), sources)?;
        } else if name.extension().is_some_and(|ext| ext == "rs") {
            let contents = dir.read_to_string(&name)?;
            sources.push(SourceFile::new(prefix.join(name), contents));
        }
    }
    Ok(())
}
