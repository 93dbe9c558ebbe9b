use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{AnalysisError, Result};
use crate::io::format::is_recognized_name;
use crate::io::InputSource;

/// Every recognized file below `root`, depth first and sorted by file name.
///
/// A file's prefix is its parent directory relative to `root`, joined with
/// `/`; files directly in `root` have no prefix. Unrecognized files are
/// skipped. Finding nothing at all is an error.
pub fn enumerate_directory(root: &Path) -> Result<Vec<InputSource>> {
    if !root.is_dir() {
        return Err(AnalysisError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", root.display()),
        )));
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_recognized_name(&name) {
            debug!(path = %entry.path().display(), "skipping unrecognized file");
            continue;
        }
        let prefix = relative_prefix(root, entry.path());
        sources.push(InputSource::from_path(entry.path()).with_prefix(prefix));
    }

    if sources.is_empty() {
        return Err(AnalysisError::NoValidFiles(root.to_path_buf()));
    }
    info!(root = %root.display(), files = sources.len(), "Enumerated input directory");
    Ok(sources)
}

/// Parent directory of `path` relative to `root`, `/`-separated.
fn relative_prefix(root: &Path, path: &Path) -> Option<String> {
    let parent = path.parent()?.strip_prefix(root).ok()?;
    let parts: Vec<_> = parent
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Expand a mixed list of files and directories into sources, in argument order.
pub fn enumerate_paths(paths: &[PathBuf]) -> Result<Vec<InputSource>> {
    if paths.is_empty() {
        return Err(AnalysisError::NoInput);
    }
    let mut sources = Vec::new();
    for path in paths {
        if path.is_dir() {
            sources.extend(enumerate_directory(path)?);
        } else {
            sources.push(InputSource::from_path(path));
        }
    }
    Ok(sources)
}
