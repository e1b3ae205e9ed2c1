//! Small filesystem utilities.

use globset::{Glob, GlobMatcher};

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{GridFuzzError, GridFuzzResult};

/// Regular files directly inside `dir`, sorted, optionally filtered by a file-name glob.
pub fn list_regular_files(dir: &Path, pattern: Option<&str>) -> GridFuzzResult<Vec<PathBuf>> {
    let matcher = pattern.map(compile_glob).transpose()?;
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| {
            let msg = e.to_string();
            GridFuzzError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other(msg)),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(m) = &matcher
            && !m.is_match(entry.file_name())
        {
            continue;
        }
        out.push(entry.path().to_path_buf());
    }
    out.sort();
    Ok(out)
}

fn compile_glob(pattern: &str) -> GridFuzzResult<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| GridFuzzError::InvalidArgument(format!("invalid glob {pattern:?}: {e}")))
}

/// Creates `<base>/<stem>`, `<base>/<stem>2`, `<base>/<stem>3`, ... and returns the first one
/// this call actually created together with its number. `create_dir` fails on an existing
/// path, so two sessions starting at once can never claim the same directory.
pub fn create_numbered_dir(base: &Path, stem: &str) -> GridFuzzResult<(PathBuf, u32)> {
    std::fs::create_dir_all(base)?;
    let mut n = 1u32;
    loop {
        let name = if n == 1 { stem.to_string() } else { format!("{stem}{n}") };
        let candidate = base.join(name);
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok((candidate, n)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                n = n.checked_add(1).ok_or_else(|| {
                    GridFuzzError::InvalidArgument(format!(
                        "ran out of session numbers for {}",
                        base.join(stem).display()
                    ))
                })?;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Returns whether a file was removed.
pub fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
