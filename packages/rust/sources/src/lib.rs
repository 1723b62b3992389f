//! Source discovery and record reading.
//!
//! Before a run starts we resolve the exact, sorted list of tabular files to
//! process. A missing directory, a missing explicitly requested file, or an
//! empty match are fatal: no record could be produced from them. Reading the
//! individual files happens lazily in [`reader`], where failures stay local
//! to one file.

mod reader;

use std::path::Path;

use horoscope_shared::{HoroscopeError, Result, SourceFile};
use tracing::{debug, info, instrument};

pub use reader::{PREFERRED_SHEET, RecordIter, read_records};

/// Resolve the files to process, sorted lexicographically by path.
///
/// With `target_file` set, only `dir/target_file` is returned, whatever its
/// extension. Otherwise every regular file in `dir` whose extension matches
/// one of `extensions` (case-insensitive) is returned.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn enumerate_sources(
    dir: &Path,
    target_file: Option<&str>,
    extensions: &[String],
) -> Result<Vec<SourceFile>> {
    if !dir.is_dir() {
        return Err(HoroscopeError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    if let Some(name) = target_file {
        let candidate = dir.join(name);
        if !candidate.is_file() {
            return Err(HoroscopeError::FileNotFound { path: candidate });
        }
        info!(file = %candidate.display(), "processing single target file");
        return Ok(vec![SourceFile::new(candidate)]);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| HoroscopeError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HoroscopeError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let source = SourceFile::new(path);
        match source.extension() {
            Some(ext) if has_extension(extensions, &ext) => files.push(source),
            _ => debug!(file = %source, "skipping file with unaccepted extension"),
        }
    }

    if files.is_empty() {
        return Err(HoroscopeError::NoSourceFiles {
            dir: dir.to_path_buf(),
            extensions: extensions.join(", "),
        });
    }

    files.sort();
    info!(count = files.len(), "source files discovered");
    Ok(files)
}

fn has_extension(accepted: &[String], ext: &str) -> bool {
    accepted
        .iter()
        .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(ext))
}
