use ibtool_core::SourceTransform;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use walkdir::WalkDir;

/// Errors that abort a migration run before the per-file phase.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("Source not found or not a directory: {0}")]
    SourceNotFound(PathBuf),
    #[error("Copy failed at {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One file the transform phase gave up on.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a completed migration run.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Files visited during the walk, rewrite candidates or not.
    pub files_seen: usize,
    /// `.py` files rewritten successfully.
    pub files_rewritten: usize,
    /// Per-file failures, in walk order.
    pub failures: Vec<FileFailure>,
}

impl MigrationReport {
    /// The run's result signal: zero means every `.py` file was rewritten.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Migrate `source` into a fresh copy at `destination`.
///
/// Any pre-existing `destination` is deleted first. After the copy, every
/// file whose name ends in `.py` is read as UTF-8, run through `engine`
/// (with its path as the diagnostic label), and written back. A failing
/// file is logged, counted, and left as the failed step left it; the walk
/// continues. Only a missing source or a copy-phase error aborts the run.
pub fn migrate_tree(
    source: &Path,
    destination: &Path,
    engine: &dyn SourceTransform,
) -> Result<MigrationReport, MigrateError> {
    if !source.is_dir() {
        return Err(MigrateError::SourceNotFound(source.to_path_buf()));
    }

    if destination.exists() {
        info!(destination = %destination.display(), "Removing existing destination");
        remove_path(destination).map_err(|e| MigrateError::Copy {
            path: destination.to_path_buf(),
            source: e,
        })?;
    }

    info!(
        source = %source.display(),
        destination = %destination.display(),
        "Copying source tree"
    );
    copy_tree(source, destination)?;

    let mut report = MigrationReport::default();
    for entry in WalkDir::new(destination) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| destination.to_path_buf());
                record_failure(&mut report, path, e.to_string());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        report.files_seen += 1;

        let path = entry.path();
        let is_python = entry.file_name().to_str().is_some_and(|n| n.ends_with(".py"));
        if !is_python {
            continue;
        }

        match rewrite_file(path, engine) {
            Ok(()) => report.files_rewritten += 1,
            Err(detail) => record_failure(&mut report, path.to_path_buf(), detail),
        }
    }

    info!(
        rewritten = report.files_rewritten,
        failures = report.failure_count(),
        "Migration complete"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn record_failure(report: &mut MigrationReport, path: PathBuf, error: String) {
    error!(path = %path.display(), %error, "Refactor failed");
    report.failures.push(FileFailure { path, error });
}

/// Read, transform, write back. A failure leaves the file as the failed
/// step left it; there is no per-file rollback.
fn rewrite_file(path: &Path, engine: &dyn SourceTransform) -> Result<(), String> {
    let source = fs::read_to_string(path).map_err(|e| format!("read: {}", e))?;
    let label = path.display().to_string();
    let rewritten = engine.transform(&source, &label).map_err(|e| e.to_string())?;
    fs::write(path, rewritten).map_err(|e| format!("write: {}", e))
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Recursive, all-or-nothing copy of a directory tree. Symlinked files are
/// copied as their target's content.
fn copy_tree(source: &Path, destination: &Path) -> Result<(), MigrateError> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source.to_path_buf());
            MigrateError::Copy {
                path,
                source: e.into(),
            }
        })?;

        let rel = match entry.path().strip_prefix(source) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = destination.join(rel);

        let result = if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
        } else {
            fs::copy(entry.path(), &target).map(|_| ())
        };
        result.map_err(|e| MigrateError::Copy {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}
