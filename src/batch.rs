//! Directory-wide fixing
//!
//! Files are discovered once, sorted by name, and processed one at a time. A
//! file that cannot be read or written is reported and skipped; the rest of the
//! batch still runs.

use crate::config::FixConfig;
use crate::error::{FixError, Result};
use crate::rewrite::{rewrite_entity, RewriteStats};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, Default)]
pub struct FixOptions {
    /// Report what would change without writing anything
    pub dry_run: bool,
}

/// Result of fixing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Unchanged,
    Fixed(RewriteStats),
}

#[derive(Debug, Clone, Serialize)]
pub struct FixedFile {
    pub file: String,
    pub stats: RewriteStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

/// Aggregate counts for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct FixReport {
    pub directory: PathBuf,
    pub dry_run: bool,
    pub scanned: usize,
    pub changed: Vec<FixedFile>,
    pub failed: Vec<FileFailure>,
}

impl FixReport {
    pub fn changed_count(&self) -> usize {
        self.changed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Progress notifications emitted while a batch runs
#[derive(Debug)]
pub enum FixEvent<'a> {
    Discovered(usize),
    Fixed { file: &'a str, stats: &'a RewriteStats },
    Failed { file: &'a str, error: &'a FixError },
}

/// Entity files in `dir`, sorted by file name.
///
/// Only regular `.rs` files are returned; names listed in `exclude` are skipped.
pub fn discover_entity_files(dir: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FixError::MissingDirectory(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(FixError::io(dir))? {
        let entry = entry.map_err(FixError::io(dir))?;
        let path = entry.path();

        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let excluded = path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|name| exclude.iter().any(|e| e == name));
        if excluded {
            log::debug!("skipping excluded file {}", path.display());
            continue;
        }

        files.push(path);
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Rewrite one file in place if its content changes.
pub fn fix_entity_file(path: &Path, options: &FixOptions) -> Result<FileOutcome> {
    let source = fs::read_to_string(path).map_err(FixError::io(path))?;
    let rewrite = rewrite_entity(&source);

    if !rewrite.changed {
        return Ok(FileOutcome::Unchanged);
    }

    log::debug!("{}: {:?}", path.display(), rewrite.stats);
    if !options.dry_run {
        write_whole_file(path, &rewrite.text).map_err(FixError::io(path))?;
    }
    Ok(FileOutcome::Fixed(rewrite.stats))
}

/// Replace `path` with `contents` through a sibling temp file and a rename, so
/// the existing file is either fully replaced or left as it was.
fn write_whole_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = fs::metadata(path)?.permissions();

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), permissions)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Fix every entity file in the configured directory.
pub fn fix_directory(config: &FixConfig, options: &FixOptions) -> Result<FixReport> {
    fix_directory_with(config, options, |_| {})
}

/// Like [`fix_directory`], reporting progress to `on_event` as it goes.
pub fn fix_directory_with<F>(
    config: &FixConfig,
    options: &FixOptions,
    mut on_event: F,
) -> Result<FixReport>
where
    F: FnMut(FixEvent<'_>),
{
    let files = discover_entity_files(&config.dir, &config.exclude)?;
    on_event(FixEvent::Discovered(files.len()));

    let mut report = FixReport {
        directory: config.dir.clone(),
        dry_run: options.dry_run,
        scanned: files.len(),
        ..FixReport::default()
    };

    for path in &files {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match fix_entity_file(path, options) {
            Ok(FileOutcome::Unchanged) => log::debug!("{} already clean", file),
            Ok(FileOutcome::Fixed(stats)) => {
                on_event(FixEvent::Fixed {
                    file: &file,
                    stats: &stats,
                });
                report.changed.push(FixedFile { file, stats });
            }
            Err(error) => {
                log::error!("failed to fix {}: {}", file, error);
                on_event(FixEvent::Failed {
                    file: &file,
                    error: &error,
                });
                report.failed.push(FileFailure {
                    file,
                    error: error.to_string(),
                });
            }
        }
    }

    log::debug!(
        "fixed {} of {} entity files in {}",
        report.changed_count(),
        report.scanned,
        report.directory.display()
    );
    Ok(report)
}
