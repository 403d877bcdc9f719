//! File retention cleanup
//!
//! Removes extracted spreadsheets and downloaded archives that are older
//! than the retention window. Never touches ledger data and never returns
//! an error: every failure is logged and counted in the [`CleanupReport`].

use crate::config::RetentionConfig;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// What a cleanup run deletes and what it protects
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionPolicy {
    pub enabled: bool,
    pub directories: Vec<PathBuf>,
    pub max_age: Duration,
    pub keep_latest_archives: usize,
    pub spreadsheet_extensions: Vec<String>,
    pub archive_extensions: Vec<String>,
}

impl RetentionPolicy {
    pub fn from_config(config: &RetentionConfig) -> Self {
        Self {
            enabled: config.enabled,
            directories: config.directories.iter().map(PathBuf::from).collect(),
            max_age: Duration::days(i64::from(config.retention_days)),
            keep_latest_archives: config.keep_latest_archives,
            spreadsheet_extensions: lowercase_all(&config.spreadsheet_extensions),
            archive_extensions: lowercase_all(&config.archive_extensions),
        }
    }

    /// Override the retention window
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.max_age = Duration::days(i64::from(days));
        self
    }

    fn classify(&self, path: &Path) -> Option<FileClass> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if self.spreadsheet_extensions.contains(&ext) {
            Some(FileClass::Spreadsheet)
        } else if self.archive_extensions.contains(&ext) {
            Some(FileClass::Archive)
        } else {
            None
        }
    }
}

fn lowercase_all(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect()
}

/// Outcome of one cleanup run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Matching files found
    pub files_scanned: usize,

    pub spreadsheets_deleted: usize,
    pub archives_deleted: usize,

    /// Expired archives kept because they are among the newest
    pub archives_protected: usize,

    pub directories_removed: usize,
    pub bytes_freed: u64,

    /// Filesystem operations that failed
    pub failures: usize,
}

impl CleanupReport {
    pub fn files_deleted(&self) -> usize {
        self.spreadsheets_deleted + self.archives_deleted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileClass {
    Spreadsheet,
    Archive,
}

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    class: FileClass,
    modified: DateTime<Utc>,
    size: u64,
}

/// Run cleanup against the current time
pub fn cleanup(policy: &RetentionPolicy) -> CleanupReport {
    cleanup_at(policy, Utc::now())
}

/// Run cleanup as if the current time were `now`
pub fn cleanup_at(policy: &RetentionPolicy, now: DateTime<Utc>) -> CleanupReport {
    let mut report = CleanupReport::default();

    if !policy.enabled {
        tracing::debug!("Retention cleanup disabled");
        return report;
    }

    // A window reaching past the representable range expires nothing
    let cutoff = now
        .checked_sub_signed(policy.max_age)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    tracing::info!(
        directories = policy.directories.len(),
        cutoff = %cutoff,
        "Starting retention cleanup"
    );

    for root in &policy.directories {
        if !root.is_dir() {
            tracing::debug!(directory = %root.display(), "Retention directory missing, skipped");
            continue;
        }
        clean_root(policy, root, cutoff, &mut report);
    }

    tracing::info!(
        files_scanned = report.files_scanned,
        spreadsheets_deleted = report.spreadsheets_deleted,
        archives_deleted = report.archives_deleted,
        archives_protected = report.archives_protected,
        directories_removed = report.directories_removed,
        bytes_freed = report.bytes_freed,
        failures = report.failures,
        "Retention cleanup completed"
    );

    report
}

fn clean_root(
    policy: &RetentionPolicy,
    root: &Path,
    cutoff: DateTime<Utc>,
    report: &mut CleanupReport,
) {
    let mut candidates = Vec::new();
    let mut subdirs = Vec::new();
    scan(policy, root, &mut candidates, &mut subdirs, report);
    report.files_scanned += candidates.len();

    // Newest archives first so the first N can be protected
    candidates.sort_by(|a, b| b.modified.cmp(&a.modified));
    let mut archives_seen = 0usize;
    let mut touched: HashSet<PathBuf> = HashSet::new();

    for candidate in &candidates {
        let protected = candidate.class == FileClass::Archive && {
            archives_seen += 1;
            archives_seen <= policy.keep_latest_archives
        };

        if candidate.modified >= cutoff {
            continue;
        }
        if protected {
            report.archives_protected += 1;
            continue;
        }

        match fs::remove_file(&candidate.path) {
            Ok(()) => {
                tracing::info!(
                    file = %candidate.path.display(),
                    modified = %candidate.modified,
                    "Deleted expired file"
                );
                match candidate.class {
                    FileClass::Spreadsheet => report.spreadsheets_deleted += 1,
                    FileClass::Archive => report.archives_deleted += 1,
                }
                report.bytes_freed += candidate.size;
                if let Some(parent) = candidate.path.parent() {
                    touched.insert(parent.to_path_buf());
                }
            }
            Err(e) => {
                tracing::warn!(file = %candidate.path.display(), error = %e, "Failed to delete file");
                report.failures += 1;
            }
        }
    }

    // Deepest first so parents see their children gone
    subdirs.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));
    for dir in subdirs {
        if !touched.contains(&dir) || !is_empty_dir(&dir) {
            continue;
        }
        match fs::remove_dir(&dir) {
            Ok(()) => {
                tracing::debug!(directory = %dir.display(), "Removed empty directory");
                report.directories_removed += 1;
                if let Some(parent) = dir.parent() {
                    touched.insert(parent.to_path_buf());
                }
            }
            Err(e) => {
                tracing::warn!(directory = %dir.display(), error = %e, "Failed to remove directory");
                report.failures += 1;
            }
        }
    }
}

fn scan(
    policy: &RetentionPolicy,
    root: &Path,
    candidates: &mut Vec<Candidate>,
    subdirs: &mut Vec<PathBuf>,
    report: &mut CleanupReport,
) {
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(directory = %dir.display(), error = %e, "Failed to read directory");
                report.failures += 1;
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(directory = %dir.display(), error = %e, "Failed to read entry");
                    report.failures += 1;
                    continue;
                }
            };
            let path = entry.path();

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Failed to read metadata");
                    report.failures += 1;
                    continue;
                }
            };

            if metadata.is_dir() {
                subdirs.push(path.clone());
                pending.push(path);
                continue;
            }

            let Some(class) = policy.classify(&path) else {
                continue;
            };

            match metadata.modified() {
                Ok(modified) => candidates.push(Candidate {
                    path,
                    class,
                    modified: DateTime::<Utc>::from(modified),
                    size: metadata.len(),
                }),
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Modification time unavailable");
                    report.failures += 1;
                }
            }
        }
    }
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
