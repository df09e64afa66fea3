use crate::config::FormatConfig;
use crate::format::format;
use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Already formatted
    Unchanged,
    /// Rewritten in place
    Reformatted,
    /// Would change, but writing was not requested
    NeedsFormatting,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub status: FileStatus,
}

/// Result of a `--check` run, printed as JSON with `--json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub files: Vec<FileReport>,
    pub unformatted: usize,
}

impl CheckReport {
    pub fn push(&mut self, report: FileReport) {
        if report.status == FileStatus::NeedsFormatting {
            self.unformatted += 1;
        }
        self.files.push(report);
    }

    pub fn is_clean(&self) -> bool {
        self.unformatted == 0
    }
}

/// A formatted file: its report plus the new text.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub report: FileReport,
    pub formatted: String,
}

/// Format a whole document, keeping a final newline if the input had one.
pub fn format_document(text: &str, config: &FormatConfig) -> String {
    let mut formatted = format(text, config);
    if text.ends_with('\n') && !formatted.is_empty() {
        formatted.push('\n');
    }
    formatted
}

/// Format the file at `path`; when `write` is set, replace its contents if
/// they change.
pub fn process_file(path: &Path, config: &FormatConfig, write: bool) -> Result<Outcome> {
    let original = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let formatted = format_document(&original, config);

    let status = if formatted == original {
        FileStatus::Unchanged
    } else if write {
        std::fs::write(path, &formatted)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Formatted {}", path.display());
        FileStatus::Reformatted
    } else {
        FileStatus::NeedsFormatting
    };
    log::debug!("{}: {:?}", path.display(), status);

    Ok(Outcome {
        report: FileReport {
            path: path.to_string_lossy().to_string(),
            status,
        },
        formatted,
    })
}

/// Compile file-name glob patterns. Invalid globs are skipped with a warning.
pub fn compile_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                log::warn!("Ignoring invalid pattern '{}': {}", p, e);
                None
            }
        })
        .collect()
}

/// Whether the file name of `path` matches any of `patterns`.
pub fn matches_patterns(path: &Path, patterns: &[Pattern]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let opts = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    patterns.iter().any(|p| p.matches_with(name, opts))
}

/// Resolve command-line arguments into a sorted, de-duplicated file list.
///
/// Files are taken as-is, directories are searched recursively for files
/// matching `patterns`, and anything else is treated as a glob.
pub fn expand_targets(args: &[String], patterns: &[Pattern]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for arg in args {
        let path = Path::new(arg);
        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            let walk = format!("{}/**/*", Pattern::escape(arg.trim_end_matches('/')));
            files.extend(
                glob_files(&walk)?
                    .into_iter()
                    .filter(|p| matches_patterns(p, patterns)),
            );
        } else {
            let matched = glob_files(arg)?;
            if matched.is_empty() {
                anyhow::bail!("No files match '{}'", arg);
            }
            files.extend(matched);
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn glob_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries =
        glob::glob(pattern).with_context(|| format!("Invalid path pattern '{}'", pattern))?;
    Ok(entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .filter(|p| p.is_file())
        .collect())
}
