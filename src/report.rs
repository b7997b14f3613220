//! Report artifacts.
//!
//! Formats the analysis into the summary and undocumented-elements documents,
//! writes them, and keeps the output directory's `.gitignore` aware of them.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::extract::Declaration;

/// Errors while writing report artifacts. All of them are fatal.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to update {path}: {source}")]
    IgnoreFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Prefix of default summary file names.
pub const SUMMARY_PREFIX: &str = "project_summary_";
/// Prefix of default undocumented-elements file names.
pub const UNDOCUMENTED_PREFIX: &str = "undocumented_code_";
/// Directory created next to the reports.
pub const BACKUP_DIR: &str = "backups";

/// Lines kept in the output directory's `.gitignore`.
pub const OUTPUT_IGNORE_ENTRIES: [&str; 4] = [
    "# Project analysis outputs",
    "project_summary_*.txt",
    "undocumented_code_*.txt",
    "backups/",
];

const SUMMARY_BANNER: &str = "=== Project Summary and AI Analysis Guide ===";
const UNDOCUMENTED_BANNER: &str = "=== Undocumented Code Elements ===";

const ANALYSIS_PROMPT: &str = "\
**AI Analysis Prompt (Copy-Paste Ready):**

Analyze this project structure focusing on:
1. Architecture efficiency
2. Code quality metrics
3. Performance bottlenecks
4. Scalability potential

Provide recommendations in this format:
- [High/Medium/Low Impact] [Category] Concise Suggestion (Cost-Benefit Rationale)

Constraints:
- Max 10 key suggestions
- Technical specificity
- Minimal resource prioritization
- No verbose explanations

Example:
- [High] [Arch] Extract shared utils to module (Reduce 40% code duplication)
- [Medium] [Perf] Cache DB queries in user/auth routes (Save ~200ms/request)
";

/// Declarations of one source file.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// Path relative to the analysis root.
    pub path: PathBuf,
    /// Top-level declarations in source order.
    pub declarations: SmallVec<[Declaration; 16]>,
    /// Why the file contributed nothing, when extraction failed.
    pub skipped: Option<String>,
}

impl FileReport {
    pub fn new(path: impl Into<PathBuf>, declarations: impl IntoIterator<Item = Declaration>) -> Self {
        Self {
            path: path.into(),
            declarations: declarations.into_iter().collect(),
            skipped: None,
        }
    }

    pub fn skipped(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            declarations: SmallVec::new(),
            skipped: Some(reason.into()),
        }
    }
}

/// Everything one run learned about a project.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Absolute project root.
    pub root: PathBuf,
    /// Rendered directory structure.
    pub tree: String,
    /// One entry per listed source file, in walk order.
    pub files: Vec<FileReport>,
}

impl AnalysisReport {
    /// Undocumented declarations in discovery order.
    pub fn undocumented(&self) -> impl Iterator<Item = &Declaration> {
        self.files
            .iter()
            .flat_map(|f| f.declarations.iter())
            .filter(|d| !d.is_documented())
    }

    pub fn declaration_count(&self) -> usize {
        self.files.iter().map(|f| f.declarations.len()).sum()
    }

    pub fn undocumented_count(&self) -> usize {
        self.undocumented().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.files.iter().filter(|f| f.skipped.is_some()).count()
    }

    pub fn file_for(&self, path: &Path) -> Option<&FileReport> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Render a relative path with `/` separators regardless of platform.
pub fn display_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Default artifact names for a run started at `timestamp`.
pub fn default_file_names(timestamp: &NaiveDateTime) -> (String, String) {
    let stamp = timestamp.format("%Y%m%d_%H%M%S");
    (
        format!("{SUMMARY_PREFIX}{stamp}.txt"),
        format!("{UNDOCUMENTED_PREFIX}{stamp}.txt"),
    )
}

/// Format the summary document.
pub fn format_summary(report: &AnalysisReport, generated: &NaiveDateTime, preview_len: usize) -> String {
    let mut output = String::with_capacity(8192);

    output.push_str(SUMMARY_BANNER);
    output.push('\n');
    output.push_str(&format!("Generated: {}\n", generated.format("%Y-%m-%d %H:%M:%S")));
    output.push_str(&format!("Project Root: {}\n", report.root.display()));
    output.push('\n');
    output.push_str(ANALYSIS_PROMPT);
    output.push_str("\nProject Structure:\n\n");
    output.push_str(&report.tree);

    for file in &report.files {
        output.push_str(&format!("\nFile: {}\n", display_path(&file.path)));
        for decl in &file.declarations {
            output.push_str(&format!("  {}: {}\n", decl.kind, decl.name));
            output.push_str(&format!("    Documentation: {}\n", decl.preview(preview_len)));
        }
    }

    output
}

/// Format the undocumented-elements document.
pub fn format_undocumented(report: &AnalysisReport) -> String {
    let mut output = String::with_capacity(1024);

    output.push_str(UNDOCUMENTED_BANNER);
    output.push('\n');
    output.push_str("Use this format for documentation generation:\n");
    output.push_str("File: <relative_path> | Element: <type> | Name: <name>\n\n");

    for decl in report.undocumented() {
        output.push_str(&format!(
            "File: {} | Element: {} | Name: {}\n",
            display_path(&decl.file),
            decl.kind,
            decl.name
        ));
    }

    output
}

/// Write one artifact, replacing any existing file.
pub fn write_artifact(path: &Path, contents: &str) -> Result<(), OutputError> {
    fs::write(path, contents).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> Result<(), OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Append the report entries to `dir/.gitignore`, creating it if needed.
///
/// Entries already present as a line are skipped, so repeated runs leave the
/// file unchanged. Returns whether anything was written.
pub fn update_ignore_file(dir: &Path) -> Result<bool, OutputError> {
    let path = dir.join(".gitignore");
    let ignore_err = |source| OutputError::IgnoreFile {
        path: path.clone(),
        source,
    };

    let existing = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ignore_err(e)),
    };

    let present: HashSet<&str> = existing.lines().map(str::trim).collect();
    let missing: Vec<&str> = OUTPUT_IGNORE_ENTRIES
        .iter()
        .copied()
        .filter(|entry| !present.contains(entry))
        .collect();

    if missing.is_empty() {
        debug!("{} already up to date", path.display());
        return Ok(false);
    }

    let mut addition = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        addition.push('\n');
    }
    for entry in &missing {
        addition.push_str(entry);
        addition.push('\n');
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(ignore_err)?;
    file.write_all(addition.as_bytes()).map_err(ignore_err)?;

    debug!("added {} entries to {}", missing.len(), path.display());
    Ok(true)
}
