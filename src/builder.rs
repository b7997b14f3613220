//! Fluent builder API for docmap.
//!
//! [`Summarizer`] wires the pipeline together: ignore rules, the filtered walk,
//! per-file extraction and the report artifacts.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn, Dispatch};

use crate::config::Config;
use crate::errors::DocmapError;
use crate::extract::{extract_file, PythonParser, SourceParser};
use crate::patterns::IgnoreRules;
use crate::report::{self, AnalysisReport, FileReport, BACKUP_DIR};
use crate::tree::render_tree;
use crate::walker::{walk, WalkOptions};

/// Builder for analyzing a project and writing its reports.
///
/// Logging goes to the `tracing` dispatcher held by the builder. It defaults
/// to whatever dispatcher is current when the builder is created and can be
/// replaced with [`Summarizer::dispatch`].
///
/// # Examples
///
/// ```no_run
/// use docmap::builder::Summarizer;
///
/// let outcome = Summarizer::new("./my-project")
///     .output_dir("./reports")
///     .ignore("migrations/")
///     .run()
///     .unwrap();
///
/// println!("summary written to {}", outcome.summary_path.display());
/// ```
pub struct Summarizer {
    root: PathBuf,
    output_dir: PathBuf,
    summary_file: Option<PathBuf>,
    undocumented_file: Option<PathBuf>,
    config: Config,
    parser: Box<dyn SourceParser>,
    timestamp: Option<NaiveDateTime>,
    dispatch: Dispatch,
}

impl Summarizer {
    /// Create a new builder for the given project root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dir: PathBuf::from("."),
            summary_file: None,
            undocumented_file: None,
            config: Config::default(),
            parser: Box::new(PythonParser::new()),
            timestamp: None,
            dispatch: tracing::dispatcher::get_default(|d| d.clone()),
        }
    }

    /// Directory receiving the reports. Created if missing.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Custom summary file. Relative paths resolve against the output directory.
    pub fn summary_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_file = Some(path.into());
        self
    }

    /// Custom undocumented-elements file. Relative paths resolve against the
    /// output directory.
    pub fn undocumented_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.undocumented_file = Some(path.into());
        self
    }

    /// Replace all settings with `config`.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Add an ignore pattern.
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.config.extra_ignores.push(pattern.into());
        self
    }

    /// Read the project's `.gitignore` (default: true).
    pub fn read_gitignore(mut self, read: bool) -> Self {
        self.config.read_gitignore = read;
        self
    }

    /// Update the output directory's `.gitignore` (default: true).
    pub fn update_output_ignore(mut self, update: bool) -> Self {
        self.config.update_output_ignore = update;
        self
    }

    /// Maximum documentation preview length in characters.
    pub fn preview_len(mut self, len: usize) -> Self {
        self.config.preview_len = len;
        self
    }

    /// Use a different language front-end.
    pub fn parser(mut self, parser: impl SourceParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Fix the report timestamp instead of reading the clock.
    pub fn timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Send this run's log events to `dispatch`.
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Analyze the project without writing anything.
    pub fn analyze(&self) -> Result<AnalysisReport, DocmapError> {
        tracing::dispatcher::with_default(&self.dispatch, || self.analyze_inner())
    }

    /// Analyze the project and write both reports.
    pub fn run(self) -> Result<RunOutcome, DocmapError> {
        tracing::dispatcher::with_default(&self.dispatch, || self.run_inner())
    }

    fn analyze_inner(&self) -> Result<AnalysisReport, DocmapError> {
        self.config.validate()?;

        let root = resolve_root(&self.root)?;
        info!("analyzing {} ({})", root.display(), self.parser.language());

        let rules = IgnoreRules::load(
            &root,
            &self.config.default_ignores,
            &self.config.extra_ignores,
            self.config.read_gitignore,
        );

        let walk_options = WalkOptions::with_extensions(self.parser.extensions().iter().copied());
        let output = walk(&root, &rules, &walk_options)?;
        debug!(
            "walked {} directories, {} source files",
            output.tree.directory_count(),
            output.tree.file_count()
        );

        let mut files = Vec::with_capacity(output.files.len());
        for entry in &output.files {
            match extract_file(&entry.path, &entry.relative, self.parser.as_ref()) {
                Ok(declarations) => {
                    debug!(
                        "{}: {} declarations",
                        entry.relative.display(),
                        declarations.len()
                    );
                    files.push(FileReport::new(&entry.relative, declarations));
                }
                Err(e) => {
                    warn!("Skipped {}: {}", entry.relative.display(), e);
                    files.push(FileReport::skipped(&entry.relative, e.to_string()));
                }
            }
        }

        let report = AnalysisReport {
            root,
            tree: render_tree(&output.tree),
            files,
        };

        info!(
            "{} files, {} declarations, {} undocumented, {} skipped",
            report.files.len(),
            report.declaration_count(),
            report.undocumented_count(),
            report.skipped_count()
        );

        Ok(report)
    }

    fn run_inner(&self) -> Result<RunOutcome, DocmapError> {
        let report = self.analyze_inner()?;

        report::ensure_dir(&self.output_dir)?;
        let output_dir = self.output_dir.canonicalize()?;
        report::ensure_dir(&output_dir.join(BACKUP_DIR))?;

        let timestamp = self
            .timestamp
            .unwrap_or_else(|| Local::now().naive_local());
        let (summary_name, undocumented_name) = report::default_file_names(&timestamp);

        let summary_path = resolve_output(&output_dir, self.summary_file.as_deref(), &summary_name);
        let undocumented_path = resolve_output(
            &output_dir,
            self.undocumented_file.as_deref(),
            &undocumented_name,
        );

        report::write_artifact(
            &summary_path,
            &report::format_summary(&report, &timestamp, self.config.preview_len),
        )?;
        report::write_artifact(&undocumented_path, &report::format_undocumented(&report))?;

        if self.config.update_output_ignore {
            report::update_ignore_file(&output_dir)?;
        }

        info!("Analysis complete: {}", summary_path.display());

        Ok(RunOutcome {
            summary_path,
            undocumented_path,
            report,
        })
    }
}

/// Result of [`Summarizer::run`].
#[derive(Debug)]
pub struct RunOutcome {
    pub summary_path: PathBuf,
    pub undocumented_path: PathBuf,
    pub report: AnalysisReport,
}

fn resolve_root(root: &Path) -> Result<PathBuf, DocmapError> {
    root.canonicalize().map_err(|e| match e.kind() {
        ErrorKind::NotFound => DocmapError::PathNotFound(root.to_path_buf()),
        ErrorKind::PermissionDenied => DocmapError::PermissionDenied(root.to_path_buf()),
        _ => DocmapError::Io(e),
    })
}

fn resolve_output(output_dir: &Path, custom: Option<&Path>, default_name: &str) -> PathBuf {
    match custom {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => output_dir.join(path),
        None => output_dir.join(default_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DeclarationKind;
    use chrono::NaiveDate;
    use std::fs;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn create_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();

        write_file(
            dir.path(),
            "src/a.py",
            r#"
def compute(x):
    """Computes X."""
    return x * 2


class Widget:
    def render(self):
        return "<widget>"
"#,
        );
        write_file(
            dir.path(),
            "tests/b.py",
            "def test_compute():\n    assert True\n",
        );

        dir
    }

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }

        fn dispatch(&self, level: tracing::Level) -> Dispatch {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(level)
                .finish();
            Dispatch::new(subscriber)
        }
    }

    #[test]
    fn test_analyze_scenario() {
        let project = create_test_project();

        let report = Summarizer::new(project.path()).analyze().unwrap();

        let paths: Vec<_> = report.files.iter().map(|f| report::display_path(&f.path)).collect();
        assert_eq!(paths, ["src/a.py"]);

        let decls = &report.files[0].declarations;
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "compute");
        assert_eq!(decls[0].doc.as_deref(), Some("Computes X."));
        assert_eq!(decls[1].kind, DeclarationKind::Class);
        assert_eq!(decls[1].name, "Widget");

        let undocumented: Vec<_> = report.undocumented().map(|d| d.name.as_str()).collect();
        assert_eq!(undocumented, ["Widget"]);
        assert!(!report.tree.contains("tests"));
    }

    #[test]
    fn test_run_writes_artifacts() {
        let project = create_test_project();
        let out = TempDir::new().unwrap();

        let outcome = Summarizer::new(project.path())
            .output_dir(out.path())
            .timestamp(timestamp())
            .run()
            .unwrap();

        assert!(outcome.summary_path.ends_with("project_summary_20240102_030405.txt"));
        assert!(outcome.undocumented_path.ends_with("undocumented_code_20240102_030405.txt"));

        let summary = fs::read_to_string(&outcome.summary_path).unwrap();
        assert!(summary.contains("Generated: 2024-01-02 03:04:05"));
        assert!(summary.contains("File: src/a.py\n"));
        assert!(summary.contains("  Function: compute\n    Documentation: Computes X.\n"));
        assert!(summary.contains("  Class: Widget\n    Documentation: No documentation\n"));
        assert!(!summary.contains("b.py"));

        let undocumented = fs::read_to_string(&outcome.undocumented_path).unwrap();
        let entries: Vec<_> = undocumented.lines().filter(|l| l.starts_with("File: src")).collect();
        assert_eq!(entries, ["File: src/a.py | Element: Class | Name: Widget"]);
        assert!(!undocumented.contains("compute"));

        assert!(out.path().join(BACKUP_DIR).is_dir());
        let ignore = fs::read_to_string(out.path().join(".gitignore")).unwrap();
        assert!(ignore.contains("project_summary_*.txt"));
    }

    #[test]
    fn test_rerun_keeps_ignore_file_stable() {
        let project = create_test_project();
        let out = TempDir::new().unwrap();

        for _ in 0..2 {
            Summarizer::new(project.path())
                .output_dir(out.path())
                .timestamp(timestamp())
                .run()
                .unwrap();
        }

        let ignore = fs::read_to_string(out.path().join(".gitignore")).unwrap();
        let mut lines: Vec<_> = ignore.lines().collect();
        let total = lines.len();
        lines.sort_unstable();
        lines.dedup();
        assert_eq!(lines.len(), total);
    }

    #[test]
    fn test_custom_file_names_and_no_ignore_update() {
        let project = create_test_project();
        let out = TempDir::new().unwrap();

        let outcome = Summarizer::new(project.path())
            .output_dir(out.path().join("reports"))
            .summary_file("overview.txt")
            .undocumented_file("missing_docs.txt")
            .update_output_ignore(false)
            .run()
            .unwrap();

        assert!(outcome.summary_path.ends_with("reports/overview.txt"));
        assert!(outcome.undocumented_path.ends_with("reports/missing_docs.txt"));
        assert!(outcome.summary_path.is_file());
        assert!(!out.path().join("reports/.gitignore").exists());
    }

    #[test]
    fn test_malformed_file_is_skipped_with_warning() {
        let project = create_test_project();
        write_file(project.path(), "src/broken.py", "def broken(:\n    pass\n");
        write_file(
            project.path(),
            "src/legacy.py",
            "def legacy():\n    print \"hi\"\n",
        );
        let out = TempDir::new().unwrap();
        let logs = Captured::default();

        let outcome = Summarizer::new(project.path())
            .output_dir(out.path())
            .dispatch(logs.dispatch(tracing::Level::WARN))
            .run()
            .unwrap();

        let broken = outcome
            .report
            .file_for(Path::new("src/broken.py"))
            .unwrap();
        assert!(broken.declarations.is_empty());
        assert!(broken.skipped.is_some());

        let legacy = outcome.report.file_for(Path::new("src/legacy.py")).unwrap();
        assert!(legacy.declarations.is_empty());
        assert!(legacy.skipped.is_some());

        let undocumented = fs::read_to_string(&outcome.undocumented_path).unwrap();
        assert!(!undocumented.contains("broken"));
        assert!(!undocumented.contains("legacy"));

        let summary = fs::read_to_string(&outcome.summary_path).unwrap();
        assert!(!summary.contains("Name: broken"));
        assert!(!summary.contains("Function: broken"));
        assert!(!summary.contains("Function: legacy"));

        let captured = logs.contents();
        assert!(captured.contains("WARN"));
        assert!(captured.contains("broken.py"));
    }

    #[test]
    fn test_debug_log_reports_walk_counts() {
        let project = create_test_project();
        write_file(project.path(), "notes/readme.txt", "");
        let logs = Captured::default();

        Summarizer::new(project.path())
            .ignore("/src/legacy/")
            .dispatch(logs.dispatch(tracing::Level::DEBUG))
            .analyze()
            .unwrap();

        let captured = logs.contents();
        assert!(captured.contains("(Python)"));
        assert!(captured.contains("(1 anchored)"));
        assert!(captured.contains("walked 3 directories, 1 source files"));
    }

    #[test]
    fn test_gitignore_patterns_are_applied() {
        let project = create_test_project();
        write_file(project.path(), ".gitignore", "# local\ngenerated/\n");
        write_file(project.path(), "generated/models.py", "class Model:\n    pass\n");

        let report = Summarizer::new(project.path()).analyze().unwrap();
        assert!(report.file_for(Path::new("generated/models.py")).is_none());

        let report = Summarizer::new(project.path())
            .read_gitignore(false)
            .analyze()
            .unwrap();
        assert!(report.file_for(Path::new("generated/models.py")).is_some());
    }

    #[test]
    fn test_extra_ignore_pattern() {
        let project = create_test_project();

        let report = Summarizer::new(project.path())
            .ignore("src/")
            .analyze()
            .unwrap();

        assert!(report.files.is_empty());
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = Summarizer::new(dir.path().join("absent"))
            .analyze()
            .unwrap_err();
        assert!(matches!(err, DocmapError::PathNotFound(_)));
    }

    #[test]
    fn test_invalid_preview_len() {
        let project = create_test_project();
        let err = Summarizer::new(project.path())
            .preview_len(0)
            .analyze()
            .unwrap_err();
        assert!(matches!(err, DocmapError::Config(_)));
    }
}
