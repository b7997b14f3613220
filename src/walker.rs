//! Directory traversal filtered through [`IgnoreRules`].
//!
//! Uses the `ignore` crate for the raw walk, with its own gitignore handling
//! switched off: exclusion is decided entirely by the compiled rule set, and
//! excluded directories are pruned before they are read.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, warn};

use crate::patterns::IgnoreRules;
use crate::tree::{FileNode, NodeKind};

/// Errors that abort a walk. Problems below the root are logged instead.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Extensions (without the dot) of files that are listed and extracted.
    pub extensions: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
        }
    }
}

impl WalkOptions {
    /// Options listing files with the given extensions.
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x == ext))
    }
}

/// A visited entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    /// Path on disk.
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub relative: PathBuf,
    /// File or directory.
    pub kind: NodeKind,
    /// Depth from root (root = 0).
    pub depth: usize,
}

/// Result of a walk.
#[derive(Debug, Clone)]
pub struct WalkOutput {
    /// Sorted tree of visible directories and source files.
    pub tree: FileNode,
    /// Source files in depth-first pre-order, directories first.
    pub files: Vec<PathEntry>,
}

/// Walk `root`, pruning everything `rules` excludes.
///
/// Hidden entries are always skipped. Only files whose extension is listed in
/// `options` are kept; directories are kept even when they hold no such file.
///
/// # Examples
///
/// ```no_run
/// use docmap::patterns::IgnoreRules;
/// use docmap::walker::{walk, WalkOptions};
/// use std::path::Path;
///
/// let rules = IgnoreRules::from_patterns(["tests/"]);
/// let output = walk(Path::new("."), &rules, &WalkOptions::default()).unwrap();
/// for file in &output.files {
///     println!("{}", file.relative.display());
/// }
/// ```
pub fn walk(root: &Path, rules: &IgnoreRules, options: &WalkOptions) -> Result<WalkOutput, WalkError> {
    check_root(root)?;

    let base = root.to_path_buf();
    let prune_rules = rules.clone();

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .hidden(true)
        .follow_links(false)
        .filter_entry(move |entry| {
            let relative = entry.path().strip_prefix(&base).unwrap_or(entry.path());
            let excluded = prune_rules.is_excluded(relative);
            if excluded {
                debug!("excluded {}", relative.display());
            }
            !excluded
        });

    let mut entries = Vec::new();

    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let path = entry.path().to_path_buf();
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        let kind = if file_type.is_dir() {
            NodeKind::Directory
        } else if (file_type.is_file() || (file_type.is_symlink() && path.is_file()))
            && options.is_source(&path)
        {
            NodeKind::File
        } else {
            continue;
        };

        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        entries.push(PathEntry {
            path,
            relative,
            kind,
            depth: entry.depth(),
        });
    }

    let tree = build_tree(root, entries);
    let files = tree
        .files()
        .into_iter()
        .map(|node| PathEntry {
            path: node.path.clone(),
            relative: node.relative.clone(),
            kind: NodeKind::File,
            depth: node.relative.components().count(),
        })
        .collect();

    Ok(WalkOutput { tree, files })
}

fn check_root(root: &Path) -> Result<(), WalkError> {
    let metadata = root.metadata().map_err(|e| match e.kind() {
        ErrorKind::NotFound => WalkError::NotFound {
            path: root.to_path_buf(),
        },
        ErrorKind::PermissionDenied => WalkError::PermissionDenied {
            path: root.to_path_buf(),
        },
        _ => WalkError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })?;

    if !metadata.is_dir() {
        return Err(WalkError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    std::fs::read_dir(root).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => WalkError::PermissionDenied {
            path: root.to_path_buf(),
        },
        _ => WalkError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })?;

    Ok(())
}

/// Assemble visited entries into a sorted tree rooted at `root`.
fn build_tree(root: &Path, mut entries: Vec<PathEntry>) -> FileNode {
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.to_string_lossy().into_owned());

    let mut node_map: HashMap<PathBuf, FileNode> = HashMap::with_capacity(entries.len());

    for entry in &entries {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let node = match entry.kind {
            NodeKind::Directory => FileNode::directory(name, &entry.path, &entry.relative),
            NodeKind::File => FileNode::file(name, &entry.path, &entry.relative),
        };
        node_map.insert(entry.relative.clone(), node);
    }

    let mut root_node = FileNode::directory(root_name, root, PathBuf::new());

    // Deepest first, so children are attached before their parent is moved.
    entries.sort_by(|a, b| b.depth.cmp(&a.depth));

    for entry in &entries {
        let Some(child) = node_map.remove(&entry.relative) else {
            continue;
        };

        let parent = entry.relative.parent().map(Path::to_path_buf).unwrap_or_default();
        if parent.as_os_str().is_empty() {
            root_node.add_child(child);
        } else if let Some(parent_node) = node_map.get_mut(&parent) {
            parent_node.add_child(child);
        }
    }

    root_node.sort_children();
    root_node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::render_tree;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn relatives(output: &WalkOutput) -> Vec<String> {
        output
            .files
            .iter()
            .map(|f| f.relative.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_walk_order_directories_first() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "zeta.py");
        touch(dir.path(), "Alpha.py");
        touch(dir.path(), "pkg/b.py");
        touch(dir.path(), "pkg/a.py");
        touch(dir.path(), "pkg/sub/c.py");
        touch(dir.path(), "Lib/d.py");

        let output = walk(dir.path(), &IgnoreRules::empty(), &WalkOptions::default()).unwrap();

        assert_eq!(
            relatives(&output),
            ["Lib/d.py", "pkg/sub/c.py", "pkg/a.py", "pkg/b.py", "Alpha.py", "zeta.py"]
        );
    }

    #[test]
    fn test_walk_prunes_excluded_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/a.py");
        touch(dir.path(), "tests/b.py");
        touch(dir.path(), "tests/keep/c.py");

        let rules = IgnoreRules::from_patterns(["tests/"]);
        let output = walk(dir.path(), &rules, &WalkOptions::default()).unwrap();

        assert_eq!(relatives(&output), ["src/a.py"]);
        let rendered = render_tree(&output.tree);
        assert!(!rendered.contains("tests"));
        assert!(!rendered.contains("keep"));
    }

    #[test]
    fn test_walk_skips_hidden_and_non_source_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "visible.py");
        touch(dir.path(), ".hidden.py");
        touch(dir.path(), ".venv/lib/site.py");
        touch(dir.path(), "README.md");
        touch(dir.path(), "data/values.csv");

        let output = walk(dir.path(), &IgnoreRules::empty(), &WalkOptions::default()).unwrap();

        assert_eq!(relatives(&output), ["visible.py"]);

        let rendered = render_tree(&output.tree);
        assert!(rendered.contains("data/"));
        assert!(!rendered.contains("README"));
        assert!(!rendered.contains("values.csv"));
        assert!(!rendered.contains(".venv"));
    }

    #[test]
    fn test_walk_render_snapshot() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "app/main.py");
        touch(dir.path(), "app/util/io.py");
        touch(dir.path(), "app/notes.txt");
        touch(dir.path(), "setup.py");

        let output = walk(dir.path(), &IgnoreRules::empty(), &WalkOptions::default()).unwrap();
        let root_name = dir.path().file_name().unwrap().to_string_lossy().into_owned();

        let expected = format!(
            "{root_name}/\n\
             ├── app/\n\
             │   ├── util/\n\
             │   │   └── io.py\n\
             │   └── main.py\n\
             └── setup.py\n"
        );
        assert_eq!(render_tree(&output.tree), expected);
    }

    #[test]
    fn test_walk_custom_extensions() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.py");
        touch(dir.path(), "b.pyi");

        let output = walk(
            dir.path(),
            &IgnoreRules::empty(),
            &WalkOptions::with_extensions(["pyi"]),
        )
        .unwrap();

        assert_eq!(relatives(&output), ["b.pyi"]);
    }

    #[test]
    fn test_walk_excluded_file_pattern() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "pkg/__init__.py");
        touch(dir.path(), "pkg/core.py");

        let rules = IgnoreRules::from_patterns(["_*"]);
        let output = walk(dir.path(), &rules, &WalkOptions::default()).unwrap();

        assert_eq!(relatives(&output), ["pkg/core.py"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_skips_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "locked/hidden.py");
        touch(dir.path(), "open/a.py");
        touch(dir.path(), "top.py");

        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to root.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = walk(dir.path(), &IgnoreRules::empty(), &WalkOptions::default());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let output = result.unwrap();
        assert_eq!(relatives(&output), ["open/a.py", "top.py"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_lists_symlinked_file_without_following_directories() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        touch(dir.path(), "pkg/real.py");
        touch(outside.path(), "other/external.py");

        symlink(dir.path().join("pkg/real.py"), dir.path().join("pkg/alias.py")).unwrap();
        symlink(outside.path().join("other"), dir.path().join("linked")).unwrap();

        let output = walk(dir.path(), &IgnoreRules::empty(), &WalkOptions::default()).unwrap();

        assert_eq!(relatives(&output), ["pkg/alias.py", "pkg/real.py"]);
        assert!(!render_tree(&output.tree).contains("external"));
    }

    #[test]
    fn test_walk_nonexistent_root() {
        let result = walk(
            Path::new("/nonexistent/docmap/root"),
            &IgnoreRules::empty(),
            &WalkOptions::default(),
        );
        assert!(matches!(result, Err(WalkError::NotFound { .. })));
    }

    #[test]
    fn test_walk_root_is_file() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.py");

        let result = walk(
            &dir.path().join("a.py"),
            &IgnoreRules::empty(),
            &WalkOptions::default(),
        );
        assert!(matches!(result, Err(WalkError::NotADirectory { .. })));
    }
}
