//! File tree representation and rendering.
//!
//! Provides the in-memory directory structure produced by the walker and
//! renders it with box-drawing characters.

use std::cmp::Ordering;
use std::path::PathBuf;

/// The type of a filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

impl NodeKind {
    /// Check if this is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File)
    }
}

/// A node in the file tree.
#[derive(Debug, Clone)]
pub struct FileNode {
    /// File or directory name (not full path).
    pub name: String,
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the walk root (empty for the root itself).
    pub relative: PathBuf,
    /// Type of node (file or directory).
    pub kind: NodeKind,
    /// Child nodes (empty for files).
    children: Vec<FileNode>,
}

impl FileNode {
    /// Create a new directory node.
    pub fn directory(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        relative: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            relative: relative.into(),
            kind: NodeKind::Directory,
            children: Vec::new(),
        }
    }

    /// Create a new file node.
    pub fn file(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        relative: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            relative: relative.into(),
            kind: NodeKind::File,
            children: Vec::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Add a child node. Only valid for directories.
    pub fn add_child(&mut self, child: FileNode) {
        self.children.push(child);
    }

    /// Get child nodes.
    pub fn children(&self) -> &[FileNode] {
        &self.children
    }

    /// Sort children: directories first, then case-insensitively by name.
    pub fn sort_children(&mut self) {
        self.children.sort_by(compare_siblings);

        for child in &mut self.children {
            child.sort_children();
        }
    }

    /// Count total files in this tree.
    pub fn file_count(&self) -> usize {
        match self.kind {
            NodeKind::File => 1,
            NodeKind::Directory => self.children.iter().map(|c| c.file_count()).sum(),
        }
    }

    /// Count total directories in this tree, including this one.
    pub fn directory_count(&self) -> usize {
        match self.kind {
            NodeKind::File => 0,
            NodeKind::Directory => {
                1 + self.children.iter().map(|c| c.directory_count()).sum::<usize>()
            }
        }
    }

    /// Files in depth-first pre-order, following the current child order.
    pub fn files(&self) -> Vec<&FileNode> {
        let mut out = Vec::new();
        collect_files(self, &mut out);
        out
    }
}

fn collect_files<'a>(node: &'a FileNode, out: &mut Vec<&'a FileNode>) {
    match node.kind {
        NodeKind::File => out.push(node),
        NodeKind::Directory => {
            for child in &node.children {
                collect_files(child, out);
            }
        }
    }
}

fn compare_siblings(a: &FileNode, b: &FileNode) -> Ordering {
    match (a.kind, b.kind) {
        (NodeKind::Directory, NodeKind::File) => Ordering::Less,
        (NodeKind::File, NodeKind::Directory) => Ordering::Greater,
        // Exact name breaks ties so `A.py` and `a.py` always render the same way.
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

/// Box-drawing characters for tree rendering.
const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const VERTICAL: &str = "│   ";
const SPACE: &str = "    ";

/// Render a file tree to a string with box-drawing characters.
///
/// # Examples
///
/// ```
/// use docmap::tree::{FileNode, render_tree};
///
/// let mut root = FileNode::directory("project", "/tmp/project", "");
/// root.add_child(FileNode::file("main.py", "/tmp/project/main.py", "main.py"));
/// root.sort_children();
///
/// assert_eq!(render_tree(&root), "project/\n└── main.py\n");
/// ```
pub fn render_tree(root: &FileNode) -> String {
    let mut output = String::with_capacity(4096);
    render_node(&mut output, root, "", true, true);
    output
}

fn render_node(output: &mut String, node: &FileNode, prefix: &str, is_last: bool, is_root: bool) {
    let branch = if is_root {
        ""
    } else if is_last {
        LAST_BRANCH
    } else {
        BRANCH
    };

    output.push_str(prefix);
    output.push_str(branch);
    output.push_str(&node.name);

    if node.is_directory() {
        output.push('/');
    }

    output.push('\n');

    let child_count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let is_last_child = i == child_count - 1;

        let new_prefix = if is_root {
            String::new()
        } else {
            let continuation = if is_last { SPACE } else { VERTICAL };
            format!("{}{}", prefix, continuation)
        };

        render_node(output, child, &new_prefix, is_last_child, false);
    }
}
