//! Declaration extraction using tree-sitter.
//!
//! A [`SourceParser`] turns source text into top-level declarations; this
//! module wraps it with file reading, decoding and per-file bookkeeping so the
//! rest of the pipeline never sees a parser directly.

mod python;

pub use python::PythonParser;

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tree_sitter::{Node, Parser};

// Thread-local parser caching to avoid re-initialization overhead.
thread_local! {
    static PYTHON_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn init_python_parser() -> Result<Parser, ()> {
    let mut p = Parser::new();
    p.set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|_| ())?;
    Ok(p)
}

fn with_cached_parser<F, R>(
    cell: &'static std::thread::LocalKey<RefCell<Option<Parser>>>,
    init: fn() -> Result<Parser, ()>,
    f: F,
) -> Result<R, ParseError>
where
    F: FnOnce(&mut Parser) -> R,
{
    cell.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(init().map_err(|()| ParseError::ParserInit)?);
        }

        let parser = slot.as_mut().ok_or(ParseError::ParserInit)?;
        Ok(f(parser))
    })
}

/// Execute a function with a cached Python parser.
pub(crate) fn with_python_parser<F, R>(f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut Parser) -> R,
{
    with_cached_parser(&PYTHON_PARSER, init_python_parser, f)
}

/// Find a child node by kind.
pub(crate) fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    node.children(&mut node.walk()).find(|c| c.kind() == kind)
}

/// Extract node text from content.
pub(crate) fn node_text<'a>(node: Node, content: &'a str) -> &'a str {
    &content[node.byte_range()]
}

/// Length of documentation previews in the summary report.
pub const DEFAULT_PREVIEW_LEN: usize = 100;

/// Marker used in reports for declarations without documentation.
pub const NO_DOCUMENTATION: &str = "No documentation";

/// Kind of a top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclarationKind {
    Class,
    Function,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationKind::Class => write!(f, "Class"),
            DeclarationKind::Function => write!(f, "Function"),
        }
    }
}

/// A declaration as reported by a [`SourceParser`], before it is tied to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDeclaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// Cleaned documentation text. `None` when absent or empty.
    pub doc: Option<String>,
    /// 1-indexed line of the declaration keyword.
    pub line: usize,
}

/// A top-level declaration found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    pub doc: Option<String>,
    /// Owning file, relative to the analysis root.
    pub file: PathBuf,
    /// Position among the file's declarations, starting at 0.
    pub order: usize,
    /// 1-indexed source line.
    pub line: usize,
}

impl Declaration {
    pub fn is_documented(&self) -> bool {
        self.doc.is_some()
    }

    /// Documentation preview of at most `max_chars` characters, or
    /// [`NO_DOCUMENTATION`].
    pub fn preview(&self, max_chars: usize) -> String {
        match &self.doc {
            Some(doc) => preview(doc, max_chars),
            None => NO_DOCUMENTATION.to_string(),
        }
    }
}

/// Collapse whitespace to single spaces and cut to `max_chars` characters,
/// appending `...` when something was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}

/// Where a parse failed.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to initialize parser")]
    ParserInit,

    #[error("parser produced no syntax tree")]
    NoTree,

    #[error("invalid syntax at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
}

/// Capability interface for language front-ends.
///
/// An adapter parses source text structurally and returns the file's
/// top-level class-like and function-like declarations in source order.
pub trait SourceParser {
    /// Human-readable language name.
    fn language(&self) -> &'static str;

    /// File extensions (without the dot) handled by this parser.
    fn extensions(&self) -> &[&'static str];

    /// Parse `content` into top-level declarations.
    fn parse(&self, content: &str) -> Result<Vec<ParsedDeclaration>, ParseError>;
}

/// Errors during extraction of a single file. All of them are recoverable:
/// the caller logs and skips the file.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not valid UTF-8: {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("binary content: {path}")]
    Binary { path: PathBuf },

    #[error("parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Extract declarations from already-loaded source text.
///
/// `relative` is recorded as the owning file of every declaration.
pub fn extract(
    content: &str,
    relative: &Path,
    parser: &dyn SourceParser,
) -> Result<Vec<Declaration>, ExtractError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    if content.contains('\0') {
        return Err(ExtractError::Binary {
            path: relative.to_path_buf(),
        });
    }

    let parsed = parser.parse(content).map_err(|source| ExtractError::Parse {
        path: relative.to_path_buf(),
        source,
    })?;

    Ok(parsed
        .into_iter()
        .enumerate()
        .map(|(order, d)| Declaration {
            kind: d.kind,
            name: d.name,
            doc: d.doc,
            file: relative.to_path_buf(),
            order,
            line: d.line,
        })
        .collect())
}

/// Read `path` and extract its declarations.
pub fn extract_file(
    path: &Path,
    relative: &Path,
    parser: &dyn SourceParser,
) -> Result<Vec<Declaration>, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Read {
        path: relative.to_path_buf(),
        source,
    })?;

    let content = String::from_utf8(bytes).map_err(|source| ExtractError::Decode {
        path: relative.to_path_buf(),
        source,
    })?;

    extract(&content, relative, parser)
}
