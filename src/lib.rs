//! Docmap - map a Python project's structure and documentation coverage.
//!
//! Docmap walks a source tree, filters it through gitignore-style rules,
//! renders the directory structure and parses every source file's top-level
//! declarations to find out which of them carry a docstring.
//!
//! # Quick Start
//!
//! ```no_run
//! use docmap::builder::Summarizer;
//!
//! let outcome = Summarizer::new("./my-project")
//!     .output_dir("./reports")
//!     .run()
//!     .unwrap();
//!
//! println!("{} undocumented declarations", outcome.report.undocumented_count());
//! ```
//!
//! # Modules
//!
//! - [`patterns`] - Ignore rules compiled from glob patterns
//! - [`walker`] - Filtered directory traversal
//! - [`tree`] - File tree representation and rendering
//! - [`extract`] - Tree-sitter based declaration extraction
//! - [`report`] - Summary and undocumented-elements artifacts
//! - [`config`] - Optional TOML configuration
//! - [`builder`] - Fluent API tying the pipeline together

pub mod builder;
pub mod config;
pub mod errors;
pub mod extract;
pub mod patterns;
pub mod report;
pub mod tree;
pub mod walker;

// Re-export key types at crate root for convenience
pub use builder::{RunOutcome, Summarizer};
pub use config::{Config, ConfigError};
pub use errors::DocmapError;
pub use extract::{Declaration, DeclarationKind, ExtractError, PythonParser, SourceParser};
pub use patterns::{IgnoreRule, IgnoreRules};
pub use report::{AnalysisReport, FileReport, OutputError};
pub use tree::{FileNode, NodeKind};
pub use walker::{PathEntry, WalkError, WalkOptions};
