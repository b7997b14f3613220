//! Error types for docmap.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::report::OutputError;
use crate::walker::WalkError;

/// Top-level error type for docmap operations.
///
/// Only fatal conditions reach this type. Per-file problems are logged and
/// skipped inside the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DocmapError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(WalkError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

impl From<WalkError> for DocmapError {
    fn from(error: WalkError) -> Self {
        match error {
            WalkError::NotFound { path } => DocmapError::PathNotFound(path),
            WalkError::PermissionDenied { path } => DocmapError::PermissionDenied(path),
            other => DocmapError::Walk(other),
        }
    }
}

/// Map an error to its exit code.
pub fn exit_code(error: &DocmapError) -> i32 {
    match error {
        DocmapError::PathNotFound(_) => 3,
        DocmapError::PermissionDenied(_) => 4,
        DocmapError::Io(_) => 1,
        DocmapError::Walk(_) => 2,
        DocmapError::Config(_) => 1,
        DocmapError::Output(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_errors_map_to_specific_codes() {
        let missing: DocmapError = WalkError::NotFound { path: "/x".into() }.into();
        assert!(matches!(missing, DocmapError::PathNotFound(_)));
        assert_eq!(exit_code(&missing), 3);

        let denied: DocmapError = WalkError::PermissionDenied { path: "/x".into() }.into();
        assert_eq!(exit_code(&denied), 4);

        let not_dir: DocmapError = WalkError::NotADirectory { path: "/x".into() }.into();
        assert_eq!(exit_code(&not_dir), 2);
    }

    #[test]
    fn test_output_error_code() {
        let err = DocmapError::Output(OutputError::Write {
            path: "/x".into(),
            source: std::io::Error::other("disk full"),
        });
        assert_eq!(exit_code(&err), 1);
        assert!(err.to_string().contains("disk full"));
    }
}
