use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for edit operations
pub type EditResult<T> = Result<T, EditError>;

/// Errors that can occur during edit operations.
///
/// The taxonomy matters for batch behavior: `FileNotFound` is fatal to the
/// single operation, `AlreadyExists` is fatal only to that file's change,
/// permission and IO failures are recovered per-file, and `Validation`
/// aborts before any file is touched. User cancellation is not an error and
/// is carried on the outcome types instead.
#[derive(Error, Debug)]
pub enum EditError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("File already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Blocked by ignore rule: {0}")]
    Blocked(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid UTF-8 in file {}: {}", .path.display(), .source)]
    EncodingError {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
}

/// Canonicalize the path and strip UNC prefixes so that
/// comparisons on Windows are consistent.
pub fn unify_path(original: &Path) -> PathBuf {
    let canonical = original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf());
    strip_unc_prefix(&canonical)
}

/// Strips the Windows UNC prefix (\\?\) from a path if present
fn strip_unc_prefix(p: &Path) -> PathBuf {
    let s = p.display().to_string();
    if let Some(stripped) = s.strip_prefix(r"\\?\") {
        PathBuf::from(stripped)
    } else {
        p.to_path_buf()
    }
}

impl EditError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::AlreadyExists(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn blocked(arg: impl Into<String>) -> Self {
        Self::Blocked(arg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, source: std::string::FromUtf8Error) -> Self {
        let path = path.into();
        let unified = unify_path(&path);
        Self::EncodingError {
            path: unified,
            source,
        }
    }
}
