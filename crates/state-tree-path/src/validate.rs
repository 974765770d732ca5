//! Validation of path strings and segment lists.

use thiserror::Error;

/// Maximum allowed path string length.
const MAX_PATH_LENGTH: usize = 1024;

/// Maximum allowed number of segments.
const MAX_SEGMENTS: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path '{0}' must be empty or start with '/', './' or '../'")]
    Malformed(String),
    #[error("path is longer than {MAX_PATH_LENGTH} characters")]
    TooLong,
    #[error("path has more than {MAX_SEGMENTS} segments")]
    TooDeep,
}

/// Validates a path string used for resolution or patch addressing.
///
/// # Errors
///
/// - [`PathError::Malformed`] when a non-empty path does not start with `/`,
///   `.` or `..`
/// - [`PathError::TooLong`] when the path exceeds 1024 characters
///
/// # Example
///
/// ```
/// use state_tree_path::validate_path;
///
/// validate_path("").unwrap();
/// validate_path("/todos/0").unwrap();
/// validate_path("../sibling").unwrap();
/// validate_path("todos").unwrap_err();
/// ```
pub fn validate_path(path: &str) -> Result<(), PathError> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(PathError::TooLong);
    }
    if path.is_empty() || path.starts_with('/') || path == "." || path == ".." {
        return Ok(());
    }
    if path.starts_with("./") || path.starts_with("../") {
        return Ok(());
    }
    Err(PathError::Malformed(path.to_string()))
}

/// Validates a list of segments.
///
/// # Errors
///
/// Returns [`PathError::TooDeep`] when there are more than 256 segments.
pub fn validate_segments<S: AsRef<str>>(segments: &[S]) -> Result<(), PathError> {
    if segments.len() > MAX_SEGMENTS {
        return Err(PathError::TooDeep);
    }
    Ok(())
}
