//! Input and output path validation
//!
//! Paths are checked before anything is read or written: no `..` segments,
//! an allowed extension, and the right kind of filesystem entry.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::traits::FileSystem;

/// Extensions accepted for the plan input
const INPUT_EXTENSIONS: &[&str] = &["json"];

/// Extensions accepted for the report output
const OUTPUT_EXTENSIONS: &[&str] = &["json", "md"];

/// Error types for path validation
#[derive(Debug, PartialEq)]
pub enum PathValidationError {
    /// Path contains a `..` segment
    Traversal(PathBuf),

    /// Path does not carry one of the allowed extensions
    InvalidExtension {
        path: PathBuf,
        allowed: &'static [&'static str],
    },

    /// Input file does not exist
    NotFound(PathBuf),

    /// Input path exists but is not a regular file
    NotAFile(PathBuf),

    /// Output path is an existing directory
    IsDirectory(PathBuf),
}

impl fmt::Display for PathValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathValidationError::Traversal(path) => {
                write!(
                    f,
                    "Path traversal ('..') is not allowed: {}",
                    path.display()
                )
            }
            PathValidationError::InvalidExtension { path, allowed } => {
                let allowed: Vec<String> = allowed.iter().map(|ext| format!(".{}", ext)).collect();
                write!(
                    f,
                    "File path must end with {}: {}",
                    allowed.join(" or "),
                    path.display()
                )
            }
            PathValidationError::NotFound(path) => {
                write!(f, "File does not exist: {}", path.display())
            }
            PathValidationError::NotAFile(path) => {
                write!(f, "Path is not a file: {}", path.display())
            }
            PathValidationError::IsDirectory(path) => {
                write!(f, "Path is a directory, not a file: {}", path.display())
            }
        }
    }
}

impl std::error::Error for PathValidationError {}

/// Validate the plan input path: no traversal, `.json`, an existing regular file
pub fn validate_input(fs: &dyn FileSystem, path: &Path) -> Result<PathBuf, PathValidationError> {
    reject_traversal(path)?;
    require_extension(path, INPUT_EXTENSIONS)?;

    if !fs.exists(path) {
        return Err(PathValidationError::NotFound(path.to_path_buf()));
    }

    if !fs.is_file(path) {
        return Err(PathValidationError::NotAFile(path.to_path_buf()));
    }

    Ok(path.to_path_buf())
}

/// Validate the report output path: no traversal, `.json` or `.md`, not a directory
pub fn validate_output(fs: &dyn FileSystem, path: &Path) -> Result<PathBuf, PathValidationError> {
    reject_traversal(path)?;
    require_extension(path, OUTPUT_EXTENSIONS)?;

    if fs.is_dir(path) {
        return Err(PathValidationError::IsDirectory(path.to_path_buf()));
    }

    Ok(path.to_path_buf())
}

fn reject_traversal(path: &Path) -> Result<(), PathValidationError> {
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(PathValidationError::Traversal(path.to_path_buf()));
    }
    Ok(())
}

fn require_extension(
    path: &Path,
    allowed: &'static [&'static str],
) -> Result<(), PathValidationError> {
    let matches = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.contains(&ext));

    if matches {
        Ok(())
    } else {
        Err(PathValidationError::InvalidExtension {
            path: path.to_path_buf(),
            allowed,
        })
    }
}
