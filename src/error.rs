// Centralized error handling module
// Context-rich error types for every engine operation

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for the matching engine.
/// Failures scoped to one document, archive or file are caught and reported
/// by the layer that produced them; only root-level failures abort a run.
#[derive(Debug)]
pub enum RomCheckError {
    /// The scan or datasheet root itself does not exist
    RootNotFound { path: PathBuf },
    PermissionDenied { path: PathBuf, operation: String },
    Io { path: Option<PathBuf>, operation: String, source: io::Error },

    /// A datasheet's header or entry shape could not be parsed
    DatasheetStructure { path: PathBuf, reason: String },

    /// A file matched an archive signature but its index could not be read
    ArchiveFormat { path: PathBuf, reason: String },
}

impl fmt::Display for RomCheckError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RomCheckError::RootNotFound { path } => {
                write!(f, "Path not found: {}\n", path.display())?;
                write!(f, "Suggestion: Check that the path is correct and exists")
            }
            RomCheckError::PermissionDenied { path, operation } => {
                write!(f, "Permission denied while {} {}\n", operation, path.display())?;
                write!(f, "Suggestion: Check file permissions or run with appropriate privileges")
            }
            RomCheckError::Io { path, operation, source } => {
                if let Some(p) = path {
                    write!(f, "I/O error while {} {}: {}\n", operation, p.display(), source)?;
                } else {
                    write!(f, "I/O error while {}: {}\n", operation, source)?;
                }
                write!(f, "Suggestion: Check file permissions and disk space")
            }
            RomCheckError::DatasheetStructure { path, reason } => {
                write!(f, "Cannot parse datasheet {}: {}\n", path.display(), reason)?;
                write!(f, "Suggestion: Check that the file is a DAT or MAME listing in XML form")
            }
            RomCheckError::ArchiveFormat { path, reason } => {
                write!(f, "Cannot read archive {}: {}\n", path.display(), reason)?;
                write!(f, "Suggestion: The file may be truncated or corrupt; re-download it")
            }
        }
    }
}

impl std::error::Error for RomCheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RomCheckError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl RomCheckError {
    /// Create an error from an io::Error with context about the operation
    /// and the path it applied to
    pub fn from_io_error(err: io::Error, operation: &str, path: Option<PathBuf>) -> Self {
        match (err.kind(), path) {
            (io::ErrorKind::PermissionDenied, Some(p)) => RomCheckError::PermissionDenied {
                path: p,
                operation: operation.to_string(),
            },
            (_, path) => RomCheckError::Io {
                path,
                operation: operation.to_string(),
                source: err,
            },
        }
    }
}
