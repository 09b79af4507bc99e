//! Domain-specific errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown text encoding '{0}'")]
    UnknownEncoding(String),
    #[error("invalid file pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("link target does not exist: {}", .0.display())]
    LinkTargetMissing(PathBuf),
    #[error("refusing to replace existing path {} (use --force)", .0.display())]
    LinkConflict(PathBuf),
    #[error("no link target given and no link.storage_root configured")]
    MissingStorageRoot,
    #[error("invalid project name '{0}'")]
    InvalidProjectName(String),
}
