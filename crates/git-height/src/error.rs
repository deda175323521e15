use std::path::PathBuf;

/// Errors from height resolution.
#[derive(Debug, thiserror::Error)]
pub enum HeightError {
    #[error("version file not found: {0}")]
    MissingVersionFile(PathBuf),

    #[error("no \"version\" string in {0}")]
    MissingVersion(PathBuf),

    #[error("invalid version file path: {0}")]
    InvalidVersionPath(PathBuf),

    #[error("height resolution cancelled")]
    Cancelled,

    #[error("invalid version file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Repo(#[from] git_repository::RepoError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
