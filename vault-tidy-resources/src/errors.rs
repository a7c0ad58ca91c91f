use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TidyError {
    #[error("path does not exist: {0}")]
    RootNotFound(PathBuf),
    #[error("path is not a directory: {0}")]
    RootNotDirectory(PathBuf),
    #[error("failed to read note {path}: {source}")]
    NoteRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write note {path}: {source}")]
    NoteWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read resource {path}: {source}")]
    ResourceRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to move {from} -> {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid link pattern: {0}")]
    Regex(#[from] regex::Error),
}

pub type TidyResult<T> = Result<T, TidyError>;
