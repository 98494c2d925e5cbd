use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("profile not found: {}", .0.display())]
    ProfileNotFound(PathBuf),
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    #[error("gesture {0} has no segments")]
    EmptyGesture(String),
    #[error("cannot locate a home directory")]
    NoHome,
}

pub type Result<T> = std::result::Result<T, Error>;
