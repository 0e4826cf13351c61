use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize config for {path}")]
    ConfigSerialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write config to {path}")]
    ConfigWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove config at {path}")]
    ConfigRemove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not determine the home directory; set $HOME")]
    NoHomeDir,

    #[error("unknown deploy method '{0}', expected 'git' or 'docker'")]
    UnknownDeployMethod(String),
}
