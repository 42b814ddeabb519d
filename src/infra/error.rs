use std::path::PathBuf;

use thiserror::Error;

use crate::{backend::StoreLoadError, domain::session::SessionError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("storage path resolution failed: {details}")]
    StoragePathResolution { details: String },
    #[error("failed to create storage directory at {path}: {source}")]
    StorageDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store at {path} is in use by another lionchat process")]
    StoreBusy { path: PathBuf },
    #[error("failed to create store lock at {path}: {source}")]
    StoreLockCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load local store: {0}")]
    StoreLoad(#[from] StoreLoadError),
    #[error("invalid [session] config: {0}; set user_id and display_name")]
    SessionInvalid(#[source] SessionError),
    #[error("invalid [push] config: {details}")]
    PushConfig { details: String },
}
