//! Backend layer: concrete stores, clock, and the push notification stack.

pub mod blob_store;
pub mod channel_registry;
pub mod clock;
pub mod local_store;
pub mod push;

use std::{fs, path::Path, path::PathBuf};

use serde::de::DeserializeOwned;

use crate::domain::channel::ChannelId;

pub(crate) const LOG_FILE_EXTENSION: &str = "jsonl";

#[derive(Debug, thiserror::Error)]
pub enum StoreLoadError {
    #[error("failed to read store data at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record at {path}:{line}: {details}")]
    Malformed {
        path: PathBuf,
        line: usize,
        details: String,
    },
}

pub(crate) fn channel_file_name(channel_id: &ChannelId) -> String {
    format!("{}.{LOG_FILE_EXTENSION}", channel_id.as_str())
}

/// Reads one JSON record per non-empty line. A missing file reads as empty.
pub(crate) fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreLoadError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreLoadError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|error| StoreLoadError::Malformed {
                path: path.to_path_buf(),
                line: index + 1,
                details: error.to_string(),
            })
        })
        .collect()
}

/// Returns the backend module name for smoke checks.
pub fn module_name() -> &'static str {
    "backend"
}
