use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::error::AppError;

const APP_DIR_NAME: &str = "lionchat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub data_dir: PathBuf,
    pub messages_dir: PathBuf,
    pub blobs_dir: PathBuf,
}

impl StorageLayout {
    /// Uses `override_dir` when given, else `$XDG_DATA_HOME/lionchat`, else
    /// `~/.local/share/lionchat`.
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self, AppError> {
        let data_dir = match override_dir {
            Some(dir) => dir.to_path_buf(),
            None => env::var_os("XDG_DATA_HOME")
                .map(PathBuf::from)
                .or_else(|| home_dir().map(|home| home.join(".local").join("share")))
                .ok_or_else(|| AppError::StoragePathResolution {
                    details: "unable to resolve data base directory (XDG_DATA_HOME/HOME)".into(),
                })?
                .join(APP_DIR_NAME),
        };

        Ok(Self::rooted_at(data_dir))
    }

    fn rooted_at(data_dir: PathBuf) -> Self {
        Self {
            messages_dir: data_dir.join("messages"),
            blobs_dir: data_dir.join("blobs"),
            data_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [&self.data_dir, &self.messages_dir, &self.blobs_dir] {
            fs::create_dir_all(dir).map_err(|source| AppError::StorageDirCreate {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(())
    }

    pub fn channels_file(&self) -> PathBuf {
        self.data_dir.join("channels.jsonl")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.data_dir.join("store.lock")
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}
