use std::{
    fs::{self, OpenOptions},
    io::ErrorKind,
    path::PathBuf,
};

use crate::infra::{config::StorageConfig, error::AppError, storage_layout::StorageLayout};

/// Exclusive claim on the local store. Removes the lock file on drop.
#[derive(Debug)]
pub struct StoreLockGuard {
    path: PathBuf,
}

impl Drop for StoreLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[derive(Debug)]
pub struct StoragePlan {
    pub layout: StorageLayout,
    pub lock_guard: StoreLockGuard,
}

pub fn prepare_storage(config: &StorageConfig) -> Result<StoragePlan, AppError> {
    let layout = StorageLayout::resolve(config.data_dir.as_deref())?;
    layout.ensure_dirs()?;

    let lock_guard = acquire_store_lock(layout.lock_file())?;

    Ok(StoragePlan { layout, lock_guard })
}

fn acquire_store_lock(path: PathBuf) -> Result<StoreLockGuard, AppError> {
    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(_) => Ok(StoreLockGuard { path }),
        Err(source) if source.kind() == ErrorKind::AlreadyExists => {
            Err(AppError::StoreBusy { path })
        }
        Err(source) => Err(AppError::StoreLockCreate { path, source }),
    }
}
