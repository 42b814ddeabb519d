use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variables that take precedence over file values, so secrets
/// can stay out of the config file.
const SERVICE_ACCOUNT_ENV: &str = "LIONCHAT_SERVICE_ACCOUNT_FILE";
const DEVICE_TOKEN_ENV: &str = "LIONCHAT_DEVICE_TOKEN";

pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let mut config = load_file(path)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

fn load_file(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if !config_path.exists() {
        return Ok(config);
    }

    let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
        path: config_path.clone(),
        source,
    })?;

    let file_config: FileConfig = toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
        path: config_path,
        source,
    })?;

    file_config.merge_into(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(path) = non_empty_env(SERVICE_ACCOUNT_ENV) {
        config.credentials.service_account_file = Some(PathBuf::from(path));
    }

    if let Some(token) = non_empty_env(DEVICE_TOKEN_ENV) {
        config.session.device_token = Some(token);
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
