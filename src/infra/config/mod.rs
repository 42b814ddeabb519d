mod app_config;
mod file_config;
mod loader;

pub use app_config::{
    AppConfig, CredentialsConfig, LogConfig, PushConfig, SessionConfig, StorageConfig,
};
pub use loader::load;
