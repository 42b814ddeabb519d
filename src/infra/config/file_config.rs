use std::path::PathBuf;

use serde::Deserialize;

use crate::infra::config::{
    AppConfig, CredentialsConfig, LogConfig, PushConfig, SessionConfig, StorageConfig,
};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub session: Option<FileSessionConfig>,
    pub storage: Option<FileStorageConfig>,
    pub push: Option<FilePushConfig>,
    pub credentials: Option<FileCredentialsConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(session) = self.session {
            session.merge_into(&mut config.session);
        }

        if let Some(storage) = self.storage {
            storage.merge_into(&mut config.storage);
        }

        if let Some(push) = self.push {
            push.merge_into(&mut config.push);
        }

        if let Some(credentials) = self.credentials {
            credentials.merge_into(&mut config.credentials);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSessionConfig {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub device_token: Option<String>,
}

impl FileSessionConfig {
    fn merge_into(self, config: &mut SessionConfig) {
        if let Some(user_id) = self.user_id {
            config.user_id = user_id;
        }

        if let Some(display_name) = self.display_name {
            config.display_name = display_name;
        }

        if let Some(device_token) = self.device_token {
            config.device_token = Some(device_token);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileStorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl FileStorageConfig {
    fn merge_into(self, config: &mut StorageConfig) {
        if let Some(data_dir) = self.data_dir {
            config.data_dir = Some(data_dir);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FilePushConfig {
    pub enabled: Option<bool>,
    pub send_endpoint: Option<String>,
    pub subscribe_endpoint: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub notify_timeout_ms: Option<u64>,
}

impl FilePushConfig {
    fn merge_into(self, config: &mut PushConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }

        if let Some(send_endpoint) = self.send_endpoint {
            config.send_endpoint = send_endpoint;
        }

        if let Some(subscribe_endpoint) = self.subscribe_endpoint {
            config.subscribe_endpoint = subscribe_endpoint;
        }

        if let Some(timeout_ms) = self.request_timeout_ms {
            config.request_timeout_ms = timeout_ms;
        }

        if let Some(timeout_ms) = self.notify_timeout_ms {
            config.notify_timeout_ms = timeout_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileCredentialsConfig {
    pub service_account_file: Option<PathBuf>,
    pub scope: Option<String>,
    pub exchange_timeout_ms: Option<u64>,
}

impl FileCredentialsConfig {
    fn merge_into(self, config: &mut CredentialsConfig) {
        if let Some(path) = self.service_account_file {
            config.service_account_file = Some(path);
        }

        if let Some(scope) = self.scope {
            config.scope = scope;
        }

        if let Some(timeout_ms) = self.exchange_timeout_ms {
            config.exchange_timeout_ms = timeout_ms;
        }
    }
}
