/// Identity of the signed-in user, passed explicitly to every send and open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user_id: String,
    display_name: String,
    device_token: Option<DeviceToken>,
}

/// Push registration token of this device.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceToken(String);

impl DeviceToken {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DeviceToken([REDACTED])")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session user id is empty")]
    MissingUserId,
    #[error("session display name is empty")]
    MissingDisplayName,
}

impl SessionContext {
    pub fn new(
        user_id: &str,
        display_name: &str,
        device_token: Option<DeviceToken>,
    ) -> Result<Self, SessionError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(SessionError::MissingUserId);
        }

        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(SessionError::MissingDisplayName);
        }

        Ok(Self {
            user_id: user_id.to_owned(),
            display_name: display_name.to_owned(),
            device_token,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn device_token(&self) -> Option<&DeviceToken> {
        self.device_token.as_ref()
    }
}
