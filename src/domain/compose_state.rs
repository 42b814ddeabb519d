/// Lifecycle of one compose action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeState {
    Idle,
    Validating,
    Uploading,
    Persisting,
    NotifyDispatch,
    PersistFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeEvent {
    Started,
    NothingToSend,
    ImageAttached,
    TextOnly,
    Uploaded,
    UploadFailed,
    Persisted,
    PersistRejected,
    Finished,
}

impl ComposeState {
    /// Returns the next state, or `None` when `event` is not valid here.
    pub fn transition(self, event: ComposeEvent) -> Option<Self> {
        use ComposeEvent as E;
        use ComposeState as S;

        let next = match (self, event) {
            (S::Idle, E::Started) => S::Validating,
            (S::Validating, E::NothingToSend) => S::Idle,
            (S::Validating, E::ImageAttached) => S::Uploading,
            (S::Validating, E::TextOnly) => S::Persisting,
            (S::Uploading, E::Uploaded) => S::Persisting,
            (S::Uploading, E::UploadFailed) => S::Idle,
            (S::Persisting, E::Persisted) => S::NotifyDispatch,
            (S::Persisting, E::PersistRejected) => S::PersistFailed,
            (S::NotifyDispatch | S::PersistFailed, E::Finished) => S::Idle,
            _ => return None,
        };

        Some(next)
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::Idle => "COMPOSE_IDLE",
            Self::Validating => "COMPOSE_VALIDATING",
            Self::Uploading => "COMPOSE_UPLOADING",
            Self::Persisting => "COMPOSE_PERSISTING",
            Self::NotifyDispatch => "COMPOSE_NOTIFY_DISPATCH",
            Self::PersistFailed => "COMPOSE_PERSIST_FAILED",
        }
    }
}
