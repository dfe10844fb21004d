// Member & Log Domain Models

use serde::{Deserialize, Serialize};

/// Log messages containing this marker are refused by the log repository.
/// Scenarios use it to make the optional logging step fail.
pub const LOG_FAILURE_MARKER: &str = "로그예외";

/// Row ID assigned by the store
pub type RecordId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Option<RecordId>,
    pub username: String,
}

impl Member {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub id: Option<RecordId>,
    pub message: String,
}

impl Log {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: None,
            message: message.into(),
        }
    }

    pub fn is_failure_trigger(&self) -> bool {
        self.message.contains(LOG_FAILURE_MARKER)
    }
}
