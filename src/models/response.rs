use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const LOG_LOCKED: &str = "Account is locked";
pub const LOG_UNAUTHENTICATED: &str = "Authentication failed";
pub const LOG_SUSPENDED: &str = "Account is suspended";
pub const LOG_UNKNOWN: &str = "Unknown error occurred";
pub const LOG_CANCELLED: &str = "Request was cancelled";
pub const LOG_TRANSPORT: &str = "Error sending request";

/// Body returned by every action endpoint.
///
/// `data` is kept as raw JSON: the server fills it with whatever the action
/// produced, and only `username` / `auth_token` are read from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionResponse {
    pub status: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    #[serde(default)]
    pub error_type: Option<String>,
}

#[cfg(test)]
impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            status: true,
            ..Self::default()
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.data = Some(serde_json::json!({ "username": username }));
        self
    }

    pub fn with_logs(mut self, logs: &[&str]) -> Self {
        self.logs = Some(logs.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn with_error_type(mut self, error_type: &str) -> Self {
        self.error_type = Some(error_type.to_string());
        self
    }
}

impl ActionResponse {
    pub fn username(&self) -> Option<&str> {
        self.data_str("username")
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.data_str("auth_token")
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_type.as_deref().and_then(ErrorKind::parse)
    }

    fn data_str(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Failure kinds the action server reports in `error_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Locked,
    Unauthenticated,
    Suspended,
    Unknown,
}

impl ErrorKind {
    /// Case-insensitive: the server sends `Locked`, older clients sent `locked`.
    /// Empty or unrecognised values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "locked" => Some(ErrorKind::Locked),
            "unauthenticated" => Some(ErrorKind::Unauthenticated),
            "suspended" => Some(ErrorKind::Suspended),
            "unknown" => Some(ErrorKind::Unknown),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Locked => LOG_LOCKED,
            ErrorKind::Unauthenticated => LOG_UNAUTHENTICATED,
            ErrorKind::Suspended => LOG_SUSPENDED,
            ErrorKind::Unknown => LOG_UNKNOWN,
        }
    }

    /// Account-level conditions that another attempt cannot fix.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, ErrorKind::Unknown)
    }
}
