use crate::models::{ActionResponse, AccountStatus, LOG_CANCELLED, LOG_TRANSPORT, LOG_UNKNOWN};

/// What a single attempt did to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: AccountStatus,
    pub logs: Vec<String>,
    pub display_name: Option<String>,
    /// Replacement credential returned by the server (password change).
    pub new_token: Option<String>,
    /// Whether another attempt at the same item could succeed.
    pub retryable: bool,
}

impl Outcome {
    pub fn success(logs: Vec<String>) -> Self {
        Self {
            status: AccountStatus::Success,
            logs,
            display_name: None,
            new_token: None,
            retryable: false,
        }
    }

    pub fn failed(logs: Vec<String>, retryable: bool) -> Self {
        Self {
            status: AccountStatus::Failed,
            logs,
            display_name: None,
            new_token: None,
            retryable,
        }
    }

    pub fn error() -> Self {
        Self {
            status: AccountStatus::Error,
            logs: vec![LOG_TRANSPORT.to_string()],
            display_name: None,
            new_token: None,
            retryable: true,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: AccountStatus::Cancelled,
            logs: vec![LOG_CANCELLED.to_string()],
            display_name: None,
            new_token: None,
            retryable: false,
        }
    }
}

/// Maps an action server response onto an account outcome.
///
/// Success carries the resolved username and the server logs. Failure with a
/// known `error_type` leads with its fixed message; anything else falls back
/// to the server logs, or a generic message when there are none.
pub fn interpret_response(response: &ActionResponse) -> Outcome {
    if response.status {
        let mut outcome = Outcome::success(response.logs.clone().unwrap_or_default());
        outcome.display_name = response.username().map(str::to_string);
        return outcome;
    }

    let mut outcome = match response.error_kind() {
        Some(kind) => {
            let mut logs = vec![kind.message().to_string()];
            logs.extend(response.logs.iter().flatten().cloned());
            Outcome::failed(logs, !kind.is_permanent())
        }
        None => Outcome::failed(
            response
                .logs
                .clone()
                .unwrap_or_else(|| vec![LOG_UNKNOWN.to_string()]),
            true,
        ),
    };
    // The server reports the username even for failed actions once login worked.
    outcome.display_name = response.username().map(str::to_string);
    outcome
}
