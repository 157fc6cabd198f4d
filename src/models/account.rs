use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credential and proxy pair as stored in an account group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCredentials {
    pub token: String,
    #[serde(default)]
    pub proxy: String,
}

impl AccountCredentials {
    pub fn new(token: impl Into<String>, proxy: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            proxy: proxy.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountGroup {
    pub accounts_name: String,
    #[serde(default)]
    pub accounts: Vec<AccountCredentials>,
}

impl AccountGroup {
    pub fn new(accounts_name: impl Into<String>, accounts: Vec<AccountCredentials>) -> Self {
        Self {
            accounts_name: accounts_name.into(),
            accounts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    #[default]
    Idle,
    Processing,
    /// Engaged in a non-interruptible external action. Shown in tables, never
    /// entered by the runner itself.
    Active,
    Success,
    Failed,
    Error,
    Cancelled,
}

impl AccountStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AccountStatus::Success
                | AccountStatus::Failed
                | AccountStatus::Error
                | AccountStatus::Cancelled
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AccountStatus::Success)
    }

    /// `FAILED` and `ERROR` both count against the run.
    pub fn is_failure(&self) -> bool {
        matches!(self, AccountStatus::Failed | AccountStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Idle => "IDLE",
            AccountStatus::Processing => "PROCESSING",
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Success => "SUCCESS",
            AccountStatus::Failed => "FAILED",
            AccountStatus::Error => "ERROR",
            AccountStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AccountStatus::Idle => "·",
            AccountStatus::Processing => "…",
            AccountStatus::Active => "*",
            AccountStatus::Success => "✓",
            AccountStatus::Failed => "✗",
            AccountStatus::Error => "!",
            AccountStatus::Cancelled => "-",
        }
    }

    /// Whether the runner may move an account from `self` to `next`.
    ///
    /// `IDLE -> PROCESSING -> {SUCCESS, FAILED, ERROR, CANCELLED}`. An account
    /// working through several items may move between outcome states, but
    /// `CANCELLED` is final and nothing returns to `IDLE`.
    pub fn can_transition_to(&self, next: AccountStatus) -> bool {
        match (*self, next) {
            (AccountStatus::Cancelled, _) => false,
            (_, AccountStatus::Idle) | (_, AccountStatus::Active) => false,
            (AccountStatus::Idle, AccountStatus::Processing) => true,
            (AccountStatus::Idle, _) => false,
            (_, AccountStatus::Processing) => false,
            (AccountStatus::Processing, _) => true,
            (current, _) => current.is_terminal(),
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live per-account record owned by a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub index: usize,
    pub credentials: AccountCredentials,
    pub display_name: Option<String>,
    pub status: AccountStatus,
    #[serde(default)]
    pub logs: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Counted as processed in the run's progress.
    #[serde(default)]
    pub settled: bool,
}

impl Account {
    pub fn new(index: usize, credentials: AccountCredentials) -> Self {
        Self {
            index,
            credentials,
            display_name: None,
            status: AccountStatus::Idle,
            logs: Vec::new(),
            updated_at: None,
            settled: false,
        }
    }

    /// Moves the account to `status`, replacing its logs. Returns `false` and
    /// leaves the record untouched when the transition is not allowed.
    pub fn transition(&mut self, status: AccountStatus, logs: Vec<String>) -> bool {
        if !self.status.can_transition_to(status) {
            return false;
        }
        self.status = status;
        self.logs = logs;
        self.updated_at = Some(Utc::now());
        true
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("")
    }
}
