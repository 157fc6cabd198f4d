use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::config::RunSettings;
use crate::models::{Account, AccountCredentials, AccountGroup, AccountStatus};

use super::pause::PauseRange;
use super::progress::ProgressAggregator;

/// Inclusive account index bounds. `end == 0` means "through the last account".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRange {
    pub start: usize,
    pub end: usize,
}

impl AccountRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Effective index range over `len` accounts, or `None` when it is empty.
    ///
    /// `end` is clamped to the last index. `start` is not: a start past the
    /// end leaves nothing to run.
    pub fn resolve(&self, len: usize) -> Option<RangeInclusive<usize>> {
        if len == 0 {
            return None;
        }
        let last = len - 1;
        let end = if self.end == 0 || self.end > last {
            last
        } else {
            self.end
        };
        if self.start > end {
            return None;
        }
        Some(self.start..=end)
    }
}

impl std::str::FromStr for AccountRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("expected 'START-END', got '{}'", s))?;
        let start = start
            .trim()
            .parse()
            .map_err(|_| format!("invalid range start in '{}'", s))?;
        let end = end
            .trim()
            .parse()
            .map_err(|_| format!("invalid range end in '{}'", s))?;
        Ok(AccountRange { start, end })
    }
}

/// Settings frozen at run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub range: AccountRange,
    pub concurrency: usize,
    pub take_data_random: bool,
    pub pause_between_tasks: PauseRange,
    pub pause_between_accounts: PauseRange,
    pub max_retries: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            range: AccountRange::default(),
            concurrency: 1,
            take_data_random: false,
            pause_between_tasks: PauseRange::default(),
            pause_between_accounts: PauseRange::default(),
            max_retries: 0,
        }
    }
}

impl RunConfig {
    pub fn from_settings(settings: &RunSettings) -> Self {
        Self {
            range: AccountRange::default(),
            concurrency: settings.threads,
            take_data_random: settings.take_data_random,
            pause_between_tasks: settings.pause_between_tasks,
            pause_between_accounts: settings.pause_between_accounts,
            max_retries: settings.max_tasks_retries,
        }
    }

    pub fn with_range(mut self, range: AccountRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_pauses(mut self, between_tasks: PauseRange, between_accounts: PauseRange) -> Self {
        self.pause_between_tasks = between_tasks;
        self.pause_between_accounts = between_accounts;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_take_data_random(mut self, take_data_random: bool) -> Self {
        self.take_data_random = take_data_random;
        self
    }

    /// Batch size, never below 1.
    pub fn batch_size(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Live state shared by every task of the current run.
///
/// Each sequencer only writes its own account entry; the lock is held for
/// the duration of a single field update.
pub struct RunState {
    accounts: RwLock<Vec<Account>>,
    pub progress: ProgressAggregator,
    running: AtomicBool,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
            progress: ProgressAggregator::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Replaces all accounts with fresh `IDLE` records for `group`.
    pub fn load_group(&self, group: &AccountGroup) {
        let accounts = group
            .accounts
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, credentials)| Account::new(index, credentials))
            .collect();
        self.replace_accounts(accounts);
    }

    pub fn replace_accounts(&self, accounts: Vec<Account>) {
        let mut guard = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        *guard = accounts;
    }

    /// Applies `f` to the account at `index`. Returns `None` if there is no
    /// such account.
    pub fn update<T>(&self, index: usize, f: impl FnOnce(&mut Account) -> T) -> Option<T> {
        let mut guard = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        guard.get_mut(index).map(f)
    }

    /// Moves the account at `index` to `status` and republishes the counts.
    pub fn transition(&self, index: usize, status: AccountStatus, logs: Vec<String>) -> bool {
        let applied = self
            .update(index, |account| account.transition(status, logs))
            .unwrap_or(false);
        if applied {
            self.publish_stats();
        }
        applied
    }

    pub fn credentials(&self, index: usize) -> Option<AccountCredentials> {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .map(|account| account.credentials.clone())
    }

    pub fn status(&self, index: usize) -> Option<AccountStatus> {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .map(|account| account.status)
    }

    pub fn snapshot(&self) -> Vec<Account> {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Counts the account at `index` as processed and republishes the stats
    /// with it included. Returns `false` when it was already settled or does
    /// not exist, so an account is never counted twice.
    pub fn settle(&self, index: usize) -> bool {
        let mut guard = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        let Some(account) = guard.get_mut(index) else {
            return false;
        };
        if account.settled {
            return false;
        }
        account.settled = true;
        self.progress.increment();
        let (success, failed) = count_settled(&guard);
        self.progress.update_stats(success, failed);
        true
    }

    /// Recounts success and failure over settled accounts and overwrites the
    /// progress stats. Accounts still working are left out, so
    /// `success + failed` never runs ahead of `current`.
    ///
    /// Holds the write lock while publishing so the last publish always
    /// reflects the latest transition.
    pub fn publish_stats(&self) {
        let guard = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        let (success, failed) = count_settled(&guard);
        self.progress.update_stats(success, failed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Claims the running flag. Returns `false` if a run already holds it.
    pub fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn count_settled(accounts: &[Account]) -> (usize, usize) {
    accounts
        .iter()
        .filter(|account| account.settled)
        .fold((0, 0), |(s, f), account| {
            if account.status.is_success() {
                (s + 1, f)
            } else if account.status.is_failure() {
                (s, f + 1)
            } else {
                (s, f)
            }
        })
}
