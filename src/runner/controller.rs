use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::actions::{Action, ActionClient};
use crate::models::{Account, AccountGroup, ItemShape, WorkItem};

use super::executor::BatchExecutor;
use super::progress::Progress;
use super::sequencer::TaskSequencer;
use super::state::{RunConfig, RunState};

/// A precondition that stops a run before any request is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no account group selected")]
    NoGroupSelected,

    #[error("selected account group has no accounts")]
    NoAccounts,

    #[error("no work items provided")]
    NoWorkItems,

    #[error("account range {start}-{end} selects nothing out of {len} accounts")]
    EmptyRange { start: usize, end: usize, len: usize },

    #[error("{action} expects {expected} items, item {index} is not one")]
    ItemMismatch {
        action: String,
        expected: ItemShape,
        index: usize,
    },

    #[error("item {index} has no texts to choose from")]
    EmptyTextPool { index: usize },

    #[error("invalid {which} pause: {min} is greater than {max}")]
    InvalidPause {
        which: &'static str,
        min: u64,
        max: u64,
    },

    #[error("a run is already in progress")]
    AlreadyRunning,
}

/// Final counts of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

pub struct RunHandle {
    join: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// Resolves once every batch has settled.
    pub async fn wait(self) -> Result<RunSummary> {
        self.join.await.context("Run task failed")
    }
}

/// Clears the running flag when the run task ends, even by panic.
struct RunningGuard(Arc<RunState>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Owns the run lifecycle for one action module: group selection,
/// validation, start, and cancellation.
pub struct Runner {
    client: Arc<dyn ActionClient>,
    state: Arc<RunState>,
    group: Mutex<Option<AccountGroup>>,
    cancel: Mutex<CancellationToken>,
}

impl Runner {
    pub fn new(client: Arc<dyn ActionClient>) -> Self {
        Self {
            client,
            state: Arc::new(RunState::new()),
            group: Mutex::new(None),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Replaces the account collection with fresh `IDLE` accounts for `group`.
    pub fn select_group(&self, group: AccountGroup) -> Result<(), ValidationError> {
        if self.state.is_running() {
            return Err(ValidationError::AlreadyRunning);
        }
        self.state.load_group(&group);
        self.state.progress.set_total(group.accounts.len());
        self.state.progress.reset();
        info!(
            "Selected group '{}' ({} accounts)",
            group.accounts_name,
            group.accounts.len()
        );
        *self.group.lock().unwrap_or_else(PoisonError::into_inner) = Some(group);
        Ok(())
    }

    /// Validates the inputs and starts the run in the background.
    pub fn start(
        &self,
        action: Arc<dyn Action>,
        items: Vec<WorkItem>,
        config: RunConfig,
    ) -> Result<RunHandle, ValidationError> {
        let group = self
            .group
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ValidationError::NoGroupSelected)?;
        if group.accounts.is_empty() {
            return Err(ValidationError::NoAccounts);
        }
        if items.is_empty() {
            return Err(ValidationError::NoWorkItems);
        }
        let expected = action.item_shape();
        if let Some(index) = items.iter().position(|item| item.shape() != expected) {
            return Err(ValidationError::ItemMismatch {
                action: action.name().to_string(),
                expected,
                index,
            });
        }
        if let Some(index) = items
            .iter()
            .position(|item| matches!(item, WorkItem::Pool { texts, .. } if texts.is_empty()))
        {
            return Err(ValidationError::EmptyTextPool { index });
        }
        for (which, range) in [
            ("between-tasks", config.pause_between_tasks),
            ("between-accounts", config.pause_between_accounts),
        ] {
            if !range.is_valid() {
                return Err(ValidationError::InvalidPause {
                    which,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        let range = config
            .range
            .resolve(group.accounts.len())
            .ok_or(ValidationError::EmptyRange {
                start: config.range.start,
                end: config.range.end,
                len: group.accounts.len(),
            })?;

        if !self.state.try_begin() {
            return Err(ValidationError::AlreadyRunning);
        }

        let total = range.end() - range.start() + 1;
        self.state.load_group(&group);
        self.state.progress.set_total(total);
        self.state.progress.reset();

        let cancel = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = cancel.clone();

        info!(
            "Starting {} for accounts {}-{} of '{}' ({} items, {} at a time)",
            action.name(),
            range.start(),
            range.end(),
            group.accounts_name,
            items.len(),
            config.batch_size()
        );

        let state = self.state.clone();
        let sequencer = TaskSequencer::new(
            state.clone(),
            self.client.clone(),
            action,
            Arc::new(items),
            config,
            cancel.clone(),
        );
        let executor = BatchExecutor::new(sequencer, config.batch_size());

        let join = tokio::spawn(async move {
            let _guard = RunningGuard(state.clone());
            let started_at = Utc::now();
            executor.run(range).await;

            let progress = state.progress.snapshot();
            let summary = RunSummary {
                total: progress.total,
                processed: progress.current,
                success: progress.success,
                failed: progress.failed,
                cancelled: cancel.is_cancelled(),
                started_at,
                finished_at: Utc::now(),
            };
            info!(
                "Run finished: {}/{} processed, {} succeeded, {} failed{}",
                summary.processed,
                summary.total,
                summary.success,
                summary.failed,
                if summary.cancelled { " (cancelled)" } else { "" }
            );
            summary
        });

        Ok(RunHandle { join })
    }

    /// Signals cancellation to the active run. Returns `false` when there is
    /// no run to stop or it was already stopped.
    pub fn stop(&self) -> bool {
        let cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if cancel.is_cancelled() || !self.state.is_running() {
            return false;
        }
        info!("Stopping run");
        cancel.cancel();
        true
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn snapshot(&self) -> Vec<Account> {
        self.state.snapshot()
    }

    pub fn progress(&self) -> Progress {
        self.state.progress.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.state.progress.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::models::{AccountStatus, ActionResponse, LOG_CANCELLED, LOG_LOCKED};
    use crate::runner::mock::{group, shared, MockClient};
    use crate::runner::pause::PauseRange;
    use crate::runner::state::AccountRange;
    use proptest::prelude::*;
    use std::time::{Duration, Instant};

    fn quick() -> RunConfig {
        RunConfig::default().with_pauses(PauseRange::NONE, PauseRange::NONE)
    }

    fn like_items() -> Vec<WorkItem> {
        vec![WorkItem::target("https://x.com/a/status/1")]
    }

    fn runner(client: MockClient, accounts: usize) -> (Runner, Arc<MockClient>) {
        let (mock, client) = shared(client);
        let runner = Runner::new(client);
        runner.select_group(group(accounts)).unwrap();
        (runner, mock)
    }

    #[tokio::test]
    async fn four_accounts_in_two_batches_all_succeed() {
        let (runner, mock) = runner(MockClient::always(ActionResponse::ok().with_username("u")), 4);

        let handle = runner
            .start(
                Arc::new(ActionKind::Like),
                like_items(),
                quick().with_range(AccountRange::new(0, 3)).with_concurrency(2),
            )
            .unwrap();
        let summary = handle.wait().await.unwrap();

        assert_eq!(
            (summary.total, summary.processed, summary.success, summary.failed),
            (4, 4, 4, 0)
        );
        assert!(!summary.cancelled);
        assert!(runner
            .snapshot()
            .iter()
            .all(|a| a.status == AccountStatus::Success && a.label() == "u"));
        assert!(mock.max_in_flight() <= 2);
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn published_progress_never_counts_unsettled_accounts() {
        let client = MockClient::always(ActionResponse::ok()).with_latency(Duration::from_millis(20));
        let (runner, _mock) = runner(client, 2);
        let mut progress = runner.subscribe();

        let handle = runner
            .start(
                Arc::new(ActionKind::Like),
                vec![WorkItem::target("l1"), WorkItem::target("l2")],
                quick().with_concurrency(2),
            )
            .unwrap();
        let wait = handle.wait();
        tokio::pin!(wait);

        let mut seen = Vec::new();
        let summary = loop {
            tokio::select! {
                summary = &mut wait => break summary.unwrap(),
                changed = progress.changed() => {
                    if changed.is_ok() {
                        seen.push(*progress.borrow_and_update());
                    }
                }
            }
        };
        seen.push(*progress.borrow());

        assert!(seen.len() > 1);
        for snapshot in &seen {
            assert!(
                snapshot.success + snapshot.failed <= snapshot.current,
                "{:?}",
                snapshot
            );
        }
        assert_eq!((summary.processed, summary.success), (2, 2));
    }

    #[tokio::test]
    async fn locked_account_fails_with_fixed_log() {
        let (runner, _mock) = runner(
            MockClient::always(ActionResponse::failed().with_error_type("locked")),
            1,
        );

        let handle = runner
            .start(Arc::new(ActionKind::Like), like_items(), quick())
            .unwrap();
        let summary = handle.wait().await.unwrap();

        let account = &runner.snapshot()[0];
        assert_eq!(account.status, AccountStatus::Failed);
        assert!(account.logs.iter().any(|l| l == LOG_LOCKED));
        assert_eq!((summary.success, summary.failed), (0, 1));
    }

    #[tokio::test]
    async fn collaborator_cancelling_mid_run_leaves_later_accounts_cancelled() {
        let runner_slot: Arc<Mutex<Option<Arc<Runner>>>> = Arc::new(Mutex::new(None));
        let slot = runner_slot.clone();
        let client = MockClient::new(move |_, _| {
            if let Some(runner) = slot.lock().unwrap().as_ref() {
                runner.stop();
            }
            Ok(ActionResponse::ok().with_username("first"))
        });
        let (mock, client) = shared(client);
        let runner = Arc::new(Runner::new(client));
        runner.select_group(group(4)).unwrap();
        *runner_slot.lock().unwrap() = Some(runner.clone());

        let handle = runner
            .start(Arc::new(ActionKind::Like), like_items(), quick())
            .unwrap();
        handle.wait().await.unwrap();
        runner_slot.lock().unwrap().take();

        let accounts = runner.snapshot();
        assert_eq!(accounts[0].status, AccountStatus::Success);
        for account in &accounts[1..] {
            assert_eq!(account.status, AccountStatus::Cancelled);
            assert_eq!(account.logs, vec![LOG_CANCELLED]);
        }
        assert_eq!(mock.call_count(), 1);
        assert_eq!(runner.progress().current, 4);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (runner, _mock) = runner(
            MockClient::always(ActionResponse::ok()).with_latency(Duration::from_secs(30)),
            2,
        );
        assert!(!runner.stop(), "nothing to stop before a run");

        let handle = runner
            .start(Arc::new(ActionKind::Like), like_items(), quick())
            .unwrap();
        assert!(runner.stop());
        assert!(!runner.stop());

        let summary = handle.wait().await.unwrap();
        assert!(summary.cancelled);
        assert!(runner
            .snapshot()
            .iter()
            .all(|a| a.status == AccountStatus::Cancelled));
    }

    #[tokio::test]
    async fn stop_abandons_long_pause() {
        let (runner, _mock) = runner(MockClient::always(ActionResponse::ok()), 2);
        let config = quick().with_pauses(PauseRange::NONE, PauseRange::new(30, 30));

        let handle = runner
            .start(Arc::new(ActionKind::Like), like_items(), config)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let started = Instant::now();
        assert!(runner.stop());

        let summary = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("run did not settle after stop")
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(summary.cancelled);

        let accounts = runner.snapshot();
        assert_eq!(accounts[0].status, AccountStatus::Success);
        assert_eq!(accounts[1].status, AccountStatus::Cancelled);
    }

    #[tokio::test]
    async fn range_past_the_end_is_rejected() {
        let (runner, mock) = runner(MockClient::always(ActionResponse::ok()), 3);
        let err = runner
            .start(
                Arc::new(ActionKind::Like),
                like_items(),
                quick().with_range(AccountRange::new(5, 0)),
            )
            .err();
        assert_eq!(
            err,
            Some(ValidationError::EmptyRange {
                start: 5,
                end: 0,
                len: 3
            })
        );
        assert!(!runner.is_running());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn sub_range_sets_total_to_slice_length() {
        let (runner, mock) = runner(MockClient::always(ActionResponse::ok()), 5);
        let handle = runner
            .start(
                Arc::new(ActionKind::Like),
                like_items(),
                quick().with_range(AccountRange::new(1, 2)),
            )
            .unwrap();
        let summary = handle.wait().await.unwrap();

        assert_eq!((summary.total, summary.processed), (2, 2));
        assert_eq!(mock.call_count(), 2);
        let accounts = runner.snapshot();
        assert_eq!(accounts[0].status, AccountStatus::Idle);
        assert_eq!(accounts[4].status, AccountStatus::Idle);
    }

    #[tokio::test]
    async fn start_validates_inputs_before_sending() {
        let (mock, client) = shared(MockClient::always(ActionResponse::ok()));
        let runner = Runner::new(client);

        assert_eq!(
            runner
                .start(Arc::new(ActionKind::Like), like_items(), quick())
                .err(),
            Some(ValidationError::NoGroupSelected)
        );

        runner
            .select_group(AccountGroup::new("empty", Vec::new()))
            .unwrap();
        assert_eq!(
            runner
                .start(Arc::new(ActionKind::Like), like_items(), quick())
                .err(),
            Some(ValidationError::NoAccounts)
        );

        runner.select_group(group(2)).unwrap();
        assert_eq!(
            runner
                .start(Arc::new(ActionKind::Like), Vec::new(), quick())
                .err(),
            Some(ValidationError::NoWorkItems)
        );
        assert!(matches!(
            runner
                .start(Arc::new(ActionKind::Tweet), like_items(), quick())
                .err(),
            Some(ValidationError::ItemMismatch { index: 0, .. })
        ));
        assert_eq!(
            runner
                .start(
                    Arc::new(ActionKind::Comment),
                    vec![
                        WorkItem::pool("l1", ["nice"]),
                        WorkItem::pool("l2", Vec::<String>::new()),
                    ],
                    quick()
                )
                .err(),
            Some(ValidationError::EmptyTextPool { index: 1 })
        );
        assert!(matches!(
            runner
                .start(
                    Arc::new(ActionKind::Like),
                    like_items(),
                    quick().with_pauses(PauseRange::new(5, 1), PauseRange::NONE)
                )
                .err(),
            Some(ValidationError::InvalidPause { min: 5, max: 1, .. })
        ));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn second_start_while_running_is_rejected() {
        let (runner, _mock) = runner(
            MockClient::always(ActionResponse::ok()).with_latency(Duration::from_secs(30)),
            1,
        );
        let handle = runner
            .start(Arc::new(ActionKind::Like), like_items(), quick())
            .unwrap();

        assert_eq!(
            runner
                .start(Arc::new(ActionKind::Like), like_items(), quick())
                .err(),
            Some(ValidationError::AlreadyRunning)
        );
        assert_eq!(
            runner.select_group(group(2)),
            Err(ValidationError::AlreadyRunning)
        );

        runner.stop();
        handle.wait().await.unwrap();
        assert!(runner
            .start(Arc::new(ActionKind::Like), like_items(), quick())
            .is_ok());
    }

    #[tokio::test]
    async fn select_group_resets_accounts_and_progress() {
        let (runner, _mock) = runner(MockClient::always(ActionResponse::ok()), 2);
        let handle = runner
            .start(Arc::new(ActionKind::Like), like_items(), quick())
            .unwrap();
        handle.wait().await.unwrap();
        assert_eq!(runner.progress().success, 2);

        runner.select_group(group(3)).unwrap();
        let progress = runner.progress();
        assert_eq!((progress.total, progress.current, progress.success), (3, 0, 0));
        assert!(runner
            .snapshot()
            .iter()
            .all(|a| a.status == AccountStatus::Idle));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn completed_run_settles_every_account_in_range(
            accounts in 1usize..9,
            concurrency in 0usize..5,
            start in 0usize..4,
            fail_every in 1usize..4,
        ) {
            prop_assume!(start < accounts);
            tokio_test::block_on(async {
                let client = MockClient::new(move |call, _| {
                    if call % fail_every == 0 {
                        Ok(ActionResponse::failed().with_error_type("suspended"))
                    } else {
                        Ok(ActionResponse::ok())
                    }
                })
                .with_latency(Duration::from_millis(2));
                let (runner, mock) = runner(client, accounts);

                let handle = runner
                    .start(
                        Arc::new(ActionKind::Like),
                        like_items(),
                        quick()
                            .with_range(AccountRange::new(start, 0))
                            .with_concurrency(concurrency),
                    )
                    .unwrap();
                let summary = handle.wait().await.unwrap();

                assert_eq!(summary.total, accounts - start);
                assert_eq!(summary.processed, summary.total);
                assert_eq!(summary.success + summary.failed, summary.total);
                assert!(mock.max_in_flight() <= concurrency.max(1));
                for account in runner.snapshot() {
                    if account.index < start {
                        assert_eq!(account.status, AccountStatus::Idle);
                    } else {
                        assert!(matches!(
                            account.status,
                            AccountStatus::Success | AccountStatus::Failed | AccountStatus::Error
                        ));
                    }
                }
            });
        }
    }
}
