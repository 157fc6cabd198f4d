use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::actions::{Action, ActionClient, Outcome, TransportError};
use crate::models::{select_index, AccountStatus, Selection, WorkItem, LOG_CANCELLED, LOG_UNKNOWN};

use super::pause::{pause, PauseOutcome};
use super::state::{RunConfig, RunState};

/// Drives one account through its work items.
///
/// Cheap to clone: one clone is handed to every spawned account task.
#[derive(Clone)]
pub struct TaskSequencer {
    state: Arc<RunState>,
    client: Arc<dyn ActionClient>,
    action: Arc<dyn Action>,
    items: Arc<Vec<WorkItem>>,
    config: RunConfig,
    cancel: CancellationToken,
}

impl TaskSequencer {
    pub fn new(
        state: Arc<RunState>,
        client: Arc<dyn ActionClient>,
        action: Arc<dyn Action>,
        items: Arc<Vec<WorkItem>>,
        config: RunConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state,
            client,
            action,
            items,
            config,
            cancel,
        }
    }

    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    /// Processes every item for the account at `index`, settles it once, then
    /// waits out the pause between accounts.
    /// A `Pool` item's text is picked here, per account.
    pub async fn run_account(&self, index: usize) {
        if !self
            .state
            .transition(index, AccountStatus::Processing, Vec::new())
        {
            warn!("Account {} could not enter processing", index);
            return;
        }

        let mut rng = StdRng::from_entropy();
        let iterations = self.items.len();

        for iteration in 0..iterations {
            if self.cancel.is_cancelled() {
                self.state
                    .transition(index, AccountStatus::Cancelled, vec![LOG_CANCELLED.to_string()]);
                break;
            }

            let item = match self.action.selection() {
                Selection::InOrder => self.items.get(iteration),
                Selection::Pooled => select_index(
                    iterations,
                    iteration,
                    self.config.take_data_random,
                    &mut rng,
                )
                .and_then(|i| self.items.get(i)),
            };
            let Some(item) = item.and_then(|item| {
                item.resolve(iteration, self.config.take_data_random, &mut rng)
            }) else {
                break;
            };

            if self.run_item(index, &item).await == AccountStatus::Cancelled {
                break;
            }

            if iteration + 1 < iterations {
                // A cancelled pause is picked up by the check at the top.
                pause(self.config.pause_between_tasks, &self.cancel).await;
            }
        }

        if self.state.status(index) == Some(AccountStatus::Processing) {
            self.state
                .transition(index, AccountStatus::Error, vec![LOG_UNKNOWN.to_string()]);
        }

        self.state.settle(index);
        pause(self.config.pause_between_accounts, &self.cancel).await;
    }

    /// Sends `item`, retrying retryable outcomes up to `max_retries` times.
    /// Every attempt's outcome is written to the account.
    async fn run_item(&self, index: usize, item: &WorkItem) -> AccountStatus {
        let mut retries = 0;
        loop {
            let outcome = self.send_once(index, item).await;
            let status = outcome.status;
            let retryable = outcome.retryable;
            self.apply(index, outcome);

            if !retryable || retries >= self.config.max_retries || self.cancel.is_cancelled() {
                return status;
            }
            retries += 1;
            debug!(
                "Account {} retrying {} ({}/{})",
                index, item, retries, self.config.max_retries
            );
            if pause(self.config.pause_between_tasks, &self.cancel).await == PauseOutcome::Cancelled {
                return status;
            }
        }
    }

    async fn send_once(&self, index: usize, item: &WorkItem) -> Outcome {
        let Some(credentials) = self.state.credentials(index) else {
            return Outcome::error();
        };
        let endpoint = self.action.endpoint();
        let body = self.action.build(item, &credentials);

        match self.client.send(endpoint, body, &self.cancel).await {
            Ok(response) => {
                let outcome = self.action.interpret(&response);
                debug!(
                    "Account {} {} {}: {}",
                    index,
                    self.action.name(),
                    item,
                    outcome.status
                );
                outcome
            }
            Err(TransportError::Cancelled) => Outcome::cancelled(),
            Err(e) => {
                warn!("Account {} request to {} failed: {}", index, endpoint, e);
                Outcome::error()
            }
        }
    }

    fn apply(&self, index: usize, outcome: Outcome) {
        let Outcome {
            status,
            logs,
            display_name,
            new_token,
            ..
        } = outcome;

        let applied = self
            .state
            .update(index, |account| {
                if let Some(name) = display_name {
                    account.display_name = Some(name);
                }
                if let Some(token) = new_token {
                    account.credentials.token = token;
                }
                account.transition(status, logs)
            })
            .unwrap_or(false);

        if applied {
            self.state.publish_stats();
        } else {
            debug!("Account {} ignored transition to {}", index, status);
        }
    }
}
