use std::ops::RangeInclusive;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::models::{AccountStatus, LOG_UNKNOWN};

use super::sequencer::TaskSequencer;

/// Splits `range` into consecutive chunks of at most `batch_size` indices.
pub fn partition(range: RangeInclusive<usize>, batch_size: usize) -> Vec<Vec<usize>> {
    let indices: Vec<usize> = range.collect();
    indices
        .chunks(batch_size.max(1))
        .map(<[usize]>::to_vec)
        .collect()
}

/// Runs accounts batch by batch: every account in a batch runs concurrently,
/// and the next batch starts only once all of them have settled.
pub struct BatchExecutor {
    sequencer: TaskSequencer,
    batch_size: usize,
}

impl BatchExecutor {
    pub fn new(sequencer: TaskSequencer, batch_size: usize) -> Self {
        Self {
            sequencer,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn run(&self, range: RangeInclusive<usize>) {
        let batches = partition(range, self.batch_size);
        let total = batches.len();

        for (number, batch) in batches.into_iter().enumerate() {
            info!(
                "Batch {}/{}: accounts {:?}",
                number + 1,
                total,
                batch
            );

            let mut tasks = JoinSet::new();
            for &index in &batch {
                let sequencer = self.sequencer.clone();
                tasks.spawn(async move {
                    sequencer.run_account(index).await;
                    index
                });
            }

            let mut settled = Vec::with_capacity(batch.len());
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(index) => settled.push(index),
                    Err(e) => warn!("Account task aborted: {}", e),
                }
            }

            for &index in batch.iter().filter(|index| !settled.contains(index)) {
                self.settle_abandoned(index);
            }
        }
    }

    /// Records an account whose task died before settling.
    fn settle_abandoned(&self, index: usize) {
        let state = self.sequencer.state();
        if state.status(index) == Some(AccountStatus::Idle) {
            state.transition(index, AccountStatus::Processing, Vec::new());
        }
        if state.status(index) == Some(AccountStatus::Processing) {
            state.transition(index, AccountStatus::Error, vec![LOG_UNKNOWN.to_string()]);
        }
        if state.settle(index) {
            warn!("Account {} settled as {}", index, AccountStatus::Error);
        }
    }
}
