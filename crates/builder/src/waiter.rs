//! Polls the bundler until a submitted user operation is included in a transaction

use crate::error::ConfirmationTimeout;
use corvus_primitives::{constants::confirmation, UserOperationHash};
use corvus_rpc::BundlerClient;
use ethers::{
    prelude::rand::{self, Rng},
    types::H256,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

/// Receipt polling schedule
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Number of receipt lookups before giving up
    pub max_retries: u32,
    /// Delay before the first lookup
    pub interval: Duration,
    /// Backoff multiplier applied per attempt
    pub multiplier: f64,
    /// Upper bound of the random jitter added to each delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: confirmation::DEFAULT_MAX_RETRIES,
            interval: Duration::from_millis(confirmation::DEFAULT_INTERVAL_MS),
            multiplier: confirmation::DEFAULT_MULTIPLIER,
            max_jitter: Duration::from_millis(confirmation::DEFAULT_MAX_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before the lookup `attempt` (zero-based): `interval * multiplier^attempt + jitter`
    pub fn delay(&self, attempt: u32, jitter: Duration) -> Duration {
        self.interval.mul_f64(self.multiplier.powi(attempt as i32)) + jitter
    }

    fn jitter(&self) -> Duration {
        let max = self.max_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}

/// Waits for user operations to be mined
#[derive(Debug, Clone)]
pub struct ConfirmationWaiter {
    bundler: Arc<dyn BundlerClient>,
    policy: RetryPolicy,
}

impl ConfirmationWaiter {
    pub fn new(bundler: Arc<dyn BundlerClient>, policy: RetryPolicy) -> Self {
        Self { bundler, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Hash of the transaction that included the user operation
    ///
    /// Lookup errors are retried like a missing receipt; only the last one is reported.
    pub async fn wait_for_user_operation_transaction(
        &self,
        hash: UserOperationHash,
    ) -> Result<H256, ConfirmationTimeout> {
        let mut last_error = None;

        for attempt in 0..self.policy.max_retries {
            let delay = self.policy.delay(attempt, self.policy.jitter());
            tokio::time::sleep(delay).await;

            match self.bundler.get_user_operation_receipt(hash).await {
                Ok(Some(receipt)) => {
                    let tx_hash = receipt.tx_receipt.transaction_hash;
                    info!("User operation {hash} included in transaction {tx_hash:?}");
                    return Ok(tx_hash);
                }
                Ok(None) => {
                    debug!("No receipt for user operation {hash} (attempt {})", attempt + 1);
                    last_error = None;
                }
                Err(err) => {
                    debug!("Receipt lookup of {hash} failed (attempt {}): {err}", attempt + 1);
                    last_error = Some(err.to_string());
                }
            }
        }

        Err(ConfirmationTimeout { hash, attempts: self.policy.max_retries, last_error })
    }
}
