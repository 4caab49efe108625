//! Feature Gate: check, act, then charge only on success.
//!
//! 1. Read the balance; reject with `InsufficientCredits` before any work runs.
//! 2. Run the work.
//! 3. If the work fails, return `ExecutionFailed` without charging.
//! 4. Otherwise consume. A consume that fails here (a concurrent request
//!    drained the balance in between) cannot undo the work: the gate logs a
//!    reconciliation event and returns `ConsumeFailed`, never the output.
//!
//! A run that is dropped after the work started (request timeout, client
//! disconnect) is logged as well: a drop during the work charges nothing, a
//! drop during the consume leaves the charge to whatever the store committed.

use std::future::Future;
use std::sync::Arc;

use ledger_core::metadata::keys;
use ledger_core::{AccountId, LedgerError, Metadata, TransactionRecord};

use crate::ledger::Ledger;

/// A feature with a credit price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedFeature {
    /// Feature name, recorded as the consume reason.
    pub name: String,
    /// Credits charged per successful invocation.
    pub cost: i64,
}

impl PricedFeature {
    /// Create a priced feature.
    #[must_use]
    pub fn new(name: impl Into<String>, cost: i64) -> Self {
        Self {
            name: name.into(),
            cost,
        }
    }
}

/// Output of a charged invocation.
#[derive(Debug, Clone)]
pub struct Gated<T> {
    /// What the work produced.
    pub output: T,
    /// The CONSUME record.
    pub record: TransactionRecord,
}

/// Why a gated invocation did not produce a charged result.
#[derive(Debug, thiserror::Error)]
pub enum GateError<E> {
    /// The pre-check failed; the work was never started.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Balance observed by the pre-check.
        balance: i64,
        /// Feature cost.
        required: i64,
    },

    /// The work failed; nothing was charged.
    #[error("execution failed: {0}")]
    ExecutionFailed(E),

    /// The work succeeded but the charge did not.
    #[error("work {invocation_id} completed but consume failed: {cause}")]
    ConsumeFailed {
        /// Identifier of the invocation, also present in the reconciliation log.
        invocation_id: String,
        /// Why the consume failed.
        cause: LedgerError,
    },

    /// The pre-check could not read the balance.
    #[error(transparent)]
    Ledger(LedgerError),
}

/// Couples priced feature invocations to the ledger.
#[derive(Clone)]
pub struct FeatureGate {
    ledger: Arc<Ledger>,
}

impl FeatureGate {
    /// Create a gate over `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Run `work` for `account_id` and charge `feature.cost` if it succeeds.
    pub async fn run<T, E, F, Fut>(
        &self,
        account_id: &AccountId,
        feature: &PricedFeature,
        work: F,
    ) -> Result<Gated<T>, GateError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if feature.cost <= 0 {
            return Err(GateError::Ledger(LedgerError::InvalidAmount(format!(
                "feature {} has non-positive cost {}",
                feature.name, feature.cost
            ))));
        }

        let balance = self
            .ledger
            .balance_of(account_id)
            .await
            .map_err(GateError::Ledger)?;
        if balance < feature.cost {
            tracing::warn!(
                account_id = %account_id,
                feature = %feature.name,
                balance,
                cost = feature.cost,
                "Feature rejected before execution"
            );
            return Err(GateError::InsufficientCredits {
                balance,
                required: feature.cost,
            });
        }

        let invocation_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(
            account_id = %account_id,
            feature = %feature.name,
            invocation_id = %invocation_id,
            "Executing gated feature"
        );

        let mut in_flight = InFlight::new(*account_id, feature, &invocation_id);
        let output = match work().await {
            Ok(output) => output,
            Err(e) => {
                in_flight.finish();
                tracing::warn!(
                    account_id = %account_id,
                    feature = %feature.name,
                    invocation_id = %invocation_id,
                    error = %e,
                    "Feature execution failed, nothing charged"
                );
                return Err(GateError::ExecutionFailed(e));
            }
        };

        let metadata = Metadata::new()
            .with(keys::FEATURE, feature.name.as_str())
            .with(keys::INVOCATION_ID, invocation_id.as_str());

        in_flight.stage = Stage::Charging;
        let charged = self
            .ledger
            .consume(account_id, feature.cost, &feature.name, metadata)
            .await;
        in_flight.finish();

        match charged {
            Ok(record) => Ok(Gated { output, record }),
            Err(cause) => {
                tracing::error!(
                    target: "ledger::reconciliation",
                    account_id = %account_id,
                    feature = %feature.name,
                    invocation_id = %invocation_id,
                    cost = feature.cost,
                    cause = %cause,
                    "Feature executed but charge failed; manual reconciliation required"
                );
                Err(GateError::ConsumeFailed {
                    invocation_id,
                    cause,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Working,
    Charging,
    Finished,
}

/// Reports a gated run dropped before it reached an outcome.
struct InFlight {
    account_id: AccountId,
    feature: String,
    cost: i64,
    invocation_id: String,
    stage: Stage,
}

impl InFlight {
    fn new(account_id: AccountId, feature: &PricedFeature, invocation_id: &str) -> Self {
        Self {
            account_id,
            feature: feature.name.clone(),
            cost: feature.cost,
            invocation_id: invocation_id.to_string(),
            stage: Stage::Working,
        }
    }

    fn finish(&mut self) {
        self.stage = Stage::Finished;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        match self.stage {
            Stage::Working => tracing::warn!(
                account_id = %self.account_id,
                feature = %self.feature,
                invocation_id = %self.invocation_id,
                "Gated feature cancelled during execution, nothing charged"
            ),
            Stage::Charging => tracing::error!(
                target: "ledger::reconciliation",
                account_id = %self.account_id,
                feature = %self.feature,
                invocation_id = %self.invocation_id,
                cost = self.cost,
                "Gated feature cancelled while charging; manual reconciliation required"
            ),
            Stage::Finished => {}
        }
    }
}
