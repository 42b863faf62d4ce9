//! Payment verification and reward grant.
//!
//! Resolves a purchase intent against the external ledger and issues the
//! reward at most once. The ledger lookup happens outside any storage
//! transaction; only the guarded grant write is transactional. Rejection
//! is reserved for provable tampering (wrong address or price) — a
//! transient ledger failure surfaces as retryable and leaves the intent
//! `pending`.

use tracing::{info, warn};

use tapcraft_core::catalog::{item_key_for_level, PurchaseTier};
use tapcraft_core::loot::{grant_seed, pick_deterministic};

use crate::error::ApiError;
use crate::ledger::{LedgerClient, LedgerTx};
use crate::storage::repository::{ConfirmOutcome, GrantSpec, IntentStatus, Store};

/// Result of a verification call. All of these are successful responses;
/// the caller retries only on `Pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Pending { message: String },
    Confirmed { level: u32 },
    Rejected { message: String },
    Expired,
}

impl VerifyOutcome {
    fn from_status(status: IntentStatus, level: Option<u32>) -> Self {
        match (status, level) {
            (IntentStatus::Confirmed, Some(level)) => Self::Confirmed { level },
            // Confirmed without a recorded level should not exist; report
            // pending so the caller retries instead of losing the grant.
            (IntentStatus::Confirmed, None) => {
                Self::Pending { message: "grant still settling, retry".into() }
            }
            (IntentStatus::Pending, _) => {
                Self::Pending { message: "payment not seen yet".into() }
            }
            (IntentStatus::Rejected, _) => Self::Rejected { message: "intent rejected".into() },
            (IntentStatus::Expired, _) => Self::Expired,
        }
    }
}

pub struct PaymentVerifier<'a> {
    pub store: &'a dyn Store,
    pub ledger: &'a dyn LedgerClient,
    /// Canonical merchant wallet; any intent naming another recipient is
    /// tampered.
    pub merchant_address: &'a str,
    /// How many recent ledger transactions to scan per attempt.
    pub scan_limit: u32,
}

fn memo_matches(tx: &LedgerTx, expected: &str) -> bool {
    match tx.memo() {
        Some(memo) => memo == expected || memo.contains(expected),
        None => false,
    }
}

impl PaymentVerifier<'_> {
    pub async fn verify(&self, caller_uid: &str, intent_id: &str) -> Result<VerifyOutcome, ApiError> {
        let intent = self
            .store
            .get_intent(intent_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("intent {intent_id}")))?;

        if intent.uid != caller_uid {
            return Err(ApiError::PermissionDenied("intent belongs to another user".into()));
        }

        // Idempotent short-circuit: resolved intents answer from storage,
        // no ledger work.
        if intent.status != IntentStatus::Pending {
            return Ok(VerifyOutcome::from_status(intent.status, intent.granted_level));
        }

        // Tamper checks against the canonical catalog, before any lookup.
        let Some(tier) = PurchaseTier::parse(&intent.tier) else {
            let status = self.store.reject_intent(intent_id, "unknown tier").await?;
            return Ok(VerifyOutcome::from_status(status, None));
        };
        if intent.to_addr != self.merchant_address {
            warn!(intent = intent_id, "recipient address mismatch");
            let status = self
                .store
                .reject_intent(intent_id, "recipient address mismatch")
                .await?;
            return Ok(VerifyOutcome::from_status(status, None));
        }
        let declared_nano =
            (intent.price_ton * tapcraft_core::catalog::NANOTON_PER_TON as f64).round() as i64;
        if declared_nano != tier.price_nanoton() {
            warn!(intent = intent_id, declared_nano, "declared price mismatch");
            let status = self
                .store
                .reject_intent(intent_id, "declared price mismatch")
                .await?;
            return Ok(VerifyOutcome::from_status(status, None));
        }

        // Ledger scan, outside any storage transaction. Failures here are
        // transient: the intent stays pending.
        let txs = self.ledger.recent_transactions(self.scan_limit).await?;
        let matched = txs
            .iter()
            .find(|tx| tx.amount_nano == tier.price_nanoton() && memo_matches(tx, &intent.comment));
        let Some(payment) = matched else {
            return Ok(VerifyOutcome::Pending { message: "payment not seen yet".into() });
        };

        // Deterministic reward: a retried call after the same match
        // regrants the identical level instead of rerolling.
        let seed = grant_seed(&intent.id, &payment.hash, tier.key());
        let level = pick_deterministic(tier.level_pool(), &seed)
            .copied()
            .ok_or_else(|| ApiError::Unavailable("tier has an empty reward pool".into()))?;
        let grant = GrantSpec {
            level,
            item_key: item_key_for_level(level),
            tx_hash: payment.hash.clone(),
        };

        match self.store.confirm_intent(intent_id, &grant).await? {
            ConfirmOutcome::Granted { level } => {
                info!(intent = intent_id, level, tx = %grant.tx_hash, "payment verified, reward granted");
                Ok(VerifyOutcome::Confirmed { level })
            }
            ConfirmOutcome::AlreadyResolved { status, level } => {
                Ok(VerifyOutcome::from_status(status, level))
            }
        }
    }
}
