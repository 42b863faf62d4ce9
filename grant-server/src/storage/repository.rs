//! Repository abstraction over the persisted document store.
//!
//! All cross-request state lives behind this trait; request handlers are
//! stateless. Every mutating operation re-reads the authoritative state
//! inside its own atomic unit and checks a guard (status still pending,
//! task not yet claimed, no referrer recorded) before writing — a failed
//! guard degrades to an idempotent result, never a double-apply.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tapcraft_core::catalog::TaskKey;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentStatus {
    Pending,
    Confirmed,
    Rejected,
    Expired,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "rejected" => Some(Self::Rejected),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// A purchase intent. Never deleted; doubles as the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentRecord {
    pub id: String,
    pub uid: String,
    pub tier: String,
    pub price_ton: f64,
    pub to_addr: String,
    /// Unique payment memo encoding user id, tier and a nonce.
    pub comment: String,
    pub status: IntentStatus,
    pub created_at: DateTime<Utc>,
    pub tx_hash: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub granted_level: Option<u32>,
    pub granted_item_key: Option<String>,
    pub granted_at: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
}

/// The reward derived for a matched payment. Written at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantSpec {
    pub level: u32,
    pub item_key: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralEntry {
    pub uid: String,
    /// Display name is optional; the reward flow does not trust or
    /// require it (derived from a separate profile lookup if needed).
    pub name: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileRecord {
    pub uid: String,
    pub balance: i64,
    pub ref_count: u32,
    pub recent_referrals: Vec<ReferralEntry>,
    pub completed_tasks: Vec<String>,
    pub referred_by: Option<String>,
    pub referred_at: Option<DateTime<Utc>>,
    pub banned: bool,
    pub ban_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: String,
    pub kind: String,
    pub uid: String,
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Operation outcomes
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// This call performed the grant.
    Granted { level: u32 },
    /// Another call resolved the intent first; nothing was double-applied.
    AlreadyResolved { status: IntentStatus, level: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed { reward: u64 },
    AlreadyClaimed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralOutcome {
    Registered { reward: u64, ref_count: u32 },
    AlreadyReferred,
    ReferrerNotFound,
}

/// Maximum entries kept in a referrer's recent-referrals list.
pub const RECENT_REFERRALS_CAP: usize = 20;

// ============================================================================
// Store trait
// ============================================================================

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_intent(&self, id: &str) -> StoreResult<Option<IntentRecord>>;

    /// Insert or replace an intent (the client-side purchase flow; also
    /// used by tests and seeding tools).
    async fn put_intent(&self, intent: &IntentRecord) -> StoreResult<()>;

    /// Transition a still-pending intent to `rejected`. If the intent has
    /// already left `pending`, returns the stored status unchanged.
    async fn reject_intent(&self, id: &str, reason: &str) -> StoreResult<IntentStatus>;

    /// Atomic double-checked grant: re-reads the intent, and only if it is
    /// still `pending` and ungranted writes status/tx/grant fields,
    /// increments the user's inventory counter for the item key by exactly
    /// one, and upserts the audit event keyed by the intent id — all in one
    /// atomic unit.
    async fn confirm_intent(&self, id: &str, grant: &GrantSpec) -> StoreResult<ConfirmOutcome>;

    /// Exactly-once task reward keyed by `task_<uid>_<key>`.
    async fn claim_task(&self, uid: &str, task: TaskKey) -> StoreResult<ClaimOutcome>;

    /// Atomic referral registration; see `ReferralOutcome` for the guard
    /// results. `referrer_name` is advisory display data only.
    async fn register_referral(
        &self,
        referrer_uid: &str,
        referred_uid: &str,
        referrer_name: Option<&str>,
    ) -> StoreResult<ReferralOutcome>;

    async fn get_profile(&self, uid: &str) -> StoreResult<Option<ProfileRecord>>;
    async fn inventory_count(&self, uid: &str, item_key: &str) -> StoreResult<i64>;
    async fn get_event(&self, id: &str) -> StoreResult<Option<EventRecord>>;
}
