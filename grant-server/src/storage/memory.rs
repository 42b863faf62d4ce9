//! In-memory store adapter.
//!
//! Used by unit tests and local development without a database. The
//! mutex-scoped mutations give the same guard semantics the PostgreSQL
//! adapter gets from FOR UPDATE transactions.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use tapcraft_core::catalog::TaskKey;
use tapcraft_core::pricing::referral_reward;

use super::repository::{
    ClaimOutcome, ConfirmOutcome, EventRecord, GrantSpec, IntentRecord, IntentStatus,
    ProfileRecord, ReferralEntry, ReferralOutcome, Store, StoreError, StoreResult,
    RECENT_REFERRALS_CAP,
};

#[derive(Default)]
struct Inner {
    intents: HashMap<String, IntentRecord>,
    profiles: HashMap<String, ProfileRecord>,
    inventory: HashMap<(String, String), i64>,
    events: HashMap<String, EventRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile (stands in for account creation, which is out of
    /// scope for the reward flows).
    pub fn insert_profile(&self, uid: &str) {
        let mut inner = self.inner.lock();
        inner
            .profiles
            .entry(uid.to_string())
            .or_insert_with(|| ProfileRecord { uid: uid.to_string(), ..Default::default() });
    }
}

fn upsert_event(inner: &mut Inner, id: &str, kind: &str, uid: &str, payload: serde_json::Value) {
    inner.events.insert(
        id.to_string(),
        EventRecord {
            id: id.to_string(),
            kind: kind.to_string(),
            uid: uid.to_string(),
            payload,
            updated_at: Utc::now(),
        },
    );
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_intent(&self, id: &str) -> StoreResult<Option<IntentRecord>> {
        Ok(self.inner.lock().intents.get(id).cloned())
    }

    async fn put_intent(&self, intent: &IntentRecord) -> StoreResult<()> {
        self.inner.lock().intents.insert(intent.id.clone(), intent.clone());
        Ok(())
    }

    async fn reject_intent(&self, id: &str, reason: &str) -> StoreResult<IntentStatus> {
        let mut inner = self.inner.lock();
        let intent = inner
            .intents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("intent {id}")))?;
        if intent.status != IntentStatus::Pending {
            return Ok(intent.status);
        }
        intent.status = IntentStatus::Rejected;
        intent.reject_reason = Some(reason.to_string());
        Ok(IntentStatus::Rejected)
    }

    async fn confirm_intent(&self, id: &str, grant: &GrantSpec) -> StoreResult<ConfirmOutcome> {
        let mut inner = self.inner.lock();
        let intent = inner
            .intents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("intent {id}")))?;

        // Double-check: a concurrent call may have resolved it already.
        if intent.status != IntentStatus::Pending {
            return Ok(ConfirmOutcome::AlreadyResolved {
                status: intent.status,
                level: intent.granted_level,
            });
        }

        let now = Utc::now();
        if let Some(level) = intent.granted_level {
            // Partial prior write: finish the status fields, never
            // increment inventory a second time.
            intent.status = IntentStatus::Confirmed;
            intent.tx_hash = Some(grant.tx_hash.clone());
            intent.confirmed_at = Some(now);
            return Ok(ConfirmOutcome::AlreadyResolved {
                status: IntentStatus::Confirmed,
                level: Some(level),
            });
        }

        intent.status = IntentStatus::Confirmed;
        intent.tx_hash = Some(grant.tx_hash.clone());
        intent.confirmed_at = Some(now);
        intent.granted_level = Some(grant.level);
        intent.granted_item_key = Some(grant.item_key.clone());
        intent.granted_at = Some(now);
        let uid = intent.uid.clone();

        *inner.inventory.entry((uid.clone(), grant.item_key.clone())).or_insert(0) += 1;
        upsert_event(
            &mut inner,
            id,
            "purchase",
            &uid,
            serde_json::json!({
                "level": grant.level,
                "item_key": grant.item_key,
                "tx_hash": grant.tx_hash,
            }),
        );
        Ok(ConfirmOutcome::Granted { level: grant.level })
    }

    async fn claim_task(&self, uid: &str, task: TaskKey) -> StoreResult<ClaimOutcome> {
        let mut inner = self.inner.lock();
        let profile = inner
            .profiles
            .entry(uid.to_string())
            .or_insert_with(|| ProfileRecord { uid: uid.to_string(), ..Default::default() });

        if profile.completed_tasks.iter().any(|t| t == task.key()) {
            return Ok(ClaimOutcome::AlreadyClaimed);
        }

        let reward = task.reward();
        profile.completed_tasks.push(task.key().to_string());
        profile.balance += reward as i64;
        let event_id = format!("task_{uid}_{}", task.key());
        upsert_event(
            &mut inner,
            &event_id,
            "task",
            uid,
            serde_json::json!({ "task": task.key(), "reward": reward }),
        );
        Ok(ClaimOutcome::Claimed { reward })
    }

    async fn register_referral(
        &self,
        referrer_uid: &str,
        referred_uid: &str,
        _referrer_name: Option<&str>,
    ) -> StoreResult<ReferralOutcome> {
        let mut inner = self.inner.lock();

        if let Some(referred) = inner.profiles.get(referred_uid) {
            if referred.referred_by.is_some() {
                return Ok(ReferralOutcome::AlreadyReferred);
            }
        }

        let now = Utc::now();
        let (reward, ref_count) = {
            let Some(referrer) = inner.profiles.get_mut(referrer_uid) else {
                return Ok(ReferralOutcome::ReferrerNotFound);
            };
            referrer.ref_count += 1;
            let count = referrer.ref_count;
            let reward = referral_reward(count);
            referrer.recent_referrals.retain(|e| e.uid != referred_uid);
            referrer.recent_referrals.insert(
                0,
                ReferralEntry { uid: referred_uid.to_string(), name: None, at: now },
            );
            referrer.recent_referrals.truncate(RECENT_REFERRALS_CAP);
            referrer.balance += reward as i64;
            (reward, count)
        };

        let referred = inner
            .profiles
            .entry(referred_uid.to_string())
            .or_insert_with(|| ProfileRecord { uid: referred_uid.to_string(), ..Default::default() });
        referred.referred_by = Some(referrer_uid.to_string());
        referred.referred_at = Some(now);

        let event_id = format!("ref_{referrer_uid}_{referred_uid}");
        upsert_event(
            &mut inner,
            &event_id,
            "referral",
            referrer_uid,
            serde_json::json!({ "referred": referred_uid, "reward": reward, "ref_count": ref_count }),
        );
        Ok(ReferralOutcome::Registered { reward, ref_count })
    }

    async fn get_profile(&self, uid: &str) -> StoreResult<Option<ProfileRecord>> {
        Ok(self.inner.lock().profiles.get(uid).cloned())
    }

    async fn inventory_count(&self, uid: &str, item_key: &str) -> StoreResult<i64> {
        Ok(self
            .inner
            .lock()
            .inventory
            .get(&(uid.to_string(), item_key.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn get_event(&self, id: &str) -> StoreResult<Option<EventRecord>> {
        Ok(self.inner.lock().events.get(id).cloned())
    }
}
