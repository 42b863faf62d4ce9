//! Referral and task reward ledger.
//!
//! Both flows are exactly-once: the store re-checks the guard (task not in
//! the completed set, referred user without a referrer) inside its atomic
//! unit, and audit events are keyed by deterministic ids so retries upsert
//! instead of duplicating.

use tracing::info;

use tapcraft_core::catalog::TaskKey;

use crate::error::ApiError;
use crate::storage::repository::{ClaimOutcome, ReferralOutcome, Store};

/// Structured task-claim result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub ok: bool,
    pub message: String,
}

pub async fn claim_task(store: &dyn Store, caller_uid: &str, task_key: &str) -> Result<TaskResult, ApiError> {
    let task = TaskKey::parse(task_key)
        .ok_or_else(|| ApiError::InvalidArgument(format!("unknown task '{task_key}'")))?;

    match store.claim_task(caller_uid, task).await? {
        ClaimOutcome::Claimed { reward } => {
            info!(uid = caller_uid, task = task.key(), reward, "task claimed");
            Ok(TaskResult { ok: true, message: format!("+{reward}") })
        }
        ClaimOutcome::AlreadyClaimed => {
            Ok(TaskResult { ok: false, message: "already claimed".into() })
        }
    }
}

/// Structured referral-registration result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralResult {
    pub ok: bool,
    pub reward: Option<u64>,
    pub ref_count_after: Option<u32>,
    pub message: String,
}

pub async fn register_referral(
    store: &dyn Store,
    caller_uid: &str,
    referrer_uid: &str,
    referrer_name: Option<&str>,
) -> Result<ReferralResult, ApiError> {
    if referrer_uid.is_empty() {
        return Err(ApiError::InvalidArgument("referrerUid is required".into()));
    }
    if referrer_uid == caller_uid {
        return Ok(ReferralResult {
            ok: false,
            reward: None,
            ref_count_after: None,
            message: "self-referral is not allowed".into(),
        });
    }

    match store
        .register_referral(referrer_uid, caller_uid, referrer_name)
        .await?
    {
        ReferralOutcome::Registered { reward, ref_count } => {
            info!(referrer = referrer_uid, referred = caller_uid, reward, "referral credited");
            Ok(ReferralResult {
                ok: true,
                reward: Some(reward),
                ref_count_after: Some(ref_count),
                message: "referral registered".into(),
            })
        }
        ReferralOutcome::AlreadyReferred => Ok(ReferralResult {
            ok: true,
            reward: None,
            ref_count_after: None,
            message: "already referred".into(),
        }),
        ReferralOutcome::ReferrerNotFound => Ok(ReferralResult {
            ok: false,
            reward: None,
            ref_count_after: None,
            message: "referrer not found".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn task_rewards_exactly_once() {
        let store = MemoryStore::new();
        let first = claim_task(&store, "u1", "join_channel").await.unwrap();
        assert!(first.ok);

        let balance_after_first = store.get_profile("u1").await.unwrap().unwrap().balance;
        assert_eq!(balance_after_first, TaskKey::JoinChannel.reward() as i64);

        let second = claim_task(&store, "u1", "join_channel").await.unwrap();
        assert!(!second.ok);
        assert_eq!(second.message, "already claimed");

        let balance_after_second = store.get_profile("u1").await.unwrap().unwrap().balance;
        assert_eq!(balance_after_second, balance_after_first, "no double credit");

        assert!(store.get_event("task_u1_join_channel").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_task_is_invalid_argument() {
        let store = MemoryStore::new();
        let err = claim_task(&store, "u1", "hack_the_gibson").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn different_tasks_accumulate() {
        let store = MemoryStore::new();
        claim_task(&store, "u1", "join_channel").await.unwrap();
        claim_task(&store, "u1", "connect_wallet").await.unwrap();
        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(
            profile.balance,
            (TaskKey::JoinChannel.reward() + TaskKey::ConnectWallet.reward()) as i64
        );
        assert_eq!(profile.completed_tasks.len(), 2);
    }

    #[tokio::test]
    async fn self_referral_is_blocked_without_mutation() {
        let store = MemoryStore::new();
        store.insert_profile("u1");
        let result = register_referral(&store, "u1", "u1", None).await.unwrap();
        assert!(!result.ok);
        let profile = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.ref_count, 0);
        assert_eq!(profile.balance, 0);
        assert!(profile.referred_by.is_none());
    }

    #[tokio::test]
    async fn missing_referrer_fails_gracefully() {
        let store = MemoryStore::new();
        let result = register_referral(&store, "newbie", "ghost", None).await.unwrap();
        assert!(!result.ok);
        assert_eq!(result.message, "referrer not found");
        // referred user must not be stamped
        let profile = store.get_profile("newbie").await.unwrap();
        assert!(profile.map_or(true, |p| p.referred_by.is_none()));
    }

    #[tokio::test]
    async fn referral_pays_schedule_and_stamps_both_sides() {
        let store = MemoryStore::new();
        store.insert_profile("ref");

        let r1 = register_referral(&store, "friend1", "ref", Some("Ref")).await.unwrap();
        assert_eq!(r1.reward, Some(5_000));
        assert_eq!(r1.ref_count_after, Some(1));

        let r2 = register_referral(&store, "friend2", "ref", None).await.unwrap();
        assert_eq!(r2.reward, Some(10_000));
        assert_eq!(r2.ref_count_after, Some(2));

        let referrer = store.get_profile("ref").await.unwrap().unwrap();
        assert_eq!(referrer.ref_count, 2);
        assert_eq!(referrer.balance, 15_000);
        // most-recent-first
        assert_eq!(referrer.recent_referrals[0].uid, "friend2");
        assert_eq!(referrer.recent_referrals[1].uid, "friend1");

        let referred = store.get_profile("friend1").await.unwrap().unwrap();
        assert_eq!(referred.referred_by.as_deref(), Some("ref"));
        assert!(referred.referred_at.is_some());

        assert!(store.get_event("ref_ref_friend1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn repeat_registration_is_idempotent() {
        let store = MemoryStore::new();
        store.insert_profile("ref");
        register_referral(&store, "friend", "ref", None).await.unwrap();

        let again = register_referral(&store, "friend", "ref", None).await.unwrap();
        assert!(again.ok);
        assert_eq!(again.message, "already referred");
        assert_eq!(again.reward, None);

        let referrer = store.get_profile("ref").await.unwrap().unwrap();
        assert_eq!(referrer.ref_count, 1, "no double count");
        assert_eq!(referrer.balance, 5_000, "no double credit");
    }

    #[tokio::test]
    async fn recent_list_is_capped_at_twenty() {
        let store = MemoryStore::new();
        store.insert_profile("ref");
        for i in 0..25 {
            register_referral(&store, &format!("friend{i}"), "ref", None)
                .await
                .unwrap();
        }
        let referrer = store.get_profile("ref").await.unwrap().unwrap();
        assert_eq!(referrer.ref_count, 25);
        assert_eq!(referrer.recent_referrals.len(), 20);
        assert_eq!(referrer.recent_referrals[0].uid, "friend24");
    }

    #[tokio::test]
    async fn referral_reward_caps_at_eleventh() {
        let store = MemoryStore::new();
        store.insert_profile("whale");
        let mut last = 0;
        for i in 0..12 {
            let r = register_referral(&store, &format!("f{i}"), "whale", None)
                .await
                .unwrap();
            last = r.reward.unwrap();
        }
        assert_eq!(last, 5_120_000);
        let eleventh_and_twelfth = 5_120_000 + 5_120_000;
        let sum_first_ten: u64 = (1..=10).map(|n| 5_000u64 << (n - 1)).sum();
        let profile = store.get_profile("whale").await.unwrap().unwrap();
        assert_eq!(profile.balance as u64, sum_first_ten + eleventh_and_twelfth);
    }
}
