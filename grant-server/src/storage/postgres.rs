//! PostgreSQL store adapter.
//!
//! All reward-flow state lives here. Mutating operations follow one
//! discipline: open a transaction, re-read the authoritative row with
//! `FOR UPDATE`, check the guard, then write — so two racing requests for
//! the same entity serialize and the loser degrades to an idempotent
//! result. The external ledger lookup never happens inside a transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

use tapcraft_core::catalog::TaskKey;
use tapcraft_core::pricing::referral_reward;

use super::migrations;
use super::repository::{
    ClaimOutcome, ConfirmOutcome, EventRecord, GrantSpec, IntentRecord, IntentStatus,
    ProfileRecord, ReferralEntry, ReferralOutcome, Store, StoreError, StoreResult,
    RECENT_REFERRALS_CAP,
};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run pending migrations.
    pub async fn new(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connected (max_connections={})", max_connections);

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name VARCHAR(100) PRIMARY KEY,
                applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await?;

        for (name, sql) in migrations::get_migrations() {
            let applied: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE name = $1)")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?;

            if !applied {
                info!("Running migration: {}", name);
                sqlx::raw_sql(sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StoreError::Backend(format!("migration {name}: {e}")))?;
                sqlx::query("INSERT INTO _migrations (name) VALUES ($1)")
                    .bind(name)
                    .execute(&self.pool)
                    .await?;
                info!("Migration applied: {}", name);
            } else {
                debug!("Migration already applied: {}", name);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(FromRow)]
struct IntentRow {
    id: String,
    uid: String,
    tier: String,
    price_ton: f64,
    to_addr: String,
    comment: String,
    status: String,
    created_at: DateTime<Utc>,
    tx_hash: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
    granted_level: Option<i32>,
    granted_item_key: Option<String>,
    granted_at: Option<DateTime<Utc>>,
    reject_reason: Option<String>,
}

const INTENT_COLUMNS: &str = "id, uid, tier, price_ton, to_addr, comment, status, created_at, \
     tx_hash, confirmed_at, granted_level, granted_item_key, granted_at, reject_reason";

fn row_to_intent(row: IntentRow) -> StoreResult<IntentRecord> {
    let status = IntentStatus::parse(&row.status)
        .ok_or_else(|| StoreError::Backend(format!("corrupt intent status '{}'", row.status)))?;
    Ok(IntentRecord {
        id: row.id,
        uid: row.uid,
        tier: row.tier,
        price_ton: row.price_ton,
        to_addr: row.to_addr,
        comment: row.comment,
        status,
        created_at: row.created_at,
        tx_hash: row.tx_hash,
        confirmed_at: row.confirmed_at,
        granted_level: row.granted_level.map(|l| l as u32),
        granted_item_key: row.granted_item_key,
        granted_at: row.granted_at,
        reject_reason: row.reject_reason,
    })
}

#[derive(FromRow)]
struct ProfileRow {
    uid: String,
    balance: i64,
    ref_count: i32,
    recent_referrals: serde_json::Value,
    completed_tasks: Vec<String>,
    referred_by: Option<String>,
    referred_at: Option<DateTime<Utc>>,
    banned: bool,
    ban_reason: Option<String>,
}

fn row_to_profile(row: ProfileRow) -> ProfileRecord {
    let recent_referrals: Vec<ReferralEntry> =
        serde_json::from_value(row.recent_referrals).unwrap_or_default();
    ProfileRecord {
        uid: row.uid,
        balance: row.balance,
        ref_count: row.ref_count.max(0) as u32,
        recent_referrals,
        completed_tasks: row.completed_tasks,
        referred_by: row.referred_by,
        referred_at: row.referred_at,
        banned: row.banned,
        ban_reason: row.ban_reason,
    }
}

// ============================================================================
// Store impl
// ============================================================================

#[async_trait]
impl Store for PostgresStore {
    async fn get_intent(&self, id: &str) -> StoreResult<Option<IntentRecord>> {
        let row = sqlx::query_as::<_, IntentRow>(&format!(
            "SELECT {INTENT_COLUMNS} FROM purchase_intents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_intent).transpose()
    }

    async fn put_intent(&self, intent: &IntentRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO purchase_intents
                (id, uid, tier, price_ton, to_addr, comment, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO UPDATE SET
                uid = EXCLUDED.uid, tier = EXCLUDED.tier, price_ton = EXCLUDED.price_ton,
                to_addr = EXCLUDED.to_addr, comment = EXCLUDED.comment",
        )
        .bind(&intent.id)
        .bind(&intent.uid)
        .bind(&intent.tier)
        .bind(intent.price_ton)
        .bind(&intent.to_addr)
        .bind(&intent.comment)
        .bind(intent.status.as_str())
        .bind(intent.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reject_intent(&self, id: &str, reason: &str) -> StoreResult<IntentStatus> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM purchase_intents WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let status = status.ok_or_else(|| StoreError::NotFound(format!("intent {id}")))?;
        let status = IntentStatus::parse(&status)
            .ok_or_else(|| StoreError::Backend(format!("corrupt intent status '{status}'")))?;

        if status != IntentStatus::Pending {
            return Ok(status);
        }

        sqlx::query(
            "UPDATE purchase_intents SET status = 'rejected', reject_reason = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(intent = id, reason, "intent rejected");
        Ok(IntentStatus::Rejected)
    }

    async fn confirm_intent(&self, id: &str, grant: &GrantSpec) -> StoreResult<ConfirmOutcome> {
        let mut tx = self.pool.begin().await?;

        // Re-read inside the transaction: closes the race between the
        // caller's earlier read and this write.
        let row = sqlx::query_as::<_, IntentRow>(&format!(
            "SELECT {INTENT_COLUMNS} FROM purchase_intents WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let intent = row_to_intent(row.ok_or_else(|| StoreError::NotFound(format!("intent {id}")))?)?;

        if intent.status != IntentStatus::Pending {
            return Ok(ConfirmOutcome::AlreadyResolved {
                status: intent.status,
                level: intent.granted_level,
            });
        }

        if let Some(level) = intent.granted_level {
            // A prior partial write already recorded the grant: finish the
            // status fields without touching inventory again.
            sqlx::query(
                "UPDATE purchase_intents
                 SET status = 'confirmed', tx_hash = $2, confirmed_at = NOW()
                 WHERE id = $1",
            )
            .bind(id)
            .bind(&grant.tx_hash)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(ConfirmOutcome::AlreadyResolved {
                status: IntentStatus::Confirmed,
                level: Some(level),
            });
        }

        sqlx::query(
            "UPDATE purchase_intents
             SET status = 'confirmed', tx_hash = $2, confirmed_at = NOW(),
                 granted_level = $3, granted_item_key = $4, granted_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&grant.tx_hash)
        .bind(grant.level as i32)
        .bind(&grant.item_key)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO inventory (uid, item_key, qty) VALUES ($1, $2, 1)
             ON CONFLICT (uid, item_key) DO UPDATE SET qty = inventory.qty + 1",
        )
        .bind(&intent.uid)
        .bind(&grant.item_key)
        .execute(&mut *tx)
        .await?;

        let payload = serde_json::json!({
            "level": grant.level,
            "item_key": grant.item_key,
            "tx_hash": grant.tx_hash,
        });
        sqlx::query(
            "INSERT INTO events (id, kind, uid, payload) VALUES ($1, 'purchase', $2, $3)
             ON CONFLICT (id) DO UPDATE SET payload = EXCLUDED.payload, updated_at = NOW()",
        )
        .bind(id)
        .bind(&intent.uid)
        .bind(&payload)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(intent = id, level = grant.level, "purchase grant confirmed");
        Ok(ConfirmOutcome::Granted { level: grant.level })
    }

    async fn claim_task(&self, uid: &str, task: TaskKey) -> StoreResult<ClaimOutcome> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO profiles (uid) VALUES ($1) ON CONFLICT (uid) DO NOTHING")
            .bind(uid)
            .execute(&mut *tx)
            .await?;

        let completed: Vec<String> =
            sqlx::query_scalar("SELECT completed_tasks FROM profiles WHERE uid = $1 FOR UPDATE")
                .bind(uid)
                .fetch_one(&mut *tx)
                .await?;
        if completed.iter().any(|t| t == task.key()) {
            return Ok(ClaimOutcome::AlreadyClaimed);
        }

        let reward = task.reward();
        sqlx::query(
            "UPDATE profiles
             SET completed_tasks = array_append(completed_tasks, $2),
                 balance = balance + $3, balance_reason = $4, balance_updated_at = NOW()
             WHERE uid = $1",
        )
        .bind(uid)
        .bind(task.key())
        .bind(reward as i64)
        .bind(format!("task_{}", task.key()))
        .execute(&mut *tx)
        .await?;

        let event_id = format!("task_{uid}_{}", task.key());
        sqlx::query(
            "INSERT INTO events (id, kind, uid, payload) VALUES ($1, 'task', $2, $3)
             ON CONFLICT (id) DO UPDATE SET payload = EXCLUDED.payload, updated_at = NOW()",
        )
        .bind(&event_id)
        .bind(uid)
        .bind(serde_json::json!({ "task": task.key(), "reward": reward }))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(uid, task = task.key(), reward, "task reward claimed");
        Ok(ClaimOutcome::Claimed { reward })
    }

    async fn register_referral(
        &self,
        referrer_uid: &str,
        referred_uid: &str,
        referrer_name: Option<&str>,
    ) -> StoreResult<ReferralOutcome> {
        // Profile creation is idempotent and safe outside the guard.
        sqlx::query("INSERT INTO profiles (uid) VALUES ($1) ON CONFLICT (uid) DO NOTHING")
            .bind(referred_uid)
            .execute(&self.pool)
            .await?;

        let mut tx = self.pool.begin().await?;

        let referred_by: Option<String> =
            sqlx::query_scalar("SELECT referred_by FROM profiles WHERE uid = $1 FOR UPDATE")
                .bind(referred_uid)
                .fetch_one(&mut *tx)
                .await?;
        if referred_by.is_some() {
            return Ok(ReferralOutcome::AlreadyReferred);
        }

        let referrer: Option<(i32, serde_json::Value)> = sqlx::query_as(
            "SELECT ref_count, recent_referrals FROM profiles WHERE uid = $1 FOR UPDATE",
        )
        .bind(referrer_uid)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((ref_count, recent_json)) = referrer else {
            return Ok(ReferralOutcome::ReferrerNotFound);
        };

        let new_count = (ref_count.max(0) as u32) + 1;
        let reward = referral_reward(new_count);
        let now = Utc::now();

        let mut recent: Vec<ReferralEntry> =
            serde_json::from_value(recent_json).unwrap_or_default();
        recent.retain(|e| e.uid != referred_uid);
        recent.insert(0, ReferralEntry { uid: referred_uid.to_string(), name: None, at: now });
        recent.truncate(RECENT_REFERRALS_CAP);
        let recent_json = serde_json::to_value(&recent)
            .map_err(|e| StoreError::Backend(format!("recent referrals encode: {e}")))?;

        sqlx::query(
            "UPDATE profiles
             SET ref_count = $2, recent_referrals = $3,
                 balance = balance + $4, balance_reason = 'referral', balance_updated_at = NOW()
             WHERE uid = $1",
        )
        .bind(referrer_uid)
        .bind(new_count as i32)
        .bind(&recent_json)
        .bind(reward as i64)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE profiles
             SET referred_by = $2, referred_by_name = $3, referred_at = NOW()
             WHERE uid = $1",
        )
        .bind(referred_uid)
        .bind(referrer_uid)
        .bind(referrer_name)
        .execute(&mut *tx)
        .await?;

        let event_id = format!("ref_{referrer_uid}_{referred_uid}");
        sqlx::query(
            "INSERT INTO events (id, kind, uid, payload) VALUES ($1, 'referral', $2, $3)
             ON CONFLICT (id) DO UPDATE SET payload = EXCLUDED.payload, updated_at = NOW()",
        )
        .bind(&event_id)
        .bind(referrer_uid)
        .bind(serde_json::json!({
            "referred": referred_uid,
            "reward": reward,
            "ref_count": new_count,
        }))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(referrer = referrer_uid, referred = referred_uid, reward, "referral registered");
        Ok(ReferralOutcome::Registered { reward, ref_count: new_count })
    }

    async fn get_profile(&self, uid: &str) -> StoreResult<Option<ProfileRecord>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT uid, balance, ref_count, recent_referrals, completed_tasks,
                    referred_by, referred_at, banned, ban_reason
             FROM profiles WHERE uid = $1",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_profile))
    }

    async fn inventory_count(&self, uid: &str, item_key: &str) -> StoreResult<i64> {
        let qty: Option<i64> =
            sqlx::query_scalar("SELECT qty FROM inventory WHERE uid = $1 AND item_key = $2")
                .bind(uid)
                .bind(item_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(qty.unwrap_or(0))
    }

    async fn get_event(&self, id: &str) -> StoreResult<Option<EventRecord>> {
        let row: Option<(String, String, String, serde_json::Value, DateTime<Utc>)> =
            sqlx::query_as("SELECT id, kind, uid, payload, updated_at FROM events WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, kind, uid, payload, updated_at)| EventRecord {
            id,
            kind,
            uid,
            payload,
            updated_at,
        }))
    }
}
