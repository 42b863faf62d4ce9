//! In-code schema migrations, applied in order and tracked in the
//! `_migrations` table.

pub fn get_migrations() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "001_purchase_intents",
            r#"
            CREATE TABLE IF NOT EXISTS purchase_intents (
                id TEXT PRIMARY KEY,
                uid TEXT NOT NULL,
                tier TEXT NOT NULL,
                price_ton DOUBLE PRECISION NOT NULL,
                to_addr TEXT NOT NULL,
                comment TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                tx_hash TEXT,
                confirmed_at TIMESTAMPTZ,
                granted_level INT,
                granted_item_key TEXT,
                granted_at TIMESTAMPTZ,
                reject_reason TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_intents_uid ON purchase_intents(uid);
            "#,
        ),
        (
            "002_profiles_inventory",
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                uid TEXT PRIMARY KEY,
                balance BIGINT NOT NULL DEFAULT 0,
                balance_reason TEXT,
                balance_updated_at TIMESTAMPTZ,
                ref_count INT NOT NULL DEFAULT 0,
                recent_referrals JSONB NOT NULL DEFAULT '[]',
                completed_tasks TEXT[] NOT NULL DEFAULT '{}',
                referred_by TEXT,
                referred_by_name TEXT,
                referred_at TIMESTAMPTZ,
                banned BOOLEAN NOT NULL DEFAULT FALSE,
                ban_reason TEXT
            );
            CREATE TABLE IF NOT EXISTS inventory (
                uid TEXT NOT NULL,
                item_key TEXT NOT NULL,
                qty BIGINT NOT NULL DEFAULT 0,
                PRIMARY KEY (uid, item_key)
            );
            "#,
        ),
        (
            "003_events",
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                uid TEXT NOT NULL,
                payload JSONB NOT NULL DEFAULT '{}',
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_events_uid ON events(uid);
            "#,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_names_are_unique_and_ordered() {
        let migrations = get_migrations();
        let mut names: Vec<&str> = migrations.iter().map(|(n, _)| *n).collect();
        let sorted = {
            let mut s = names.clone();
            s.sort();
            s
        };
        assert_eq!(names, sorted, "migrations must be listed in order");
        names.dedup();
        assert_eq!(names.len(), migrations.len());
    }
}
