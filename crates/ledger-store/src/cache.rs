//! Redis-backed balance cache, grounded on
//! `original_source/.../accounting/ledger_cache.py`.
//!
//! Keys embed a generation counter (`ledger:bal:v{generation}:...`) so a
//! full invalidation is an O(1) counter bump rather than a key sweep;
//! selective invalidation (after posting one ledger entry, which only ever
//! touches two accounts) deletes the handful of keys naming those accounts
//! via SCAN/DEL, leaving unrelated entries alive.

use ledger_commons::Account;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sha2::Digest;
use sha2::Sha256;
use time::Duration;
use time::OffsetDateTime;

use crate::reports::AccountBalance;

const GENERATION_KEY: &str = "ledger:__generation__";
pub const DEFAULT_TTL_SECONDS: u64 = 1200;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("cached value could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct LedgerCache {
    conn: ConnectionManager,
}

impl LedgerCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn key(generation: u64, account: &Account, as_of: Option<OffsetDateTime>, age: Option<Duration>) -> String {
        let date_part = match as_of {
            None => "live".to_string(),
            Some(dt) => {
                let truncated = dt.replace_second(0).and_then(|d| d.replace_nanosecond(0));
                truncated.unwrap_or(dt).to_string()
            }
        };
        let age_part = match age {
            Some(a) if a.whole_seconds() > 0 => a.whole_seconds().to_string(),
            _ => "none".to_string(),
        };
        let raw = format!(
            "{}:{}:{}:{}|{date_part}|{age_part}",
            account.name, account.account_type as u32, account.sub, account.contra
        );
        let digest = Sha256::digest(raw.as_bytes());
        let key_hash = hex::encode(&digest[..8]);
        format!("ledger:bal:v{generation}:{}:{}:{key_hash}", account.name, account.sub)
    }

    /// Returns the current cache generation, defaulting to `0` if unset or
    /// on any Redis failure — a cache miss is always safe, it just forces a
    /// database read (`ledger_cache.py`'s `get_cache_generation`).
    pub async fn generation(&self) -> u64 {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<u64>>(GENERATION_KEY)
            .await
            .ok()
            .flatten()
            .unwrap_or(0)
    }

    /// Bumps the generation counter, orphaning every existing cache entry in
    /// O(1). Used as the fallback when selective invalidation itself fails.
    pub async fn invalidate_all(&self) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        let generation: u64 = conn.incr(GENERATION_KEY, 1u64).await?;
        Ok(generation)
    }

    /// Deletes only the cache keys for `debit`/`credit`, the two accounts a
    /// single ledger entry can ever touch, via glob SCAN/DEL.
    pub async fn invalidate_for(&self, debit: &Account, credit: &Account) -> Result<(), CacheError> {
        for account in [debit, credit] {
            let pattern = format!("ledger:bal:v*:{}:{}:*", account.name, account.sub);
            if let Err(err) = self.scan_and_delete(&pattern).await {
                tracing::warn!("ledger cache invalidation failed, falling back to full flush: {err}");
                self.invalidate_all().await?;
                return Ok(());
            }
        }
        Ok(())
    }

    async fn scan_and_delete(&self, pattern: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let _: () = conn.del(&keys).await?;
            }
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
        Ok(())
    }

    pub async fn get(
        &self,
        account: &Account,
        as_of: Option<OffsetDateTime>,
        age: Option<Duration>,
    ) -> Result<Option<AccountBalance>, CacheError> {
        let generation = self.generation().await;
        let key = Self::key(generation, account, as_of, age);
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(&key).await?;
        match data {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set(
        &self,
        account: &Account,
        as_of: Option<OffsetDateTime>,
        age: Option<Duration>,
        value: &AccountBalance,
        ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        let generation = self.generation().await;
        let key = Self::key(generation, account, as_of, age);
        let raw = serde_json::to_string(value)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(&key, raw, ttl_seconds).await?;
        Ok(())
    }
}
