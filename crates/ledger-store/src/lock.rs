//! Per-customer distributed locking, grounded on
//! `original_source/.../actions/cust_id_class.py`'s `CustID.acquire_lock`/
//! `release_lock`/`check_lock_exists`.
//!
//! Every pipeline in `pipelines` acquires a [`CustomerLock`] for the
//! customer it is about to post ledger entries for, preventing two
//! concurrently running pipelines from interleaving writes to the same
//! customer's balance (SPEC_FULL.md §5).

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use std::time::Instant;
use uuid::Uuid;

const LOCK_REPORTING_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to acquire lock for {cust_id} after {waited:?}")]
    Timeout { cust_id: String, waited: Duration },
}

fn lock_key(cust_id: &str) -> String {
    format!("cust_id_lock:{cust_id}")
}

/// A held lock on one customer id. Dropping this value without calling
/// [`CustomerLock::release`] leaves the lock to expire on its own TTL —
/// callers should prefer `release` so contending pipelines don't wait out
/// the full lease.
pub struct CustomerLock {
    cust_id: String,
    token: String,
    conn: ConnectionManager,
}

impl CustomerLock {
    /// Blocks (polling, logging every [`LOCK_REPORTING_INTERVAL`]) until the
    /// lock is acquired or `blocking_timeout` elapses.
    pub async fn acquire(
        mut conn: ConnectionManager,
        cust_id: &str,
        lease: Duration,
        blocking_timeout: Option<Duration>,
    ) -> Result<Self, LockError> {
        let key = lock_key(cust_id);
        let token = Uuid::new_v4().to_string();
        let start = Instant::now();
        let mut last_log = start;

        loop {
            let acquired: bool = redis::cmd("SET")
                .arg(&key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(lease.as_millis() as u64)
                .query_async::<_, Option<String>>(&mut conn)
                .await?
                .is_some();

            if acquired {
                tracing::info!(cust_id, "lock acquired");
                return Ok(Self {
                    cust_id: cust_id.to_string(),
                    token,
                    conn,
                });
            }

            if let Some(timeout) = blocking_timeout {
                if start.elapsed() >= timeout {
                    return Err(LockError::Timeout {
                        cust_id: cust_id.to_string(),
                        waited: start.elapsed(),
                    });
                }
            }

            if last_log.elapsed() >= LOCK_REPORTING_INTERVAL {
                tracing::warn!(
                    cust_id,
                    elapsed_secs = start.elapsed().as_secs(),
                    "still waiting for customer lock"
                );
                last_log = Instant::now();
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Releases the lock, but only if it is still held by this token — a
    /// compare-and-delete implemented as a small Lua script, the same
    /// guard `redis.asyncio.lock.Lock.release` provides.
    pub async fn release(mut self) -> Result<bool, LockError> {
        const SCRIPT: &str = r#"
            if redis.call("get", KEYS[1]) == ARGV[1] then
                return redis.call("del", KEYS[1])
            else
                return 0
            end
        "#;
        let released: i64 = redis::Script::new(SCRIPT)
            .key(lock_key(&self.cust_id))
            .arg(&self.token)
            .invoke_async(&mut self.conn)
            .await?;
        Ok(released > 0)
    }
}

/// Checks whether a lock exists for `cust_id` without attempting to acquire
/// it (`CustID.check_lock_exists`).
pub async fn lock_exists(mut conn: ConnectionManager, cust_id: &str) -> Result<bool, LockError> {
    Ok(conn.exists(lock_key(cust_id)).await?)
}

/// Force-clears a stuck lock, bypassing the token check. Operator escape
/// hatch only — pipelines should always go through `release`.
pub async fn clear_lock(mut conn: ConnectionManager, cust_id: &str) -> Result<(), LockError> {
    let _: () = conn.del(lock_key(cust_id)).await?;
    Ok(())
}
