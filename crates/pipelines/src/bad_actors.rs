//! Per-customer deny-list and dev-mode allowlist, consulted by §4.M.1's and
//! §4.M.3's preconditions (SPEC_FULL.md §3.R). Grounded on
//! `original_source/.../helpers/bad_actors_list.py`, dropped from the
//! distillation's component table but required by those preconditions.

use ledger_commons::BridgeError;
use ledger_commons::PolicyReason;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashSet;
use std::time::Duration;

const BAD_ACTOR_CACHE_KEY: &str = "bad_actors:list";
const BAD_ACTOR_CACHE_TTL: Duration = Duration::from_secs(300);

/// One entry on the deny-list.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BadActorEntry {
    pub cust_id: String,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: time::OffsetDateTime,
}

/// A source of truth for the deny-list, fetched periodically by a caller
/// outside this crate's scope and cached here. Specified only by the
/// operation this crate invokes on it, same as `HiveClient`/`ExchangeClient`.
#[async_trait::async_trait]
pub trait BadActorSource: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<Vec<BadActorEntry>>;
}

/// Redis-backed cache in front of a [`BadActorSource`]. A cache miss that
/// also fails to refresh from the source fails **closed**: SPEC_FULL.md
/// §3.R classifies an unreachable bad-actor source as a Policy-class
/// precondition, so `is_bad_actor` returns an error rather than silently
/// treating the customer as clean.
pub struct BadActorList<S> {
    source: S,
    redis: ConnectionManager,
}

impl<S: BadActorSource> BadActorList<S> {
    pub fn new(source: S, redis: ConnectionManager) -> Self {
        Self { source, redis }
    }

    /// Returns the reason a customer is listed, or `None` if they are not.
    pub async fn check(&mut self, cust_id: &str) -> Result<Option<String>, BridgeError> {
        let entries = self.entries().await?;
        Ok(entries
            .into_iter()
            .find(|e| e.cust_id == cust_id)
            .map(|e| e.reason))
    }

    /// Enforces the bad-actor precondition, returning
    /// [`PolicyReason::BadActor`] if the customer is listed.
    pub async fn enforce(&mut self, group_id: &str, cust_id: &str) -> Result<(), BridgeError> {
        if let Some(reason) = self.check(cust_id).await? {
            return Err(BridgeError::policy(
                group_id,
                cust_id,
                PolicyReason::BadActor {
                    cust_id: cust_id.to_string(),
                    reason,
                },
            ));
        }
        Ok(())
    }

    async fn entries(&mut self) -> Result<Vec<BadActorEntry>, BridgeError> {
        let cached: Option<String> = self.redis.get(BAD_ACTOR_CACHE_KEY).await.map_err(|e| {
            BridgeError::Transient {
                group_id: None,
                cust_id: None,
                message: format!("bad-actor cache read failed: {e}"),
            }
        })?;

        if let Some(raw) = cached {
            if let Ok(entries) = serde_json::from_str::<Vec<BadActorEntry>>(&raw) {
                return Ok(entries);
            }
        }

        let fetched = self.source.fetch().await.map_err(|e| BridgeError::Policy {
            group_id: None,
            cust_id: None,
            reason: PolicyReason::SourceUnreachable {
                detail: e.to_string(),
            },
        })?;

        if let Ok(serialized) = serde_json::to_string(&fetched) {
            let _: Result<(), _> = self
                .redis
                .set_ex(BAD_ACTOR_CACHE_KEY, serialized, BAD_ACTOR_CACHE_TTL.as_secs())
                .await;
        }

        Ok(fetched)
    }
}

/// Gate consulted only when the running network is non-production
/// (SPEC_FULL.md §3.R), mirroring the reference `Network` enum's
/// conditional gating.
#[derive(Debug, Clone, Default)]
pub struct DevAllowlist {
    allowed: HashSet<String>,
}

impl DevAllowlist {
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn enforce(&self, is_production: bool, group_id: &str, cust_id: &str) -> Result<(), BridgeError> {
        if is_production || self.allowed.contains(cust_id) {
            return Ok(());
        }
        Err(BridgeError::policy(
            group_id,
            cust_id,
            PolicyReason::NotAllowlisted {
                cust_id: cust_id.to_string(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_network_skips_allowlist_check() {
        let list = DevAllowlist::default();
        assert!(list.enforce(true, "g1", "anyone").is_ok());
    }

    #[test]
    fn non_production_rejects_unlisted_customer() {
        let list = DevAllowlist::new(["alice".to_string()]);
        assert!(list.enforce(false, "g1", "bob").is_err());
        assert!(list.enforce(false, "g1", "alice").is_ok());
    }
}
