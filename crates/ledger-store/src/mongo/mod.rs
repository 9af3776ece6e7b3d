//! Mongo-backed repositories, one per collection named in SPEC_FULL.md §6.4.
//!
//! Each repository exposes only the operations SPEC_FULL.md documents for
//! its collection, following the CRUD-module shape of
//! `coordinator/src/orderbook/db/orders.rs` (`all`, `insert`, `update`,
//! `get_with_id`, `delete_with_id` as plain functions taking a connection
//! handle) adapted from Diesel's query DSL to `mongodb::Collection<T>`'s
//! `find`/`insert_one`/`update_one(upsert)`/`find_one`/`delete_one`.

mod lnd_balances;
mod ledger;
mod ops;
mod pending_txns;
mod rates;

pub use crate::mongo::ledger::*;
pub use crate::mongo::lnd_balances::*;
pub use crate::mongo::ops::*;
pub use crate::mongo::pending_txns::*;
pub use crate::mongo::rates::*;

use crate::cache::LedgerCache;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::Client;
use mongodb::Database;
use mongodb::IndexModel;

/// Handle to the Mongo database backing the bridge. Cheap to clone: the
/// underlying `mongodb::Client` is itself an internally pooled handle, the
/// closest analogue to the `r2d2::Pool` the reference coordinator threads
/// through every task in `main.rs`.
#[derive(Clone)]
pub struct Db {
    database: Database,
    cache: Option<LedgerCache>,
}

impl Db {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, mongodb::error::Error> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            database: client.database(db_name),
            cache: None,
        })
    }

    /// Attaches a balance cache invalidated on every ledger write
    /// (SPEC_FULL.md §4.D). Without this, `ledger()` repositories save
    /// without ever invalidating — the right posture for a throwaway test
    /// database that never shares a cache with a real deployment.
    pub fn with_cache(mut self, cache: LedgerCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn ops(&self) -> OpsRepository {
        OpsRepository::new(&self.database)
    }

    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(&self.database, self.cache.clone())
    }

    pub fn rates(&self) -> RatesRepository {
        RatesRepository::new(&self.database)
    }

    pub fn pending(&self) -> PendingRepository {
        PendingRepository::new(&self.database)
    }

    pub fn lnd_balances(&self) -> LndBalancesRepository {
        LndBalancesRepository::new(&self.database)
    }

    /// A raw handle to a named collection, for the change-stream monitor
    /// (SPEC_FULL.md §4.I), which watches collections by name rather than
    /// through a typed repository.
    pub fn raw_collection(&self, name: &str) -> mongodb::Collection<mongodb::bson::Document> {
        self.database.collection(name)
    }

    /// Creates every index named in SPEC_FULL.md §6.4. Idempotent — the
    /// closest Mongo analogue to the reference coordinator's
    /// `run_migration(&mut conn)`, run once at startup.
    pub async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        self.ops().ensure_indexes().await?;
        self.ledger().ensure_indexes().await?;
        self.rates().ensure_indexes().await?;
        self.pending().ensure_indexes().await?;
        self.lnd_balances().ensure_indexes().await?;
        Ok(())
    }
}

fn unique_index(field: &str) -> IndexModel {
    IndexModel::builder()
        .keys(doc! { field: 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn plain_index(fields: impl IntoIterator<Item = (String, i32)>) -> IndexModel {
    let mut keys = mongodb::bson::Document::new();
    for (field, dir) in fields {
        keys.insert(field, dir);
    }
    IndexModel::builder().keys(keys).build()
}
