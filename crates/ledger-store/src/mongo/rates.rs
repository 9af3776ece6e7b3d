//! The `rates_ts` time-series collection of [`Quote`] snapshots
//! (SPEC_FULL.md §3.7, §4.B, §6.4).

use futures::TryStreamExt;
use ledger_commons::Quote;
use ledger_commons::QuoteError;
use mongodb::bson::doc;
use mongodb::options::CreateCollectionOptions;
use mongodb::options::FindOptions;
use mongodb::options::TimeseriesGranularity;
use mongodb::options::TimeseriesOptions;
use mongodb::Collection;
use mongodb::Database;
use time::OffsetDateTime;

#[derive(Clone)]
pub struct RatesRepository {
    database: Database,
    collection: Collection<Quote>,
}

impl RatesRepository {
    pub(crate) fn new(db: &Database) -> Self {
        Self {
            database: db.clone(),
            collection: db.collection("rates_ts"),
        }
    }

    pub(crate) async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        // `rates_ts` is a time-series collection bucketed on `fetch_date`;
        // creation is idempotent-ignored if it already exists (Mongo
        // returns NamespaceExists, which is not itself an error condition
        // worth surfacing at startup).
        let ts_opts = TimeseriesOptions::builder()
            .time_field("fetch_date".to_string())
            .granularity(Some(TimeseriesGranularity::Seconds))
            .build();
        let create_opts = CreateCollectionOptions::builder()
            .timeseries(ts_opts)
            .build();
        if let Err(err) = self
            .database
            .create_collection("rates_ts", create_opts)
            .await
        {
            if !err.to_string().contains("already exists") {
                return Err(err);
            }
        }
        self.collection
            .create_index(super::plain_index([("source".to_string(), 1)]), None)
            .await?;
        Ok(())
    }

    pub async fn insert(&self, quote: &Quote) -> Result<(), mongodb::error::Error> {
        self.collection.insert_one(quote, None).await?;
        Ok(())
    }

    /// The quote whose `fetch_date` is nearest `at`, failing if the closest
    /// match falls outside `max_age` (SPEC_FULL.md §4.B's `nearest_quote`
    /// contract).
    pub async fn nearest_quote(
        &self,
        at: OffsetDateTime,
        max_age: time::Duration,
    ) -> Result<Quote, QuoteError> {
        let window_start = at - max_age;
        let window_end = at + max_age;
        let filter = doc! {
            "fetch_date": {
                "$gte": mongodb::bson::DateTime::from_system_time(window_start.into()),
                "$lte": mongodb::bson::DateTime::from_system_time(window_end.into()),
            }
        };
        let opts = FindOptions::builder()
            .sort(doc! { "fetch_date": 1 })
            .build();
        let candidates: Vec<Quote> = self
            .collection
            .find(filter, opts)
            .await
            .map_err(|e| QuoteError::SourceFailed(ledger_commons::QuoteSourceKind::Merged, e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| QuoteError::SourceFailed(ledger_commons::QuoteSourceKind::Merged, e.to_string()))?;

        candidates
            .into_iter()
            .min_by_key(|q| (q.fetch_date - at).whole_milliseconds().unsigned_abs())
            .ok_or(QuoteError::QuoteNotFound)
    }

    pub async fn latest(&self) -> Result<Option<Quote>, mongodb::error::Error> {
        let opts = FindOptions::builder()
            .sort(doc! { "fetch_date": -1 })
            .limit(1)
            .build();
        let mut cursor = self.collection.find(doc! {}, opts).await?;
        Ok(cursor.try_next().await?)
    }
}
