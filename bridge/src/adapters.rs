//! The external systems `bridge::run` is wired against, grounded on
//! SPEC_FULL.md §6: Hive, LND and the exchange venue are each a consumed
//! trait with no in-scope implementation (an operator supplies one), while
//! LNURL/Lightning-address resolution (§6.3) names reqwest plus a bech32
//! decode as its default implementation, so that one adapter is concrete
//! here.

use exchange::ExchangeClient;
use hive_ingest::HiveClient;
use lnd_ingest::LndClient;
use ledger_commons::QuoteSource;
use pipelines::LnurlResolver;
use std::sync::Arc;

/// Every external dependency `bridge::run` needs, bundled so `main` builds
/// it once and hands it down instead of threading five separate `Arc`s
/// through every supervisor.
pub struct ClientAdapters {
    pub hive: Arc<dyn HiveClient>,
    pub lnd: Arc<dyn LndClient>,
    pub exchange: Arc<dyn ExchangeClient>,
    pub quote_sources: Vec<Arc<dyn QuoteSource>>,
    pub lnurl_resolver: Arc<dyn LnurlResolver>,
}

/// Resolves a Lightning address or bech32 LNURL to a payable bolt11 by
/// following the two-step `.well-known/lnurlp` flow `lnurl_decode.py`'s
/// `decode_any_lightning_string` performs over HTTP: a GET to the payer's
/// metadata endpoint, then a GET to the returned `callback` with `amount`
/// and `comment` to obtain the invoice.
pub struct ReqwestLnurlResolver {
    http: reqwest::Client,
}

impl ReqwestLnurlResolver {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    fn metadata_url(destination: &str) -> anyhow::Result<String> {
        if let Some((user, domain)) = destination.split_once('@') {
            return Ok(format!("https://{domain}/.well-known/lnurlp/{user}"));
        }

        let (hrp, data) = bech32::decode(destination).map_err(|e| anyhow::anyhow!("invalid lnurl: {e}"))?;
        anyhow::ensure!(hrp == "lnurl", "unexpected lnurl human-readable part: {hrp}");
        let bytes = bech32::FromBase32::from_base32(&data).map_err(|e| anyhow::anyhow!("invalid lnurl payload: {e}"))?;
        String::from_utf8(bytes).map_err(|e| anyhow::anyhow!("lnurl payload is not utf-8: {e}"))
    }
}

#[derive(serde::Deserialize)]
struct LnurlPayResponse {
    callback: String,
}

#[derive(serde::Deserialize)]
struct LnurlCallbackResponse {
    pr: String,
}

#[async_trait::async_trait]
impl LnurlResolver for ReqwestLnurlResolver {
    async fn resolve(&self, destination: &str, msats: i64, comment: &str) -> anyhow::Result<String> {
        let metadata_url = Self::metadata_url(destination)?;
        let pay_response: LnurlPayResponse = self.http.get(&metadata_url).send().await?.error_for_status()?.json().await?;

        let callback: LnurlCallbackResponse = self
            .http
            .get(&pay_response.callback)
            .query(&[("amount", msats.to_string()), ("comment", comment.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(callback.pr)
    }
}
