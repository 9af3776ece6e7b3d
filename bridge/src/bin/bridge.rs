use anyhow::Context;
use anyhow::Result;
use bridge::adapters::ClientAdapters;
use bridge::adapters::ReqwestLnurlResolver;
use bridge::cli::Opts;
use bridge::config::BridgeConfig;
use bridge::logger;
use std::backtrace::Backtrace;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::metadata::LevelFilter;

#[tokio::main]
async fn main() -> Result<()> {
    std::panic::set_hook(
        #[allow(clippy::print_stderr)]
        Box::new(|info| {
            let backtrace = Backtrace::force_capture();
            tracing::error!(%info, "aborting after panic in task");
            eprintln!("{backtrace}");
            std::process::abort()
        }),
    );

    let opts = Opts::read();
    logger::init_tracing(LevelFilter::DEBUG, opts.json, opts.tokio_console)?;

    let config = BridgeConfig::from_opts(&opts).context("invalid configuration")?;
    tracing::info!(network = ?config.network, server_account = %config.hive.server_account, "starting bridge");

    let adapters = ClientAdapters {
        hive: unimplemented_adapter::hive(),
        lnd: unimplemented_adapter::lnd(),
        exchange: unimplemented_adapter::exchange(),
        quote_sources: Vec::new(),
        lnurl_resolver: Arc::new(ReqwestLnurlResolver::new()),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(bridge::wait_for_shutdown_signal(shutdown_tx));

    match bridge::run(config, adapters, shutdown_rx).await {
        Ok(()) => {
            tracing::info!("bridge exited cleanly");
            Ok(())
        }
        Err(err) => {
            tracing::error!("bridge exited with a fatal error: {err:#}");
            std::process::exit(1);
        }
    }
}

/// SPEC_FULL.md §1/§6 name the Hive, LND and exchange clients as traits
/// the core depends on but never implements — there is no in-scope
/// adapter to construct here. An operator wires a real implementation of
/// each (a Hive RPC client, an LND gRPC client, an exchange REST client)
/// before running this binary; these stand-ins exist only so the binary
/// links, and panic immediately if ever reached.
mod unimplemented_adapter {
    use exchange::ExchangeClient;
    use hive_ingest::HiveClient;
    use lnd_ingest::LndClient;
    use std::sync::Arc;

    pub fn hive() -> Arc<dyn HiveClient> {
        Arc::new(Unwired)
    }

    pub fn lnd() -> Arc<dyn LndClient> {
        Arc::new(Unwired)
    }

    pub fn exchange() -> Arc<dyn ExchangeClient> {
        Arc::new(Unwired)
    }

    struct Unwired;

    #[async_trait::async_trait]
    impl HiveClient for Unwired {
        async fn run_block_stream(
            &self,
            _start_block: Option<u64>,
            _tx: tokio::sync::mpsc::Sender<hive_ingest::HiveBlockEvent>,
            _shutdown: tokio::sync::watch::Receiver<bool>,
        ) -> anyhow::Result<()> {
            anyhow::bail!("no HiveClient wired; supply one in main() before running")
        }

        async fn broadcast_transfer(&self, _to: &str, _amount: &ledger_commons::Amount, _memo: &str, _nobroadcast: bool) -> anyhow::Result<String> {
            anyhow::bail!("no HiveClient wired; supply one in main() before running")
        }

        async fn broadcast_custom_json(&self, _json_id: &str, _json_data: &serde_json::Value, _nobroadcast: bool) -> anyhow::Result<String> {
            anyhow::bail!("no HiveClient wired; supply one in main() before running")
        }

        async fn account_balances(&self, _account: &str) -> anyhow::Result<std::collections::HashMap<ledger_commons::Currency, rust_decimal::Decimal>> {
            anyhow::bail!("no HiveClient wired; supply one in main() before running")
        }
    }

    #[async_trait::async_trait]
    impl LndClient for Unwired {
        async fn subscribe_invoices(&self, _tx: tokio::sync::mpsc::Sender<lnd_ingest::InvoiceEvent>, _shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
            anyhow::bail!("no LndClient wired; supply one in main() before running")
        }

        async fn subscribe_htlc_events(&self, _tx: tokio::sync::mpsc::Sender<lnd_ingest::HtlcEvent>, _shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
            anyhow::bail!("no LndClient wired; supply one in main() before running")
        }

        async fn subscribe_payments(&self, _tx: tokio::sync::mpsc::Sender<lnd_ingest::PaymentEvent>, _shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
            anyhow::bail!("no LndClient wired; supply one in main() before running")
        }

        async fn send_payment(&self, _bolt11: &str, _fee_limit_msat: i64) -> anyhow::Result<lnd_ingest::PaymentEvent> {
            anyhow::bail!("no LndClient wired; supply one in main() before running")
        }

        async fn create_invoice(&self, _value_msat: i64, _memo: &str, _expiry_seconds: u32) -> anyhow::Result<String> {
            anyhow::bail!("no LndClient wired; supply one in main() before running")
        }

        async fn balances(&self) -> anyhow::Result<lnd_ingest::LndBalances> {
            anyhow::bail!("no LndClient wired; supply one in main() before running")
        }
    }

    #[async_trait::async_trait]
    impl ExchangeClient for Unwired {
        async fn place_market_order(&self, _symbol: &str, _side: exchange::OrderSide, _base_qty: rust_decimal::Decimal) -> anyhow::Result<exchange::ExchangeOrderResult> {
            anyhow::bail!("no ExchangeClient wired; supply one in main() before running")
        }

        async fn balance(&self, _asset: &str) -> anyhow::Result<rust_decimal::Decimal> {
            anyhow::bail!("no ExchangeClient wired; supply one in main() before running")
        }
    }
}
