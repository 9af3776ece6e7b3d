//! CLI surface (SPEC_FULL.md §6.5), grounded on `coordinator/src/cli.rs`:
//! a flat `clap::Parser` struct with one flag per runtime setting and a
//! `Network` enum gating production-only policy (§4.R's dev allowlist).

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Opts {
    /// Mongo connection string backing the ledger/ops/rates/pending stores.
    #[clap(long, default_value = "mongodb://localhost:27017")]
    pub mongo_uri: String,

    /// Mongo database name.
    #[clap(long, default_value = "bridge")]
    pub mongo_db: String,

    /// Redis connection string backing locks, caches and resume tokens.
    #[clap(long, default_value = "redis://localhost:6379")]
    pub redis_uri: String,

    /// Hive account this bridge custodies deposits under.
    #[clap(long, default_value = "v4vapp")]
    pub server_account: String,

    /// Hive block height to resume streaming from; 0 resumes from the
    /// last persisted block counter.
    #[clap(long, default_value_t = 0)]
    pub start_block: u64,

    #[clap(value_enum, long, default_value = "testnet")]
    pub network: Network,

    /// If enabled, logs are emitted as JSON instead of the default
    /// human-readable format.
    #[clap(short, long)]
    pub json: bool,

    /// If enabled, the tokio runtime can be locally debugged with
    /// `tokio-console`.
    #[clap(long)]
    pub tokio_console: bool,

    /// Fee charged on a HIVE/HBD → Keepsats conversion, as a fraction of
    /// principal (e.g. 0.01 for 1%).
    #[clap(long, default_value = "0.01")]
    pub hive_to_keepsats_fee: String,

    /// Fee charged on a Keepsats → HIVE/HBD withdrawal.
    #[clap(long, default_value = "0.01")]
    pub keepsats_to_hive_fee: String,

    /// Smallest Lightning payment this bridge will attempt, in sats.
    #[clap(long, default_value_t = 10)]
    pub min_payment_sats: i64,

    /// Ceiling on Lightning routing fee, in parts-per-million of the
    /// payment amount.
    #[clap(long, default_value_t = 5_000)]
    pub max_fee_ppm: i64,

    /// Below this many sats, a change/refund reply is absorbed rather
    /// than sent (SPEC_FULL.md §4.M.1).
    #[clap(long, default_value_t = 10)]
    pub dust_threshold_sats: i64,

    /// Customer lock lease, in seconds.
    #[clap(long, default_value_t = 30)]
    pub lock_lease_secs: u64,

    /// How long a customer lock acquisition blocks before giving up, in
    /// seconds.
    #[clap(long, default_value_t = 30)]
    pub lock_blocking_timeout_secs: u64,

    /// Lower Hive inventory band edge the exchange rebalancer defends.
    #[clap(long, default_value = "1000")]
    pub rebalance_lower_hive: String,

    /// Upper Hive inventory band edge the exchange rebalancer defends.
    #[clap(long, default_value = "5000")]
    pub rebalance_upper_hive: String,

    /// Hive inventory level a rebalance order sizes back to.
    #[clap(long, default_value = "3000")]
    pub rebalance_target_hive: String,

    /// Fails HIVE→Lightning pipelines closed when the bad-actor source is
    /// unreachable rather than allowing them through (SPEC_FULL.md §4.R).
    #[clap(long, default_value_t = true)]
    pub bad_actor_fail_closed: bool,

    /// Customer ids exempt from the bad-actor/allowlist gate when
    /// `network` is non-production (SPEC_FULL.md §4.R).
    #[clap(long)]
    pub dev_allowlist: Vec<String>,

    /// Outbound Lightning rate-limit windows, each `hours:sats` (e.g.
    /// `24:1000000`); repeat the flag for multiple windows (SPEC_FULL.md
    /// §4.L). Defaults to a 24h/1,000,000 sat and 720h/10,000,000 sat pair.
    #[clap(long, default_values_t = ["24:1000000".to_string(), "720:10000000".to_string()])]
    pub rate_limit_window: Vec<String>,

    /// Address the Prometheus metrics endpoint listens on (SPEC_FULL.md
    /// §1.A).
    #[clap(long, default_value = "127.0.0.1:9091")]
    pub metrics_addr: String,

    /// Optional path to a TOML settings file overlaying the flags above.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn is_production(&self) -> bool {
        matches!(self, Network::Mainnet)
    }
}

impl Opts {
    pub fn read() -> Opts {
        Opts::parse()
    }
}
