//! Runtime settings (SPEC_FULL.md §2), assembled from [`crate::cli::Opts`].
//! Kept as a plain data struct — no trait objects — so it can be built,
//! logged and unit-tested without touching the network, mirroring the
//! reference coordinator's own `Settings`/`Opts` split in
//! `coordinator/src/bin/coordinator.rs`.

use crate::cli::Network;
use crate::cli::Opts;
use exchange::RebalanceBands;
use pipelines::ConversionFee;
use pipelines::RateLimitConfig;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub db_name: String,
}

#[derive(Debug, Clone)]
pub struct HiveConfig {
    pub server_account: String,
    pub start_block: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct FeeConfig {
    pub hive_to_keepsats: ConversionFee,
    pub keepsats_to_hive: ConversionFee,
}

#[derive(Debug, Clone, Copy)]
pub struct LightningLimits {
    pub min_payment_sats: i64,
    pub max_fee_ppm: i64,
    pub dust_threshold_sats: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct LockConfig {
    pub lease: Duration,
    pub blocking_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BadActorConfig {
    pub fail_closed: bool,
    pub dev_allowlist: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub network: Network,
    pub mongo: MongoConfig,
    pub redis_uri: String,
    pub hive: HiveConfig,
    pub fees: FeeConfig,
    pub lightning: LightningLimits,
    pub lock: LockConfig,
    pub rebalance: RebalanceBands,
    pub bad_actor: BadActorConfig,
    pub rate_limit: RateLimitConfig,
    pub metrics_addr: SocketAddr,
}

/// Parses a single `hours:sats` flag value, e.g. `"24:1000000"`.
fn parse_window(raw: &str) -> anyhow::Result<(i64, i64)> {
    let (hours, sats) = raw
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("rate-limit window {raw:?} must be formatted hours:sats"))?;
    Ok((hours.parse()?, sats.parse()?))
}

impl BridgeConfig {
    pub fn from_opts(opts: &Opts) -> anyhow::Result<Self> {
        Ok(Self {
            network: opts.network,
            mongo: MongoConfig {
                uri: opts.mongo_uri.clone(),
                db_name: opts.mongo_db.clone(),
            },
            redis_uri: opts.redis_uri.clone(),
            hive: HiveConfig {
                server_account: opts.server_account.clone(),
                start_block: opts.start_block,
            },
            fees: FeeConfig {
                hive_to_keepsats: ConversionFee(Decimal::from_str(&opts.hive_to_keepsats_fee)?),
                keepsats_to_hive: ConversionFee(Decimal::from_str(&opts.keepsats_to_hive_fee)?),
            },
            lightning: LightningLimits {
                min_payment_sats: opts.min_payment_sats,
                max_fee_ppm: opts.max_fee_ppm,
                dust_threshold_sats: opts.dust_threshold_sats,
            },
            lock: LockConfig {
                lease: Duration::from_secs(opts.lock_lease_secs),
                blocking_timeout: Duration::from_secs(opts.lock_blocking_timeout_secs),
            },
            rebalance: RebalanceBands {
                lower_hive: Decimal::from_str(&opts.rebalance_lower_hive)?,
                upper_hive: Decimal::from_str(&opts.rebalance_upper_hive)?,
                target_hive: Decimal::from_str(&opts.rebalance_target_hive)?,
            },
            bad_actor: BadActorConfig {
                fail_closed: opts.bad_actor_fail_closed,
                dev_allowlist: opts.dev_allowlist.clone(),
            },
            rate_limit: RateLimitConfig {
                windows: opts
                    .rate_limit_window
                    .iter()
                    .map(|raw| parse_window(raw))
                    .collect::<anyhow::Result<Vec<_>>>()?,
            },
            metrics_addr: opts.metrics_addr.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn from_opts_parses_decimal_fields() {
        let opts = Opts::parse_from(["bridge"]);
        let config = BridgeConfig::from_opts(&opts).unwrap();
        assert_eq!(config.fees.hive_to_keepsats.0, Decimal::from_str("0.01").unwrap());
        assert_eq!(config.rebalance.target_hive, Decimal::from_str("3000").unwrap());
    }

    #[test]
    fn from_opts_parses_rate_limit_windows() {
        let opts = Opts::parse_from(["bridge"]);
        let config = BridgeConfig::from_opts(&opts).unwrap();
        assert_eq!(config.rate_limit.windows, vec![(24, 1_000_000), (720, 10_000_000)]);
    }

    #[test]
    fn from_opts_parses_the_metrics_address() {
        let opts = Opts::parse_from(["bridge", "--metrics-addr", "0.0.0.0:9100"]);
        let config = BridgeConfig::from_opts(&opts).unwrap();
        assert_eq!(config.metrics_addr.port(), 9100);
    }

    #[test]
    fn from_opts_rejects_a_malformed_rate_limit_window() {
        let opts = Opts::parse_from(["bridge", "--rate-limit-window", "not-a-window"]);
        assert!(BridgeConfig::from_opts(&opts).is_err());
    }
}
