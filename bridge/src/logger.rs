//! Tracing initialization, grounded on the reference `main.rs`'s
//! `logger::init_tracing(LevelFilter::DEBUG, opts.json, opts.tokio_console)`
//! call and its `tracing-subscriber` feature set (`fmt`, `ansi`,
//! `env-filter`, `time`, `tracing-log`, `json`).

use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn init_tracing(level: LevelFilter, json_format: bool, tokio_console: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    if json_format {
        let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);
        if tokio_console {
            registry.with(fmt_layer).with(console_subscriber::spawn()).try_init()?;
        } else {
            registry.with(fmt_layer).try_init()?;
        }
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_ansi(true).with_target(true);
        if tokio_console {
            registry.with(fmt_layer).with(console_subscriber::spawn()).try_init()?;
        } else {
            registry.with(fmt_layer).try_init()?;
        }
    }

    Ok(())
}
