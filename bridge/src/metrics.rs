//! Operator-facing metrics surface (SPEC_FULL.md §1.A): counters for
//! ledger entries posted per `ledger_type`, a pending-queue depth gauge,
//! per-supervisor last-event-age gauges, and a balance-sheet-imbalance
//! gauge. Wires `autometrics` + `opentelemetry-prometheus` + `prometheus`
//! the way the reference coordinator's `bin/coordinator.rs` does —
//! `autometrics::prometheus_exporter::init()` plus an OTel meter provider
//! bridged into a Prometheus registry — except the registry is served
//! from a small plain-text endpoint this crate owns outright rather than
//! riding along on an existing web framework, since §1 excludes a
//! user-facing web API everywhere except this ambient export path.

use opentelemetry::sdk::export::metrics::aggregation;
use opentelemetry::sdk::metrics::controllers;
use opentelemetry::sdk::metrics::processors;
use opentelemetry::sdk::metrics::selectors;
use opentelemetry::global;
use prometheus::Encoder;
use prometheus::GaugeVec;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Gauge;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Owns every metric this bridge exports, registered onto the same
/// `prometheus::Registry` the OTel exporter gathers from, so one endpoint
/// serves both the automatic `#[autometrics]` series and these explicit
/// business gauges/counters.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    ledger_entries_posted: IntCounterVec,
    pending_queue_depth: IntGauge,
    supervisor_last_event_age_seconds: GaugeVec,
    balance_sheet_imbalanced: Gauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let ledger_entries_posted = IntCounterVec::new(
            Opts::new("ledger_entries_posted_total", "Ledger entries posted, by ledger_type"),
            &["ledger_type"],
        )?;
        let pending_queue_depth = IntGauge::new("pending_queue_depth", "Active records in the pending-resend queue")?;
        let supervisor_last_event_age_seconds = GaugeVec::new(
            Opts::new("supervisor_last_event_age_seconds", "Seconds since a supervisor last observed an event"),
            &["supervisor"],
        )?;
        let balance_sheet_imbalanced = Gauge::new("balance_sheet_imbalanced", "1 if the last sanity pass found assets != liabilities + equity, else 0")?;

        registry.register(Box::new(ledger_entries_posted.clone()))?;
        registry.register(Box::new(pending_queue_depth.clone()))?;
        registry.register(Box::new(supervisor_last_event_age_seconds.clone()))?;
        registry.register(Box::new(balance_sheet_imbalanced.clone()))?;

        Ok(Self {
            registry,
            ledger_entries_posted,
            pending_queue_depth,
            supervisor_last_event_age_seconds,
            balance_sheet_imbalanced,
        })
    }

    pub fn record_ledger_entry(&self, ledger_type: &str) {
        self.ledger_entries_posted.with_label_values(&[ledger_type]).inc();
    }

    pub fn set_pending_queue_depth(&self, depth: i64) {
        self.pending_queue_depth.set(depth);
    }

    pub fn record_supervisor_heartbeat(&self, supervisor: &str, age_seconds: f64) {
        self.supervisor_last_event_age_seconds.with_label_values(&[supervisor]).set(age_seconds);
    }

    pub fn set_balance_sheet_imbalanced(&self, imbalanced: bool) {
        self.balance_sheet_imbalanced.set(if imbalanced { 1.0 } else { 0.0 });
    }

    /// Renders every registered family as Prometheus text exposition
    /// format, the body this module's HTTP endpoint returns verbatim.
    fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf)?;
        Ok(buf)
    }
}

/// Bridges an OpenTelemetry meter provider into `metrics`'s registry and
/// starts the `autometrics` exporter the reference coordinator's `main`
/// starts at the end of startup. `#[autometrics]`-annotated functions
/// elsewhere in this crate report through the OTel global meter this
/// installs.
pub fn init(metrics: &Metrics) -> anyhow::Result<()> {
    let controller = controllers::basic(
        processors::factory(
            selectors::simple::histogram([1.0, 2.0, 5.0, 10.0, 20.0, 50.0]),
            aggregation::cumulative_temporality_selector(),
        )
        .with_memory(true),
    )
    .build();
    let exporter = opentelemetry_prometheus::exporter(controller)
        .with_registry(metrics.registry.clone())
        .init();
    global::set_meter_provider(exporter.clone());
    autometrics::prometheus_exporter::init();
    Ok(())
}

/// Serves `metrics`'s registry as plain-text Prometheus exposition format
/// on `addr`, in a minimal hand-rolled responder rather than a web
/// framework — the one HTTP surface this bridge carries despite SPEC_FULL.md
/// §1's "no user-facing web API" non-goal, since exporting metrics is an
/// ambient concern, not a feature.
pub async fn serve(metrics: Metrics, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics endpoint listening");
    loop {
        let (mut socket, _) = listener.accept().await?;
        let metrics = metrics.clone();
        tokio::spawn(async move {
            let body = match metrics.encode() {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!("failed to encode metrics: {err}");
                    return;
                }
            };
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            if let Err(err) = socket.write_all(response.as_bytes()).await {
                tracing::debug!("metrics response write failed: {err}");
                return;
            }
            let _ = socket.write_all(&body).await;
        });
    }
}
