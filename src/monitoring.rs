use crate::error::DashboardError;
use anyhow::Result;
use metrics::{Counter, Gauge, counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

// Global metrics
pub static CHANNEL_MESSAGES_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("kaspazof_channel_messages_total"));
pub static DECODE_FAILURE_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("kaspazof_channel_decode_failures_total"));
pub static HANDLER_FAILURE_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("kaspazof_handler_failures_total"));
pub static RECONNECT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("kaspazof_reconnects_total"));
pub static REFRESH_TICK_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("kaspazof_refresh_ticks_total"));
pub static API_REQUEST_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("kaspazof_api_requests_total"));
pub static API_FAILURE_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("kaspazof_api_failures_total"));
pub static CONNECTED_GAUGE: LazyLock<Gauge> =
    LazyLock::new(|| gauge!("kaspazof_channel_connected"));

pub async fn setup_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "kaspazof-dashboard")
        .add_global_label("version", env!("CARGO_PKG_VERSION"));

    match builder.install() {
        Ok(()) => {
            info!(
                "Prometheus metrics server started on http://{}/metrics",
                addr
            );

            CHANNEL_MESSAGES_COUNTER.absolute(0);
            DECODE_FAILURE_COUNTER.absolute(0);
            HANDLER_FAILURE_COUNTER.absolute(0);
            RECONNECT_COUNTER.absolute(0);
            REFRESH_TICK_COUNTER.absolute(0);
            API_REQUEST_COUNTER.absolute(0);
            API_FAILURE_COUNTER.absolute(0);
            CONNECTED_GAUGE.set(0.0);

            Ok(())
        }
        Err(e) => {
            error!("Failed to start metrics server: {}", e);
            Err(DashboardError::MetricsError(e.to_string()).into())
        }
    }
}
