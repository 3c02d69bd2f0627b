use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "kaspazof",
    about = "realtime terminal dashboard for the kaspazof backend: prices, node status, wallets, mining and news",
    version
)]
pub struct Args {
    /// REST api root of the backend
    #[arg(long, default_value = "http://localhost:8000/api/v1")]
    pub api_url: String,

    /// WebSocket endpoint for realtime updates
    #[arg(short, long, default_value = "ws://localhost:8000/ws")]
    pub ws_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "10")]
    pub request_timeout: u64,

    /// Fixed delay between reconnection attempts in seconds
    #[arg(long, default_value = "5")]
    pub reconnect_delay: u64,

    /// Maximum number of reconnection attempts (0 for unlimited)
    #[arg(long, default_value = "5")]
    pub max_reconnects: u32,

    /// Dashboard polling interval in seconds
    #[arg(long, default_value = "30")]
    pub dashboard_refresh: u64,

    /// News feed refresh interval in seconds
    #[arg(long, default_value = "900")]
    pub news_refresh: u64,

    /// Simulated mining tick in seconds
    #[arg(long, default_value = "2")]
    pub mining_tick: u64,

    /// Days of price history shown in the charts section
    #[arg(long, default_value = "7")]
    pub history_days: u32,

    /// Section shown at startup (dashboard, wallet, mining, charts, news, node-info)
    #[arg(short, long, default_value = "dashboard")]
    pub section: String,

    /// Disable colored output (useful for piping to files)
    #[arg(long)]
    pub no_color: bool,

    /// Quiet mode - only errors and section output
    #[arg(long)]
    pub quiet: bool,
}
