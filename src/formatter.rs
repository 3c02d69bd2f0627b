/// file: src/formatter.rs
/// description: text rendering of section snapshots and the value formats they share
use crate::{
    charts::{ChartSnapshot, SeriesSource},
    dashboard::{DashboardSnapshot, NetworkStats, Widget},
    mining::MiningSnapshot,
    news::{NewsFilter, NewsItem, NewsSnapshot},
    types::{NodeInfo, PriceData, SystemInfo},
    wallet::WalletSnapshot,
};
use chrono::{DateTime, Utc};

// ANSI color codes
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";

    pub const WHITE: &'static str = "\x1b[37m";
    pub const GRAY: &'static str = "\x1b[90m";

    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_BLUE: &'static str = "\x1b[94m";
    pub const BRIGHT_MAGENTA: &'static str = "\x1b[95m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
}

pub fn format_price(value: f64) -> String {
    format!("{value:.6}")
}

pub fn format_change(percent: f64) -> String {
    if percent >= 0.0 {
        format!("+{percent:.2}%")
    } else {
        format!("{percent:.2}%")
    }
}

/// `3d 4h 5m`, `4h 5m` or `5m`.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// `hh:mm:ss`; hours are not wrapped at 24.
pub fn format_mining_uptime(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3_600,
        (seconds % 3_600) / 60,
        seconds % 60
    )
}

pub fn format_hashrate(hashes_per_second: f64) -> String {
    const UNITS: [&str; 5] = ["H/s", "KH/s", "MH/s", "GH/s", "TH/s"];
    let mut value = hashes_per_second;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Keeps the first and last ten characters of long addresses.
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 20 {
        return address.to_string();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 10..].iter().collect();
    format!("{head}...{tail}")
}

pub fn format_time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds();
    match seconds {
        s if s < 60 => "Just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s if s < 604_800 => format!("{}d ago", s / 86_400),
        _ => at.format("%Y-%m-%d").to_string(),
    }
}

fn format_millions(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("${v:.2}M"))
}

/// Renders snapshots to lines of text. Colors are optional so output can
/// be piped.
pub struct SectionFormatter {
    colored: bool,
}

impl SectionFormatter {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colored {
            format!("{color}{text}{}", Colors::RESET)
        } else {
            text.to_string()
        }
    }

    pub fn title(&self, title: &str) -> String {
        let rule = "─".repeat(60);
        if self.colored {
            format!(
                "{}{}┌{rule}┐\n│ {:<58} │\n└{rule}┘{}",
                Colors::BOLD,
                Colors::BRIGHT_CYAN,
                title,
                Colors::RESET
            )
        } else {
            format!("┌{rule}┐\n│ {title:<58} │\n└{rule}┘")
        }
    }

    fn row(&self, label: &str, value: &str) -> String {
        format!("  {:<16} {}", self.paint(Colors::GRAY, label), value)
    }

    fn change(&self, percent: f64) -> String {
        let color = if percent >= 0.0 {
            Colors::BRIGHT_GREEN
        } else {
            Colors::BRIGHT_RED
        };
        self.paint(color, &format_change(percent))
    }

    fn failed(&self, message: &str) -> String {
        format!("  {}", self.paint(Colors::BRIGHT_RED, message))
    }

    fn widget<T>(&self, widget: &Widget<T>, ready: impl FnOnce(&T) -> Vec<String>) -> Vec<String> {
        match widget {
            Widget::Loading => vec![format!("  {}", self.paint(Colors::DIM, "Loading..."))],
            Widget::Ready(value) => ready(value),
            Widget::Failed(message) => vec![self.failed(message)],
        }
    }

    fn system_lines(&self, system: &SystemInfo) -> Vec<String> {
        let mut lines = vec![
            self.row("Environment", &system.environment),
            self.row("Version", &system.version),
            self.row("Uptime", &format_uptime(system.uptime)),
        ];
        for service in &system.services {
            let status = if service.status {
                self.paint(Colors::BRIGHT_GREEN, "Online")
            } else {
                self.paint(Colors::BRIGHT_RED, "Offline")
            };
            lines.push(self.row(&service.name, &status));
        }
        lines
    }

    fn price_lines(&self, price: &PriceData) -> Vec<String> {
        vec![
            self.row("USD", &format!("${}", format_price(price.kaspa_usd))),
            self.row("EUR", &format!("€{}", format_price(price.kaspa_eur))),
            self.row("24h", &self.change(price.change_24h)),
            self.row("Updated", &price.last_updated.format("%H:%M:%S").to_string()),
        ]
    }

    fn node_lines(&self, node: &NodeInfo) -> Vec<String> {
        let sync = if node.is_synced {
            self.paint(Colors::BRIGHT_GREEN, "Synced")
        } else {
            self.paint(Colors::BRIGHT_YELLOW, "Syncing")
        };
        let mut lines = vec![
            self.row("Sync Status", &sync),
            self.row("Block Count", &node.block_count.to_string()),
            self.row("Peers", &node.peer_count.to_string()),
            self.row("Network", &node.network.to_string()),
            self.row("Version", &node.version),
        ];
        if let Some(progress) = node.sync_progress {
            lines.push(self.row("Sync Progress", &format!("{progress:.1}%")));
        }
        lines
    }

    pub fn dashboard(&self, snapshot: &DashboardSnapshot) -> Vec<String> {
        let mut lines = vec![self.paint(Colors::BOLD, "System Status")];
        lines.extend(self.widget(&snapshot.system, |s| self.system_lines(s)));
        lines.push(self.paint(Colors::BOLD, "Kaspa Price"));
        lines.extend(self.widget(&snapshot.price, |p| self.price_lines(p)));
        lines.push(self.paint(Colors::BOLD, "Node Status"));
        lines.extend(self.widget(&snapshot.node, |n| self.node_lines(n)));
        lines.push(self.paint(Colors::BOLD, "Mining"));
        if snapshot.is_mining {
            let stats = &snapshot.mining;
            lines.push(self.row("Status", &self.paint(Colors::BRIGHT_GREEN, "Mining")));
            lines.push(self.row("Hashrate", &format_hashrate(stats.hashrate)));
            lines.push(self.row("Shares", &stats.shares.to_string()));
            lines.push(self.row("Uptime", &format_mining_uptime(stats.uptime)));
        } else {
            lines.push(format!("  {}", self.paint(Colors::DIM, "Mining Stopped")));
        }
        lines
    }

    pub fn network(&self, stats: &NetworkStats) -> Vec<String> {
        vec![
            self.row("Current Price", &format!("${}", format_price(stats.price_usd))),
            self.row("Market Cap", &format_millions(stats.market_cap_m)),
            self.row("24h Volume", &format_millions(stats.volume_24h_m)),
            self.row("Block Height", &stats.block_height.to_string()),
            self.row("Network", &stats.network.to_string()),
            self.row("Active Peers", &stats.peers.to_string()),
        ]
    }

    pub fn network_failed(&self) -> Vec<String> {
        vec![self.failed("Failed to load network statistics")]
    }

    pub fn wallets(&self, snapshot: &WalletSnapshot) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(error) = &snapshot.error {
            lines.push(self.failed(error));
        }
        if snapshot.wallets.is_empty() {
            lines.push(format!(
                "  {}",
                self.paint(
                    Colors::DIM,
                    snapshot.notice.as_deref().unwrap_or("No wallets found")
                )
            ));
            return lines;
        }
        lines.push(self.row("Total", &snapshot.total.to_string()));
        for wallet in &snapshot.wallets {
            let balance = wallet.balance.unwrap_or(0.0);
            lines.push(format!(
                "  {:<20} {} {:>14.8} KAS  [{}]",
                wallet.label,
                self.paint(Colors::BRIGHT_BLUE, &shorten_address(&wallet.address)),
                balance,
                wallet.status
            ));
        }
        lines
    }

    pub fn mining(&self, snapshot: &MiningSnapshot) -> Vec<String> {
        let status = if snapshot.is_mining {
            self.paint(Colors::BRIGHT_GREEN, "Mining")
        } else {
            self.paint(Colors::BRIGHT_YELLOW, "Stopped")
        };
        let stats = &snapshot.stats;
        let mut lines = vec![self.row("Status", &status)];
        if let Some(config) = &snapshot.config {
            lines.push(self.row("Pool", &config.pool));
            lines.push(self.row("Wallet", &shorten_address(&config.wallet)));
            lines.push(self.row(
                "Threads",
                &format!("{} ({})", config.threads, config.intensity),
            ));
        }
        lines.push(self.row("Hashrate", &format_hashrate(stats.hashrate)));
        lines.push(self.row("Shares", &stats.shares.to_string()));
        lines.push(self.row("Accepted", &stats.accepted.to_string()));
        lines.push(self.row("Rejected", &stats.rejected.to_string()));
        lines.push(self.row("Uptime", &format_mining_uptime(stats.uptime)));
        if !snapshot.history.is_empty() {
            lines.push(self.row("History", &sparkline(&snapshot.history)));
        }
        lines
    }

    pub fn chart(&self, snapshot: &ChartSnapshot) -> Vec<String> {
        let mut lines = vec![self.row("Period", &format!("{}d", snapshot.days))];
        if snapshot.source == SeriesSource::Simulated {
            lines.push(format!(
                "  {}",
                self.paint(Colors::BRIGHT_YELLOW, "Backend unavailable, showing simulated data")
            ));
        }
        let prices: Vec<f64> = snapshot.points.iter().map(|p| p.price).collect();
        if !prices.is_empty() {
            lines.push(self.row("Series", &sparkline(&prices)));
        }
        if let Some(stats) = snapshot.stats {
            lines.push(self.row("Current", &format!("${}", format_price(stats.current))));
            lines.push(self.row("Change", &self.change(stats.change_percent)));
            lines.push(self.row("High", &format!("${}", format_price(stats.high))));
            lines.push(self.row("Low", &format!("${}", format_price(stats.low))));
            lines.push(self.row("Average", &format!("${}", format_price(stats.average))));
        }
        lines
    }

    pub fn news(&self, snapshot: &NewsSnapshot, now: DateTime<Utc>) -> Vec<String> {
        let filter = match snapshot.filter {
            NewsFilter::All => "all".to_string(),
            NewsFilter::Only(category) => category.to_string(),
        };
        let mut lines = vec![self.row("Filter", &filter)];
        lines.extend(self.news_items(&snapshot.items, now));
        lines
    }

    pub fn news_items(&self, items: &[NewsItem], now: DateTime<Utc>) -> Vec<String> {
        if items.is_empty() {
            return vec![format!("  {}", self.paint(Colors::DIM, "No news found"))];
        }
        items
            .iter()
            .map(|item| {
                format!(
                    "  {} {}\n    {} · {} · {}",
                    self.paint(Colors::BRIGHT_MAGENTA, &format!("[{}]", item.category)),
                    self.paint(Colors::BOLD, &item.title),
                    self.paint(Colors::GRAY, &item.source),
                    format_time_ago(item.published_at, now),
                    self.paint(Colors::WHITE, &item.summary),
                )
            })
            .collect()
    }
}

fn sparkline(values: &[f64]) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    let (min, max) = values
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let span = max - min;
    values
        .iter()
        .map(|v| {
            if span <= f64::EPSILON {
                BARS[3]
            } else {
                let index = ((v - min) / span * (BARS.len() - 1) as f64).round() as usize;
                BARS[index.min(BARS.len() - 1)]
            }
        })
        .collect()
}
