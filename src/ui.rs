/// file: src/ui.rs
/// description: terminal presentation; connection indicator and section views
use crate::{
    charts::ChartSnapshot,
    dashboard::{DashboardSnapshot, NetworkStats},
    events::{ChannelEvent, EventReceiver},
    formatter::{Colors, SectionFormatter},
    mining::MiningSnapshot,
    news::{NewsItem, NewsSnapshot},
    router::{Section, SectionView},
    wallet::WalletSnapshot,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::io::{self, Write};
use tracing::{debug, warn};

/// Drives the connection indicator from channel status events.
pub struct UIController {
    event_receiver: EventReceiver,
    colored: bool,
    quiet_mode: bool,
    connected: bool,
}

impl UIController {
    pub fn new(event_receiver: EventReceiver, colored: bool, quiet: bool) -> Self {
        Self {
            event_receiver,
            colored,
            quiet_mode: quiet,
            connected: false,
        }
    }

    /// Runs until every event sender is dropped.
    pub async fn run(&mut self) {
        while let Some(event) = self.event_receiver.recv().await {
            if let Some(line) = self.handle_event(&event) {
                println!("{line}");
            }
        }
        debug!("Status channel closed");
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Updates the indicator and returns the line to show, if any.
    pub fn handle_event(&mut self, event: &ChannelEvent) -> Option<String> {
        self.connected = event.is_connected();
        let (status, message) = match event {
            ChannelEvent::Connecting { url, attempt } => (
                "CONNECTING",
                if *attempt == 0 {
                    url.clone()
                } else {
                    format!("{url} (attempt {attempt})")
                },
            ),
            ChannelEvent::Connected { connection_id } => {
                ("CONNECTED", format!("ID: {connection_id}"))
            }
            ChannelEvent::ConnectionFailed(error) => ("ERROR", error.clone()),
            ChannelEvent::Disconnected { by_user: true } => {
                ("DISCONNECTED", "Connection closed".to_string())
            }
            ChannelEvent::Disconnected { by_user: false } => {
                ("DISCONNECTED", "Connection lost".to_string())
            }
            ChannelEvent::Reconnecting {
                attempt,
                max,
                delay,
            } => {
                let budget = if *max == 0 {
                    "unlimited".to_string()
                } else {
                    max.to_string()
                };
                (
                    "RECONNECTING",
                    format!("Retrying in {}s ({attempt}/{budget})", delay.as_secs()),
                )
            }
            ChannelEvent::GaveUp { attempts } => (
                "ERROR",
                format!("Gave up after {attempts} attempts, use 'connect' to retry"),
            ),
        };

        if self.quiet_mode && status != "ERROR" {
            return None;
        }
        Some(self.status_line(status, &message))
    }

    fn status_line(&self, status: &str, message: &str) -> String {
        let (color, symbol) = match status {
            "CONNECTING" | "RECONNECTING" => (Colors::BRIGHT_YELLOW, "*"),
            "CONNECTED" => (Colors::BRIGHT_GREEN, "+"),
            "DISCONNECTED" => (Colors::BRIGHT_RED, "X"),
            "ERROR" => (Colors::BRIGHT_RED, "!"),
            _ => (Colors::WHITE, "-"),
        };
        if self.colored {
            format!(
                "{}{}[{}]{} {} {}{}{}",
                Colors::BOLD,
                color,
                status,
                Colors::RESET,
                symbol,
                Colors::WHITE,
                message,
                Colors::RESET
            )
        } else {
            format!("[{status}] {symbol} {message}")
        }
    }
}

fn section_title(section: Section) -> &'static str {
    match section {
        Section::Dashboard => "Dashboard",
        Section::Wallet => "Wallets",
        Section::Mining => "Mining",
        Section::Charts => "Price Charts",
        Section::News => "News",
        Section::NodeInfo => "Kaspa Network",
    }
}

/// Writes sections to a terminal (or any writer in tests).
pub struct TerminalView {
    formatter: SectionFormatter,
    colored: bool,
    quiet: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalView {
    pub fn stdout(colored: bool, quiet: bool) -> Self {
        Self::with_writer(Box::new(io::stdout()), colored, quiet)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, colored: bool, quiet: bool) -> Self {
        Self {
            formatter: SectionFormatter::new(colored),
            colored,
            quiet,
            out: Mutex::new(out),
        }
    }

    fn emit(&self, lines: &[String]) {
        let mut out = self.out.lock();
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(out, "{line}"))
            .and_then(|_| out.flush());
        if let Err(e) = result {
            warn!("Failed to write to terminal: {}", e);
        }
    }

    pub fn notice(&self, message: &str) {
        if !self.quiet {
            self.emit(&[format!("  {message}")]);
        }
    }

    pub fn error(&self, message: &str) {
        let line = if self.colored {
            format!("  {}{}{}", Colors::BRIGHT_RED, message, Colors::RESET)
        } else {
            format!("  {message}")
        };
        self.emit(&[line]);
    }

    pub fn render_dashboard(&self, snapshot: &DashboardSnapshot) {
        self.emit(&self.formatter.dashboard(snapshot));
    }

    pub fn render_network(&self, stats: Option<&NetworkStats>) {
        match stats {
            Some(stats) => self.emit(&self.formatter.network(stats)),
            None => self.emit(&self.formatter.network_failed()),
        }
    }

    pub fn render_wallets(&self, snapshot: &WalletSnapshot) {
        self.emit(&self.formatter.wallets(snapshot));
    }

    pub fn render_mining(&self, snapshot: &MiningSnapshot) {
        self.emit(&self.formatter.mining(snapshot));
    }

    pub fn render_chart(&self, snapshot: &ChartSnapshot) {
        self.emit(&self.formatter.chart(snapshot));
    }

    pub fn render_news(&self, snapshot: &NewsSnapshot) {
        self.emit(&self.formatter.news(snapshot, Utc::now()));
    }

    pub fn render_search(&self, query: &str, items: &[NewsItem]) {
        let mut lines = vec![format!("  Search: {query} ({} results)", items.len())];
        lines.extend(self.formatter.news_items(items, Utc::now()));
        self.emit(&lines);
    }

    pub fn help(&self) {
        self.emit(&[
            "  Sections: dashboard wallet mining charts news node-info (or 1-5)".to_string(),
            "  r | refresh        reload the current section".to_string(),
            "  hide | show        pause or resume background refresh".to_string(),
            "  connect | disconnect".to_string(),
            "  mine <wallet> [threads] [intensity] | stop-mining".to_string(),
            "  filter <all|kaspa|crypto|mining> | search <query>".to_string(),
            "  period <days> | wallet-create <label> <password> <confirm>".to_string(),
            "  wallet-info <id> | transfer <recipient> <amount> [fee]".to_string(),
            "  health | block [hash] | help | quit".to_string(),
        ]);
    }
}

impl SectionView for TerminalView {
    fn hide(&self, section: Section) {
        debug!(%section, "Section hidden");
    }

    fn show(&self, section: Section) {
        self.emit(&[self.formatter.title(section_title(section))]);
    }

    fn highlight(&self, section: Section) {
        if self.quiet {
            return;
        }
        let nav: Vec<String> = Section::ALL
            .iter()
            .map(|s| {
                if *s == section {
                    format!("[{}]", s.as_str())
                } else {
                    s.as_str().to_string()
                }
            })
            .collect();
        self.emit(&[nav.join("  ")]);
    }
}
