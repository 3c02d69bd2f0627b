/// file: src/app.rs
/// description: application context owning every component, plus the command loop
use crate::{
    bus::SubscriptionId,
    channel::{ChannelClient, Connector, WsConnector},
    charts::ChartsManager,
    config::Config,
    dashboard::DashboardManager,
    error::{DashboardError, Result},
    events::{EventSender, create_event_channel},
    gateway::{ApiClient, DashboardApi},
    mining::{MiningConfig, MiningManager},
    news::{NewsFilter, NewsManager},
    refresh::RefreshController,
    router::{Section, SectionLoader, SectionRouter},
    types::{MiningUpdate, NodeInfo, PriceUpdate, event_names},
    ui::{TerminalView, UIController},
    wallet::{WalletManager, validate_transfer},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::{debug, info, warn};

const DEFAULT_TRANSFER_FEE: f64 = 0.00001;

/// Loads each section's data and renders it while that section is shown.
pub struct DataLoader {
    view: Arc<TerminalView>,
    active: watch::Receiver<Section>,
    pub dashboard: Arc<DashboardManager>,
    pub wallets: Arc<WalletManager>,
    pub mining: Arc<MiningManager>,
    pub news: Arc<NewsManager>,
    pub charts: Arc<ChartsManager>,
}

#[async_trait]
impl SectionLoader for DataLoader {
    async fn load(&self, section: Section) -> Result<()> {
        match section {
            Section::Dashboard => {
                let snapshot = self.dashboard.reload().await;
                self.view.render_dashboard(&snapshot);
            }
            Section::Wallet => {
                let snapshot = self.wallets.load_wallets().await;
                self.view.render_wallets(&snapshot);
            }
            // advances on its own tick; nothing to fetch
            Section::Mining => self.view.render_mining(&self.mining.snapshot()),
            Section::Charts => {
                let snapshot = self.charts.reload().await;
                self.view.render_chart(&snapshot);
            }
            // the feed refreshes on its own timer whatever is shown
            Section::News => {
                let snapshot = self.news.load_news();
                if *self.active.borrow() == Section::News {
                    self.view.render_news(&snapshot);
                }
            }
            Section::NodeInfo => match self.dashboard.network_stats().await {
                Ok(stats) => self.view.render_network(Some(&stats)),
                Err(e) => {
                    self.view.render_network(None);
                    return Err(e);
                }
            },
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Navigate(Section),
    Refresh,
    Hide,
    Show,
    Connect,
    Disconnect,
    Mine {
        wallet: Option<String>,
        threads: Option<u8>,
        intensity: Option<String>,
    },
    StopMining,
    Filter(String),
    Search(String),
    Period(u32),
    CreateWallet {
        label: String,
        password: String,
        confirm: String,
    },
    WalletInfo(String),
    Transfer {
        recipient: String,
        amount: String,
        fee: Option<String>,
    },
    Health,
    Block(Option<String>),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();

        let command = match head.to_ascii_lowercase().as_str() {
            "r" | "refresh" => Command::Refresh,
            "hide" => Command::Hide,
            "show" => Command::Show,
            "connect" => Command::Connect,
            "disconnect" => Command::Disconnect,
            "mine" => Command::Mine {
                wallet: args.next().map(str::to_string),
                threads: args
                    .next()
                    .map(|t| {
                        t.parse().map_err(|_| {
                            DashboardError::Validation(format!("invalid thread count '{t}'"))
                        })
                    })
                    .transpose()?,
                intensity: args.next().map(str::to_string),
            },
            "stop-mining" => Command::StopMining,
            "filter" => Command::Filter(rest.to_string()),
            "search" => Command::Search(rest.to_string()),
            "period" => Command::Period(rest.parse().map_err(|_| {
                DashboardError::Validation(format!("invalid period '{rest}'"))
            })?),
            "wallet-create" => match (args.next(), args.next(), args.next()) {
                (Some(label), Some(password), Some(confirm)) => Command::CreateWallet {
                    label: label.to_string(),
                    password: password.to_string(),
                    confirm: confirm.to_string(),
                },
                _ => {
                    return Err(DashboardError::Validation(
                        "usage: wallet-create <label> <password> <confirm>".into(),
                    ));
                }
            },
            "wallet-info" if !rest.is_empty() => Command::WalletInfo(rest.to_string()),
            "transfer" => match (args.next(), args.next()) {
                (Some(recipient), Some(amount)) => Command::Transfer {
                    recipient: recipient.to_string(),
                    amount: amount.to_string(),
                    fee: args.next().map(str::to_string),
                },
                _ => {
                    return Err(DashboardError::Validation(
                        "usage: transfer <recipient> <amount> [fee]".into(),
                    ));
                }
            },
            "health" => Command::Health,
            "block" => Command::Block((!rest.is_empty()).then(|| rest.to_string())),
            "help" | "?" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            other => match Section::from_shortcut(other) {
                Some(section) => Command::Navigate(section),
                None => Command::Navigate(other.parse()?),
            },
        };
        Ok(Some(command))
    }
}

pub struct AppContext {
    config: Config,
    api: Arc<dyn DashboardApi>,
    pub channel: ChannelClient,
    pub router: SectionRouter,
    pub loader: Arc<DataLoader>,
    pub dashboard_refresh: RefreshController,
    pub news_refresh: RefreshController,
    view: Arc<TerminalView>,
    subscriptions: Mutex<Vec<(&'static str, SubscriptionId)>>,
}

impl AppContext {
    pub fn new(
        config: Config,
        api: Arc<dyn DashboardApi>,
        connector: Arc<dyn Connector>,
        events: Option<EventSender>,
        view: Arc<TerminalView>,
    ) -> Self {
        let (active_tx, active_rx) = watch::channel(config.ui.initial_section);

        let mining = Arc::new(MiningManager::new(config.refresh.mining_tick));
        let loader = Arc::new(DataLoader {
            view: view.clone(),
            active: active_rx.clone(),
            dashboard: Arc::new(DashboardManager::new(
                api.clone(),
                mining.clone(),
                active_rx.clone(),
            )),
            wallets: Arc::new(WalletManager::new(api.clone())),
            mining,
            news: Arc::new(NewsManager::new()),
            charts: Arc::new(ChartsManager::new(api.clone(), config.refresh.history_days)),
        });

        let router = SectionRouter::from_sender(active_tx, view.clone(), loader.clone());
        let dashboard_refresh = RefreshController::new(
            "dashboard",
            Some(Section::Dashboard),
            Section::Dashboard,
            active_rx.clone(),
            loader.clone(),
        );
        let news_refresh =
            RefreshController::new("news", None, Section::News, active_rx, loader.clone());
        let channel = ChannelClient::new(config.channel.clone(), connector, events);

        Self {
            config,
            api,
            channel,
            router,
            loader,
            dashboard_refresh,
            news_refresh,
            view,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    fn subscribe_push_updates(&self) {
        let mut subscriptions = self.subscriptions.lock();

        let (dashboard, view) = (self.loader.dashboard.clone(), self.view.clone());
        let id = self
            .channel
            .subscribe_typed(event_names::PRICE_UPDATE, move |update: PriceUpdate| {
                if let Some(snapshot) = dashboard.apply_price(&update) {
                    view.render_dashboard(&snapshot);
                }
            });
        subscriptions.push((event_names::PRICE_UPDATE, id));

        let (dashboard, view) = (self.loader.dashboard.clone(), self.view.clone());
        let id = self
            .channel
            .subscribe_typed(event_names::NODE_STATUS, move |node: NodeInfo| {
                if let Some(snapshot) = dashboard.apply_node_status(node) {
                    view.render_dashboard(&snapshot);
                }
            });
        subscriptions.push((event_names::NODE_STATUS, id));

        let (dashboard, view) = (self.loader.dashboard.clone(), self.view.clone());
        let id = self
            .channel
            .subscribe_typed(event_names::MINING_UPDATE, move |update: MiningUpdate| {
                if let Some(snapshot) = dashboard.apply_mining(&update) {
                    view.render_dashboard(&snapshot);
                }
            });
        subscriptions.push((event_names::MINING_UPDATE, id));
    }

    /// Subscribes push handlers, opens the channel, shows the initial
    /// section and starts both refresh timers.
    pub async fn start(&self) {
        self.subscribe_push_updates();
        self.channel.connect();
        self.router
            .activate_section(self.config.ui.initial_section)
            .await;
        self.dashboard_refresh
            .start(self.config.refresh.dashboard_interval);
        self.news_refresh.start(self.config.refresh.news_interval);
    }

    pub fn shutdown(&self) {
        info!("Shutting down");
        self.dashboard_refresh.stop();
        self.news_refresh.stop();
        self.loader.mining.stop();
        self.channel.disconnect();
        for (event, id) in self.subscriptions.lock().drain(..) {
            self.channel.unsubscribe(event, id);
        }
    }

    /// Reads one command per line until `quit` or end of input.
    pub async fn command_loop<R: AsyncBufRead + Unpin>(&self, input: R) -> anyhow::Result<()> {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            match Command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.execute(command).await,
                Ok(None) => {}
                Err(e) => self.view.error(&e.to_string()),
            }
        }
        Ok(())
    }

    pub async fn execute(&self, command: Command) {
        debug!(?command, "Executing command");
        match command {
            Command::Navigate(section) => self.router.activate_section(section).await,
            Command::Refresh => {
                self.router.refresh_current().await;
                self.view
                    .notice(&format!("{} data has been updated", self.router.active()));
            }
            Command::Hide => self.dashboard_refresh.pause(),
            Command::Show => self.dashboard_refresh.resume(),
            Command::Connect => self.channel.connect(),
            Command::Disconnect => self.channel.disconnect(),
            Command::Mine {
                wallet,
                threads,
                intensity,
            } => self.start_mining(wallet, threads, intensity).await,
            Command::StopMining => {
                if self.loader.mining.stop() {
                    self.view.notice("Mining operation has been stopped");
                }
                self.rerender(Section::Mining).await;
            }
            Command::Filter(category) => match category.parse::<NewsFilter>() {
                Ok(filter) => {
                    let snapshot = self.loader.news.set_filter(filter);
                    if self.router.active() == Section::News {
                        self.view.render_news(&snapshot);
                    }
                }
                Err(e) => self.view.error(&e.to_string()),
            },
            Command::Search(query) => {
                let hits = self.loader.news.search(&query);
                self.view.render_search(&query, &hits);
            }
            Command::Period(days) => {
                let snapshot = self.loader.charts.change_period(days).await;
                if self.router.active() == Section::Charts {
                    self.view.render_chart(&snapshot);
                }
            }
            Command::CreateWallet {
                label,
                password,
                confirm,
            } => match self
                .loader
                .wallets
                .create_wallet(&label, &password, &confirm)
                .await
            {
                Ok(wallet) => {
                    self.view
                        .notice(&format!("Wallet '{}' created successfully", wallet.label));
                    self.rerender(Section::Wallet).await;
                }
                Err(e) => self.view.error(&e.to_string()),
            },
            Command::WalletInfo(id) => match self.loader.wallets.wallet(&id).await {
                Ok(wallet) => self.view.notice(&format!(
                    "{} {} [{}] {:.8} KAS",
                    wallet.label,
                    wallet.address,
                    wallet.status,
                    wallet.balance.unwrap_or(0.0)
                )),
                Err(e) => self.view.error(&e.to_string()),
            },
            Command::Transfer {
                recipient,
                amount,
                fee,
            } => self.check_transfer(&recipient, &amount, fee.as_deref()),
            Command::Health => {
                match self.api.health().await {
                    Ok(health) => self.view.notice(&format!(
                        "Backend {} at {}",
                        health.status,
                        health.timestamp.format("%H:%M:%S")
                    )),
                    Err(e) => self.view.error(&e.to_string()),
                }
                match self.api.cache_stats().await {
                    Ok(stats) => self.view.notice(&format!("Cache: {stats}")),
                    Err(e) => self.view.error(&e.to_string()),
                }
            }
            Command::Block(hash) => match self.api.block_info(hash.as_deref()).await {
                Ok(block) => self.view.notice(&format!("Block: {block}")),
                Err(e) => self.view.error(&e.to_string()),
            },
            Command::Help => self.view.help(),
            Command::Quit => {}
        }
    }

    async fn start_mining(
        &self,
        wallet: Option<String>,
        threads: Option<u8>,
        intensity: Option<String>,
    ) {
        let Some(wallet) = wallet.or_else(|| self.loader.wallets.first_address()) else {
            self.view.error("Please enter a valid Kaspa wallet address");
            return;
        };
        let mut config = MiningConfig::new(wallet);
        if let Some(threads) = threads {
            config.threads = threads;
        }
        if let Some(intensity) = intensity {
            match intensity.parse() {
                Ok(intensity) => config.intensity = intensity,
                Err(e) => {
                    self.view.error(&e.to_string());
                    return;
                }
            }
        }
        match self.loader.mining.start(config) {
            Ok(()) => self.view.notice("Your mining operation has begun"),
            Err(e) => self.view.error(&e.to_string()),
        }
        self.rerender(Section::Mining).await;
    }

    /// Validates the send form only; signing and broadcasting are left to
    /// the backend wallet.
    fn check_transfer(&self, recipient: &str, amount: &str, fee: Option<&str>) {
        let parse = |field: &str, raw: &str| {
            raw.parse::<f64>()
                .map_err(|_| DashboardError::Validation(format!("invalid {field} '{raw}'")))
        };
        let checked = parse("amount", amount).and_then(|amount| {
            let fee = fee.map_or(Ok(DEFAULT_TRANSFER_FEE), |raw| parse("fee", raw))?;
            validate_transfer(recipient, amount, fee)
        });
        match checked {
            Ok(transfer) => self.view.notice(&format!(
                "Transfer of {:.8} KAS to {} is valid (fee {:.8} KAS)",
                transfer.amount, transfer.recipient, transfer.fee
            )),
            Err(e) => self.view.error(&e.to_string()),
        }
    }

    async fn rerender(&self, section: Section) {
        if self.router.active() == section {
            self.router.refresh_current().await;
        }
    }
}

/// Builds the production context and runs it until `quit`, end of input or
/// Ctrl+C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let api: Arc<dyn DashboardApi> = Arc::new(ApiClient::new(&config.api)?);
    let connector = Arc::new(WsConnector::new(config.channel.connect_timeout));
    let view = Arc::new(TerminalView::stdout(config.ui.colored, config.ui.quiet));
    let (events_tx, events_rx) = create_event_channel();

    let mut ui = UIController::new(events_rx, config.ui.colored, config.ui.quiet);
    let ui_task = tokio::spawn(async move { ui.run().await });

    info!(
        api = %config.api.base_url,
        channel = %config.channel.url,
        "Starting dashboard"
    );
    let app = AppContext::new(config, api, connector, Some(events_tx), view);
    app.start().await;

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = app.command_loop(stdin) => {
            if let Err(e) = result {
                warn!("Command input failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C"),
    }

    app.shutdown();
    // let the driver emit its final status before the indicator stops
    tokio::task::yield_now().await;
    ui_task.abort();
    Ok(())
}
