/// file: src/dashboard.rs
/// description: dashboard widgets loaded together and patched by push updates
use crate::{
    error::Result,
    gateway::DashboardApi,
    mining::MiningManager,
    router::Section,
    types::{MiningStats, MiningUpdate, NetworkType, NodeInfo, PriceData, PriceUpdate, SystemInfo},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Render state of one independently loaded widget.
#[derive(Debug, Clone, PartialEq)]
pub enum Widget<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for Widget<T> {
    fn default() -> Self {
        Widget::Loading
    }
}

impl<T> Widget<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Widget::Ready(value) => Some(value),
            _ => None,
        }
    }

    fn settle(result: Result<T>, widget: &str) -> Self {
        match result {
            Ok(value) => Widget::Ready(value),
            Err(e) => {
                warn!(widget, "Failed to load widget: {}", e);
                Widget::Failed(format!("Failed to load {widget}"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardSnapshot {
    pub system: Widget<SystemInfo>,
    pub price: Widget<PriceData>,
    pub node: Widget<NodeInfo>,
    pub mining: MiningStats,
    pub is_mining: bool,
}

/// Combined figures for the node-info section.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkStats {
    pub price_usd: f64,
    /// Millions of USD.
    pub market_cap_m: Option<f64>,
    /// Millions of USD.
    pub volume_24h_m: Option<f64>,
    pub block_height: u64,
    pub network: NetworkType,
    pub peers: u32,
}

impl NetworkStats {
    pub fn combine(node: &NodeInfo, price: &PriceData) -> Self {
        Self {
            price_usd: price.kaspa_usd,
            market_cap_m: price.market_cap.map(|v| v / 1_000_000.0),
            volume_24h_m: price.volume_24h.map(|v| v / 1_000_000.0),
            block_height: node.block_count,
            network: node.network,
            peers: node.peer_count,
        }
    }
}

pub struct DashboardManager {
    api: Arc<dyn DashboardApi>,
    mining: Arc<MiningManager>,
    active: watch::Receiver<Section>,
    state: Mutex<DashboardSnapshot>,
}

impl DashboardManager {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        mining: Arc<MiningManager>,
        active: watch::Receiver<Section>,
    ) -> Self {
        Self {
            api,
            mining,
            active,
            state: Mutex::new(DashboardSnapshot::default()),
        }
    }

    fn is_active(&self) -> bool {
        *self.active.borrow() == Section::Dashboard
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.state.lock().clone()
    }

    /// Loads every widget concurrently. Each widget settles on its own, so
    /// one failing endpoint leaves the others intact.
    pub async fn reload(&self) -> DashboardSnapshot {
        let (system, price, node) = tokio::join!(
            self.api.system_info(),
            self.api.current_price(),
            self.api.node_status()
        );

        let mut state = self.state.lock();
        state.system = Widget::settle(system, "system status");
        state.price = Widget::settle(price, "price data");
        state.node = Widget::settle(node, "node status");
        state.mining = self.mining.stats();
        state.is_mining = self.mining.is_mining();
        debug!("Dashboard reloaded");
        state.clone()
    }

    /// Applies a pushed price while the dashboard is shown. Returns the
    /// updated snapshot when it was applied.
    pub fn apply_price(&self, update: &PriceUpdate) -> Option<DashboardSnapshot> {
        if !self.is_active() {
            return None;
        }
        let mut state = self.state.lock();
        match &mut state.price {
            Widget::Ready(price) => price.apply(update),
            other => *other = Widget::Ready(PriceData::from_update(update)),
        }
        Some(state.clone())
    }

    pub fn apply_node_status(&self, node: NodeInfo) -> Option<DashboardSnapshot> {
        if !self.is_active() {
            return None;
        }
        let mut state = self.state.lock();
        state.node = Widget::Ready(node);
        Some(state.clone())
    }

    /// Mining stats are merged whatever section is shown; the snapshot is
    /// only returned for re-rendering while the dashboard is active.
    pub fn apply_mining(&self, update: &MiningUpdate) -> Option<DashboardSnapshot> {
        let stats = self.mining.apply_update(update);
        let mut state = self.state.lock();
        state.mining = stats;
        self.is_active().then(|| state.clone())
    }

    /// Node status then price, combined for the node-info section.
    pub async fn network_stats(&self) -> Result<NetworkStats> {
        let node = self.api.node_status().await?;
        let price = self.api.current_price().await?;
        Ok(NetworkStats::combine(&node, &price))
    }
}
