/// file: src/types.rs
/// description: wire types for channel frames and the KaspaZof REST api
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Inbound event names pushed by the backend.
pub mod event_names {
    pub const PRICE_UPDATE: &str = "price_update";
    pub const NODE_STATUS: &str = "node_status";
    pub const MINING_UPDATE: &str = "mining_update";
}

// Channel frames

/// A decoded inbound frame. The backend may name the payload key either
/// `payload` or `data`; a frame without one carries `null`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    pub event: String,
    #[serde(default, alias = "data")]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub event: String,
    pub data: Value,
}

impl OutboundMessage {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

// REST envelope

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    /// Absent or null on failure.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

// Prices

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    pub kaspa_usd: f64,
    pub kaspa_eur: f64,
    pub change_24h: f64,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub volume_24h: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
}

/// Push payload for `price_update`; only `kaspa_usd` is guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub kaspa_usd: f64,
    #[serde(default)]
    pub kaspa_eur: Option<f64>,
    #[serde(default)]
    pub change_24h: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl PriceData {
    pub fn from_update(update: &PriceUpdate) -> Self {
        Self {
            kaspa_usd: update.kaspa_usd,
            kaspa_eur: update.kaspa_eur.unwrap_or(0.0),
            change_24h: update.change_24h.unwrap_or(0.0),
            last_updated: update.last_updated.unwrap_or_else(Utc::now),
            volume_24h: None,
            market_cap: None,
        }
    }

    /// Overwrite the fields carried by a push update (last write wins).
    pub fn apply(&mut self, update: &PriceUpdate) {
        self.kaspa_usd = update.kaspa_usd;
        if let Some(eur) = update.kaspa_eur {
            self.kaspa_eur = eur;
        }
        if let Some(change) = update.change_24h {
            self.change_24h = change;
        }
        self.last_updated = update.last_updated.unwrap_or_else(Utc::now);
    }
}

/// `data` of `/prices/history`: `[timestamp_ms, price]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    #[serde(default)]
    pub prices: Vec<(i64, f64)>,
    #[serde(default)]
    pub market_caps: Vec<(i64, f64)>,
    #[serde(default)]
    pub total_volumes: Vec<(i64, f64)>,
}

// Node

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Devnet,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkType::Mainnet => "mainnet",
            NetworkType::Testnet => "testnet",
            NetworkType::Devnet => "devnet",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub is_synced: bool,
    pub block_count: u64,
    pub peer_count: u32,
    pub network: NetworkType,
    pub version: String,
    #[serde(default)]
    pub uptime: Option<u64>,
    #[serde(default)]
    pub sync_progress: Option<f64>,
}

// System

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub status: bool,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    pub last_check: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub environment: String,
    pub version: String,
    pub uptime: u64,
    pub services: Vec<ServiceStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

// Wallets

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Locked,
    Archived,
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WalletStatus::Active => "active",
            WalletStatus::Locked => "locked",
            WalletStatus::Archived => "archived",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub label: String,
    pub address: String,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub balance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletList {
    #[serde(default)]
    pub wallets: Vec<Wallet>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletCreate {
    pub label: String,
    pub password: String,
}

// Mining

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiningStats {
    pub hashrate: f64,
    pub shares: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Seconds of simulated mining.
    pub uptime: u64,
}

/// Push payload for `mining_update`; any subset of the stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiningUpdate {
    #[serde(default)]
    pub hashrate: Option<f64>,
    #[serde(default)]
    pub shares: Option<u64>,
    #[serde(default)]
    pub accepted: Option<u64>,
    #[serde(default)]
    pub rejected: Option<u64>,
    #[serde(default)]
    pub uptime: Option<u64>,
}

impl MiningStats {
    pub fn merge(&mut self, update: &MiningUpdate) {
        if let Some(hashrate) = update.hashrate {
            self.hashrate = hashrate;
        }
        if let Some(shares) = update.shares {
            self.shares = shares;
        }
        if let Some(accepted) = update.accepted {
            self.accepted = accepted;
        }
        if let Some(rejected) = update.rejected {
            self.rejected = rejected;
        }
        if let Some(uptime) = update.uptime {
            self.uptime = uptime;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inbound_accepts_payload_or_data_key() {
        let a: InboundMessage =
            serde_json::from_str(r#"{"event":"node_status","payload":{"x":1}}"#).unwrap();
        let b: InboundMessage =
            serde_json::from_str(r#"{"event":"node_status","data":{"x":1}}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.payload, json!({"x": 1}));
    }

    #[test]
    fn inbound_without_payload_is_null() {
        let msg: InboundMessage = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(msg.payload, Value::Null);
    }

    #[test]
    fn inbound_without_event_is_rejected() {
        assert!(serde_json::from_str::<InboundMessage>(r#"{"payload":1}"#).is_err());
    }

    #[test]
    fn price_update_keeps_decimal_precision() {
        let frame = serde_json::to_string(&OutboundMessage::new(
            event_names::PRICE_UPDATE,
            json!({"kaspa_usd": 0.0234}),
        ))
        .unwrap();
        let inbound: InboundMessage = serde_json::from_str(&frame).unwrap();
        let update: PriceUpdate = serde_json::from_value(inbound.payload).unwrap();
        assert_eq!(update.kaspa_usd, 0.0234);
        assert_eq!(format!("{:.6}", update.kaspa_usd), "0.023400");
    }

    #[test]
    fn price_apply_overwrites_only_present_fields() {
        let mut price = PriceData {
            kaspa_usd: 0.02,
            kaspa_eur: 0.018,
            change_24h: 1.5,
            last_updated: Utc::now(),
            volume_24h: Some(1_000_000.0),
            market_cap: None,
        };
        price.apply(&PriceUpdate {
            kaspa_usd: 0.03,
            kaspa_eur: None,
            change_24h: Some(-2.0),
            last_updated: None,
        });
        assert_eq!(price.kaspa_usd, 0.03);
        assert_eq!(price.kaspa_eur, 0.018);
        assert_eq!(price.change_24h, -2.0);
        assert_eq!(price.volume_24h, Some(1_000_000.0));
    }

    #[test]
    fn mining_merge_is_partial() {
        let mut stats = MiningStats {
            hashrate: 700.0,
            shares: 3,
            accepted: 1,
            rejected: 0,
            uptime: 42,
        };
        stats.merge(&MiningUpdate {
            hashrate: Some(900.0),
            shares: Some(4),
            ..Default::default()
        });
        assert_eq!(stats.hashrate, 900.0);
        assert_eq!(stats.shares, 4);
        assert_eq!(stats.uptime, 42);
    }

    #[test]
    fn node_info_decodes_backend_shape() {
        let node: NodeInfo = serde_json::from_value(json!({
            "is_synced": false,
            "block_count": 1_000_000,
            "peer_count": 8,
            "network": "mainnet",
            "version": "0.13.4",
            "sync_progress": 97.5
        }))
        .unwrap();
        assert_eq!(node.network, NetworkType::Mainnet);
        assert_eq!(node.sync_progress, Some(97.5));
        assert_eq!(node.uptime, None);
    }

    #[test]
    fn history_decodes_pairs() {
        let history: PriceHistory = serde_json::from_value(json!({
            "prices": [[1_700_000_000_000i64, 0.021], [1_700_003_600_000i64, 0.022]]
        }))
        .unwrap();
        assert_eq!(history.prices.len(), 2);
        assert_eq!(history.prices[1], (1_700_003_600_000, 0.022));
        assert!(history.total_volumes.is_empty());
    }
}
