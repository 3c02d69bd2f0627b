/// file: src/gateway.rs
/// description: REST access to the KaspaZof backend with a fixed per-request timeout
use crate::{
    config::ApiConfig,
    error::{DashboardError, Result},
    monitoring::{API_FAILURE_COUNTER, API_REQUEST_COUNTER},
    types::{
        ApiEnvelope, HealthCheck, NodeInfo, PriceData, PriceHistory, SystemInfo, Wallet,
        WalletCreate, WalletList,
    },
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

/// Backend calls made by the domain managers.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn system_info(&self) -> Result<SystemInfo>;
    async fn health(&self) -> Result<HealthCheck>;
    async fn cache_stats(&self) -> Result<Value>;
    async fn current_price(&self) -> Result<PriceData>;
    async fn price_history(&self, days: u32) -> Result<PriceHistory>;
    async fn node_status(&self) -> Result<NodeInfo>;
    async fn block_info(&self, block_hash: Option<&str>) -> Result<Value>;
    async fn wallets(&self) -> Result<WalletList>;
    async fn create_wallet(&self, request: &WalletCreate) -> Result<Wallet>;
    async fn wallet(&self, id: &str) -> Result<Wallet>;
}

pub struct ApiClient {
    base_url: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            base_url: config.base_url.clone(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn request<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        API_REQUEST_COUNTER.increment(1);
        let path = url.path().to_string();
        let result = self.execute(method, url, body).await;
        if let Err(e) = &result {
            API_FAILURE_COUNTER.increment(1);
            error!(endpoint = %path, "API Error: {}", e);
        }
        result
    }

    async fn execute<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(%method, %url, "API request");
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(normalize)?;
        let status = response.status();
        if !status.is_success() {
            return Err(http_status(status));
        }

        let bytes = response.bytes().await.map_err(normalize)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        self.request::<(), T>(Method::GET, url, None).await
    }

    async fn get_data<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let envelope: ApiEnvelope<T> = self.request::<(), _>(Method::GET, url, None).await?;
        unwrap_envelope(envelope)
    }
}

fn normalize(e: reqwest::Error) -> DashboardError {
    if e.is_timeout() {
        DashboardError::Timeout
    } else {
        DashboardError::HttpError(e)
    }
}

fn http_status(status: StatusCode) -> DashboardError {
    DashboardError::HttpStatus {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}

fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<T> {
    match envelope.data {
        Some(data) if envelope.success => Ok(data),
        _ => Err(DashboardError::InvalidMessage(
            envelope
                .message
                .unwrap_or_else(|| "request reported failure".to_string()),
        )),
    }
}

#[derive(serde::Deserialize)]
struct CacheStats {
    cache_stats: Value,
}

#[async_trait]
impl DashboardApi for ApiClient {
    async fn system_info(&self) -> Result<SystemInfo> {
        self.get_data(self.endpoint("system/info")?).await
    }

    async fn health(&self) -> Result<HealthCheck> {
        self.get("system/health").await
    }

    async fn cache_stats(&self) -> Result<Value> {
        let stats: CacheStats = self.get("system/cache/stats").await?;
        Ok(stats.cache_stats)
    }

    async fn current_price(&self) -> Result<PriceData> {
        self.get_data(self.endpoint("prices/current")?).await
    }

    async fn price_history(&self, days: u32) -> Result<PriceHistory> {
        let mut url = self.endpoint("prices/history")?;
        url.query_pairs_mut().append_pair("days", &days.to_string());
        self.get_data(url).await
    }

    async fn node_status(&self) -> Result<NodeInfo> {
        self.get_data(self.endpoint("node/status")?).await
    }

    async fn block_info(&self, block_hash: Option<&str>) -> Result<Value> {
        let mut url = self.endpoint("node/block")?;
        if let Some(hash) = block_hash {
            url.query_pairs_mut().append_pair("block_hash", hash);
        }
        self.get_data(url).await
    }

    async fn wallets(&self) -> Result<WalletList> {
        self.get("wallets/").await
    }

    async fn create_wallet(&self, request: &WalletCreate) -> Result<Wallet> {
        let url = self.endpoint("wallets/create")?;
        self.request(Method::POST, url, Some(request)).await
    }

    async fn wallet(&self, id: &str) -> Result<Wallet> {
        let mut url = self.endpoint("wallets")?;
        url.path_segments_mut()
            .map_err(|_| DashboardError::InvalidMessage("api url cannot be a base".into()))?
            .push(id);
        self.request::<(), _>(Method::GET, url, None).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::types::{NetworkType, WalletStatus};
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;

    pub fn price(usd: f64) -> PriceData {
        PriceData {
            kaspa_usd: usd,
            kaspa_eur: usd * 0.9,
            change_24h: 2.5,
            last_updated: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            volume_24h: Some(12_500_000.0),
            market_cap: Some(540_000_000.0),
        }
    }

    pub fn node() -> NodeInfo {
        NodeInfo {
            is_synced: true,
            block_count: 1_234_567,
            peer_count: 8,
            network: NetworkType::Mainnet,
            version: "0.12.0".into(),
            uptime: Some(3600),
            sync_progress: Some(100.0),
        }
    }

    pub fn wallet(id: &str, label: &str) -> Wallet {
        Wallet {
            id: id.into(),
            label: label.into(),
            address: format!("kaspa:qq{id}"),
            status: WalletStatus::Active,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            balance: Some(0.0),
        }
    }

    /// In-memory backend. Endpoints listed in `failing` return a 500.
    #[derive(Default)]
    pub struct FakeApi {
        pub price: Mutex<Option<PriceData>>,
        pub node: Mutex<Option<NodeInfo>>,
        pub history: Mutex<Option<PriceHistory>>,
        pub wallets: Mutex<Vec<Wallet>>,
        pub failing: Mutex<Vec<&'static str>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        pub fn healthy() -> Self {
            let api = Self::default();
            *api.price.lock() = Some(price(0.0234));
            *api.node.lock() = Some(node());
            api
        }

        pub fn fail(&self, endpoint: &'static str) {
            self.failing.lock().push(endpoint);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn hit(&self, endpoint: &'static str) -> Result<()> {
            self.calls.lock().push(endpoint.to_string());
            if self.failing.lock().contains(&endpoint) {
                return Err(DashboardError::HttpStatus {
                    status: 500,
                    reason: "Internal Server Error".into(),
                });
            }
            Ok(())
        }
    }

    fn missing() -> DashboardError {
        DashboardError::HttpStatus {
            status: 404,
            reason: "Not Found".into(),
        }
    }

    #[async_trait]
    impl DashboardApi for FakeApi {
        async fn system_info(&self) -> Result<SystemInfo> {
            self.hit("system_info")?;
            Ok(SystemInfo {
                environment: "test".into(),
                version: "1.0.0".into(),
                uptime: 60,
                services: vec![],
            })
        }

        async fn health(&self) -> Result<HealthCheck> {
            self.hit("health")?;
            Ok(HealthCheck {
                status: "healthy".into(),
                timestamp: Utc::now(),
            })
        }

        async fn cache_stats(&self) -> Result<Value> {
            self.hit("cache_stats")?;
            Ok(serde_json::json!({"hits": 0}))
        }

        async fn current_price(&self) -> Result<PriceData> {
            self.hit("current_price")?;
            self.price.lock().clone().ok_or_else(missing)
        }

        async fn price_history(&self, _days: u32) -> Result<PriceHistory> {
            self.hit("price_history")?;
            self.history.lock().clone().ok_or_else(missing)
        }

        async fn node_status(&self) -> Result<NodeInfo> {
            self.hit("node_status")?;
            self.node.lock().clone().ok_or_else(missing)
        }

        async fn block_info(&self, _block_hash: Option<&str>) -> Result<Value> {
            self.hit("block_info")?;
            Ok(serde_json::json!({"hash": "00ff"}))
        }

        async fn wallets(&self) -> Result<WalletList> {
            self.hit("wallets")?;
            let wallets = self.wallets.lock().clone();
            Ok(WalletList {
                total: wallets.len(),
                wallets,
                message: None,
            })
        }

        async fn create_wallet(&self, request: &WalletCreate) -> Result<Wallet> {
            self.hit("create_wallet")?;
            let mut wallets = self.wallets.lock();
            let created = wallet(&format!("w{}", wallets.len() + 1), &request.label);
            wallets.push(created.clone());
            Ok(created)
        }

        async fn wallet(&self, id: &str) -> Result<Wallet> {
            self.hit("wallet")?;
            self.wallets
                .lock()
                .iter()
                .find(|w| w.id == id)
                .cloned()
                .ok_or_else(missing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_base_url;
    use std::time::Duration;

    fn client(base: &str) -> ApiClient {
        let config = ApiConfig {
            base_url: parse_base_url(base).unwrap(),
            timeout: Duration::from_secs(10),
        };
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn endpoints_join_under_the_versioned_root() {
        let api = client("http://localhost:8000/api/v1");
        assert_eq!(
            api.endpoint("/system/info").unwrap().as_str(),
            "http://localhost:8000/api/v1/system/info"
        );
        assert_eq!(
            api.endpoint("wallets/").unwrap().as_str(),
            "http://localhost:8000/api/v1/wallets/"
        );
    }

    #[test]
    fn failed_envelope_is_an_error() {
        let envelope: ApiEnvelope<Value> = serde_json::from_str(
            r#"{"success": false, "data": null, "message": "node offline"}"#,
        )
        .unwrap();
        match unwrap_envelope(envelope) {
            Err(DashboardError::InvalidMessage(message)) => assert_eq!(message, "node offline"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_errors_carry_code_and_reason() {
        let err = http_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
    }
}
