/// file: src/wallet.rs
/// description: wallet list cache, creation form validation and transfer checks
use crate::{
    error::{DashboardError, Result},
    gateway::DashboardApi,
    types::{Wallet, WalletCreate},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

pub const LABEL_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;
pub const ADDRESS_PREFIX: &str = "kaspa:";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WalletSnapshot {
    pub wallets: Vec<Wallet>,
    pub total: usize,
    /// Set when the last list load failed; the cached list is kept.
    pub error: Option<String>,
    /// Informational message from the backend.
    pub notice: Option<String>,
}

/// A checked transfer request. Signing and broadcasting are not done here.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub recipient: String,
    pub amount: f64,
    pub fee: f64,
}

pub fn validate_new_wallet(label: &str, password: &str, confirm: &str) -> Result<WalletCreate> {
    let label = label.trim();
    if label.is_empty() || password.is_empty() {
        return Err(DashboardError::Validation(
            "Please fill in all fields".into(),
        ));
    }
    if label.chars().count() > LABEL_MAX {
        return Err(DashboardError::Validation(format!(
            "Label must be at most {LABEL_MAX} characters"
        )));
    }
    if password != confirm {
        return Err(DashboardError::Validation("Passwords do not match".into()));
    }
    let length = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&length) {
        return Err(DashboardError::Validation(format!(
            "Password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
        )));
    }
    Ok(WalletCreate {
        label: label.to_string(),
        password: password.to_string(),
    })
}

pub fn validate_transfer(recipient: &str, amount: f64, fee: f64) -> Result<Transfer> {
    let recipient = recipient.trim();
    if recipient.is_empty() {
        return Err(DashboardError::Validation(
            "Please fill in all required fields".into(),
        ));
    }
    if !recipient.starts_with(ADDRESS_PREFIX) {
        return Err(DashboardError::Validation(
            "Invalid Kaspa address format".into(),
        ));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DashboardError::Validation(
            "Amount must be greater than zero".into(),
        ));
    }
    if !fee.is_finite() || fee < 0.0 {
        return Err(DashboardError::Validation("Fee cannot be negative".into()));
    }
    Ok(Transfer {
        recipient: recipient.to_string(),
        amount,
        fee,
    })
}

pub struct WalletManager {
    api: Arc<dyn DashboardApi>,
    state: Mutex<WalletSnapshot>,
}

impl WalletManager {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self {
            api,
            state: Mutex::new(WalletSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        self.state.lock().clone()
    }

    pub async fn load_wallets(&self) -> WalletSnapshot {
        let result = self.api.wallets().await;
        let mut state = self.state.lock();
        match result {
            Ok(list) => {
                state.total = list.total;
                state.wallets = list.wallets;
                state.notice = list.message;
                state.error = None;
            }
            Err(e) => {
                warn!("Failed to load wallets: {}", e);
                state.error = Some("Failed to load wallets".into());
            }
        }
        state.clone()
    }

    /// Validates the form, creates the wallet, then reloads the list.
    pub async fn create_wallet(&self, label: &str, password: &str, confirm: &str) -> Result<Wallet> {
        let request = validate_new_wallet(label, password, confirm)?;
        let created = self.api.create_wallet(&request).await?;
        info!(id = %created.id, label = %created.label, "Wallet created");
        self.load_wallets().await;
        Ok(created)
    }

    pub async fn wallet(&self, id: &str) -> Result<Wallet> {
        self.api.wallet(id).await
    }

    /// First known wallet address, used to prefill the mining form.
    pub fn first_address(&self) -> Option<String> {
        self.state.lock().wallets.first().map(|w| w.address.clone())
    }
}
