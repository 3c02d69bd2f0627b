/// file: src/mining.rs
/// description: simulated mining session with a bounded hashrate history
use crate::{
    error::{DashboardError, Result},
    timer::{TimerSlot, spawn_repeating},
    types::{MiningStats, MiningUpdate},
};
use parking_lot::Mutex;
use std::{collections::VecDeque, fmt, str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, info};

pub const HISTORY_LIMIT: usize = 20;
pub const MAX_THREADS: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intensity {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Intensity::Low => "low",
            Intensity::Medium => "medium",
            Intensity::High => "high",
        })
    }
}

impl FromStr for Intensity {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Intensity::Low),
            "medium" => Ok(Intensity::Medium),
            "high" => Ok(Intensity::High),
            other => Err(DashboardError::Validation(format!(
                "unknown intensity '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningConfig {
    pub pool: String,
    pub wallet: String,
    pub threads: u8,
    pub intensity: Intensity,
}

impl MiningConfig {
    /// Solo pool, 4 threads, medium intensity.
    pub fn new(wallet: impl Into<String>) -> Self {
        Self {
            pool: "solo".to_string(),
            wallet: wallet.into(),
            threads: 4,
            intensity: Intensity::Medium,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.wallet.trim().is_empty() {
            return Err(DashboardError::Validation(
                "Please enter a valid Kaspa wallet address".into(),
            ));
        }
        if !(1..=MAX_THREADS).contains(&self.threads) {
            return Err(DashboardError::Validation(format!(
                "threads must be between 1 and {MAX_THREADS}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MiningSnapshot {
    pub is_mining: bool,
    pub config: Option<MiningConfig>,
    pub stats: MiningStats,
    /// Most recent hashrates, oldest first.
    pub history: Vec<f64>,
}

struct MiningState {
    is_mining: bool,
    config: Option<MiningConfig>,
    stats: MiningStats,
    history: VecDeque<f64>,
    rng: fastrand::Rng,
}

impl MiningState {
    fn simulate(&mut self) {
        let rng = &mut self.rng;
        self.stats.hashrate = rng.f64() * 1000.0 + 500.0;
        if rng.f64() > 0.7 {
            self.stats.shares += 1;
        }
        if rng.f64() > 0.9 {
            self.stats.accepted += 1;
        }
        if rng.f64() > 0.95 {
            self.stats.rejected += 1;
        }
        self.stats.uptime += 1;

        self.history.push_back(self.stats.hashrate);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }
}

pub struct MiningManager {
    tick: Duration,
    state: Arc<Mutex<MiningState>>,
    timer: Mutex<TimerSlot>,
}

impl MiningManager {
    pub fn new(tick: Duration) -> Self {
        Self::with_rng(tick, fastrand::Rng::new())
    }

    pub fn with_rng(tick: Duration, rng: fastrand::Rng) -> Self {
        Self {
            tick,
            state: Arc::new(Mutex::new(MiningState {
                is_mining: false,
                config: None,
                stats: MiningStats::default(),
                history: VecDeque::with_capacity(HISTORY_LIMIT + 1),
                rng,
            })),
            timer: Mutex::new(TimerSlot::new("mining")),
        }
    }

    /// Validates `config` and starts the simulation tick. Starting while
    /// already mining swaps the config and restarts the tick.
    pub fn start(&self, config: MiningConfig) -> Result<()> {
        config.validate()?;
        info!(
            pool = %config.pool,
            threads = config.threads,
            intensity = %config.intensity,
            "Mining started"
        );
        {
            let mut state = self.state.lock();
            state.is_mining = true;
            state.config = Some(config);
        }

        let state = self.state.clone();
        let handle = spawn_repeating(self.tick, move || {
            {
                let mut state = state.lock();
                if state.is_mining {
                    state.simulate();
                }
            }
            std::future::ready(())
        });
        self.timer.lock().replace(handle);
        Ok(())
    }

    /// Returns whether a session was running.
    pub fn stop(&self) -> bool {
        self.timer.lock().cancel();
        let mut state = self.state.lock();
        let was_mining = std::mem::replace(&mut state.is_mining, false);
        if was_mining {
            info!("Mining stopped");
        }
        was_mining
    }

    pub fn is_mining(&self) -> bool {
        self.state.lock().is_mining
    }

    pub fn stats(&self) -> MiningStats {
        self.state.lock().stats.clone()
    }

    pub fn snapshot(&self) -> MiningSnapshot {
        let state = self.state.lock();
        MiningSnapshot {
            is_mining: state.is_mining,
            config: state.config.clone(),
            stats: state.stats.clone(),
            history: state.history.iter().copied().collect(),
        }
    }

    /// Merges pushed stats; fields absent from the update are kept.
    pub fn apply_update(&self, update: &MiningUpdate) -> MiningStats {
        let mut state = self.state.lock();
        state.stats.merge(update);
        debug!(?update, "Mining stats merged");
        state.stats.clone()
    }
}
