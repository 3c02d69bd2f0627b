/// file: src/charts.rs
/// description: price history series with summary stats and a simulated fallback
use crate::{error::Result, gateway::DashboardApi};
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

pub const BASE_PRICE: f64 = 0.02;
pub const PRICE_FLOOR: f64 = 0.001;
const MAX_STEP: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp_ms: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceStats {
    pub current: f64,
    pub change: f64,
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub average: f64,
}

impl PriceStats {
    /// Change is measured from the first point of the series to the last.
    pub fn from_series(points: &[PricePoint]) -> Option<Self> {
        let first = points.first()?.price;
        let current = points.last()?.price;
        let (high, low, sum) = points.iter().fold(
            (f64::MIN, f64::MAX, 0.0),
            |(high, low, sum), point| (high.max(point.price), low.min(point.price), sum + point.price),
        );
        let change = current - first;
        Some(Self {
            current,
            change,
            change_percent: if first != 0.0 { change / first * 100.0 } else { 0.0 },
            high,
            low,
            average: sum / points.len() as f64,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSource {
    Backend,
    Simulated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSnapshot {
    pub days: u32,
    pub source: SeriesSource,
    pub points: Vec<PricePoint>,
    pub stats: Option<PriceStats>,
}

pub fn points_for_period(days: u32) -> usize {
    match days {
        1 => 24,
        7 => 7 * 4,
        30 => 30,
        90 => 90,
        _ => 30,
    }
}

/// Random walk from `BASE_PRICE`; hourly points for a one-day period,
/// daily points otherwise.
pub fn simulate_series(days: u32, rng: &mut fastrand::Rng) -> Vec<PricePoint> {
    let count = points_for_period(days);
    let spacing = if days == 1 {
        ChronoDuration::hours(1)
    } else {
        ChronoDuration::hours(24)
    };
    let now = Utc::now();
    let mut price = BASE_PRICE;
    (0..count)
        .map(|i| {
            let step = (rng.f64() - 0.5) * 2.0 * MAX_STEP;
            price = (price + step).max(PRICE_FLOOR);
            PricePoint {
                timestamp_ms: (now - spacing * (count - i) as i32).timestamp_millis(),
                price,
            }
        })
        .collect()
}

struct ChartState {
    days: u32,
    snapshot: Option<ChartSnapshot>,
    rng: fastrand::Rng,
}

pub struct ChartsManager {
    api: Arc<dyn DashboardApi>,
    state: Mutex<ChartState>,
}

impl ChartsManager {
    pub fn new(api: Arc<dyn DashboardApi>, days: u32) -> Self {
        Self::with_rng(api, days, fastrand::Rng::new())
    }

    pub fn with_rng(api: Arc<dyn DashboardApi>, days: u32, rng: fastrand::Rng) -> Self {
        Self {
            api,
            state: Mutex::new(ChartState {
                days,
                snapshot: None,
                rng,
            }),
        }
    }

    pub fn days(&self) -> u32 {
        self.state.lock().days
    }

    pub fn snapshot(&self) -> Option<ChartSnapshot> {
        self.state.lock().snapshot.clone()
    }

    /// Fetches `days` of history. A failed request or an empty series
    /// falls back to simulated data, so this always yields a chart.
    pub async fn load_price_data(&self, days: u32) -> ChartSnapshot {
        let fetched = self.fetch(days).await;
        let mut state = self.state.lock();
        let (source, points) = match fetched {
            Ok(points) if !points.is_empty() => (SeriesSource::Backend, points),
            Ok(_) => {
                warn!(days, "Price history is empty, using simulated data");
                (SeriesSource::Simulated, simulate_series(days, &mut state.rng))
            }
            Err(e) => {
                warn!(days, "Failed to load price data: {}", e);
                (SeriesSource::Simulated, simulate_series(days, &mut state.rng))
            }
        };
        let snapshot = ChartSnapshot {
            days,
            source,
            stats: PriceStats::from_series(&points),
            points,
        };
        state.snapshot = Some(snapshot.clone());
        snapshot
    }

    pub async fn reload(&self) -> ChartSnapshot {
        let days = self.days();
        self.load_price_data(days).await
    }

    pub async fn change_period(&self, days: u32) -> ChartSnapshot {
        self.state.lock().days = days;
        info!(days, "Chart period changed");
        self.load_price_data(days).await
    }

    async fn fetch(&self, days: u32) -> Result<Vec<PricePoint>> {
        let history = self.api.price_history(days).await?;
        Ok(history
            .prices
            .into_iter()
            .map(|(timestamp_ms, price)| PricePoint {
                timestamp_ms,
                price,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::FakeApi;
    use crate::types::PriceHistory;

    fn point(price: f64) -> PricePoint {
        PricePoint {
            timestamp_ms: 0,
            price,
        }
    }

    #[test]
    fn stats_measure_first_to_last() {
        let stats =
            PriceStats::from_series(&[point(0.02), point(0.03), point(0.01), point(0.025)])
                .unwrap();
        assert_eq!(stats.current, 0.025);
        assert!((stats.change - 0.005).abs() < 1e-12);
        assert!((stats.change_percent - 25.0).abs() < 1e-9);
        assert_eq!(stats.high, 0.03);
        assert_eq!(stats.low, 0.01);
        assert!((stats.average - 0.02125).abs() < 1e-12);
        assert!(PriceStats::from_series(&[]).is_none());
    }

    #[test]
    fn simulated_series_sizes_and_floor() {
        let mut rng = fastrand::Rng::with_seed(3);
        for (days, expected) in [(1, 24), (7, 28), (30, 30), (90, 90), (14, 30)] {
            let series = simulate_series(days, &mut rng);
            assert_eq!(series.len(), expected);
            assert!(series.iter().all(|p| p.price >= PRICE_FLOOR));
            assert!(series.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
        }
    }

    #[tokio::test]
    async fn backend_series_is_used_when_present() {
        let api = FakeApi::healthy();
        *api.history.lock() = Some(PriceHistory {
            prices: vec![(1_000, 0.02), (2_000, 0.022)],
            ..Default::default()
        });
        let charts = ChartsManager::new(Arc::new(api), 7);

        let snapshot = charts.reload().await;
        assert_eq!(snapshot.source, SeriesSource::Backend);
        assert_eq!(snapshot.points.len(), 2);
        assert_eq!(snapshot.stats.map(|s| s.current), Some(0.022));
    }

    #[tokio::test]
    async fn failed_request_falls_back_to_simulation() {
        let api = FakeApi::healthy();
        api.fail("price_history");
        let charts = ChartsManager::with_rng(Arc::new(api), 7, fastrand::Rng::with_seed(9));

        let snapshot = charts.change_period(90).await;
        assert_eq!(charts.days(), 90);
        assert_eq!(snapshot.source, SeriesSource::Simulated);
        assert_eq!(snapshot.points.len(), 90);
        assert_eq!(charts.snapshot(), Some(snapshot));
    }
}
