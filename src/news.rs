/// file: src/news.rs
/// description: simulated news feed with category filter and text search
use crate::error::{DashboardError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::{fmt, str::FromStr};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NewsCategory {
    Kaspa,
    Crypto,
    Mining,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::Kaspa => "kaspa",
            NewsCategory::Crypto => "crypto",
            NewsCategory::Mining => "mining",
        }
    }

    fn templates(&self) -> &'static [Template] {
        match self {
            NewsCategory::Kaspa => KASPA_TEMPLATES,
            NewsCategory::Crypto => CRYPTO_TEMPLATES,
            NewsCategory::Mining => MINING_TEMPLATES,
        }
    }
}

impl fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewsFilter {
    #[default]
    All,
    Only(NewsCategory),
}

impl FromStr for NewsFilter {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(NewsFilter::All),
            "kaspa" => Ok(NewsFilter::Only(NewsCategory::Kaspa)),
            "crypto" => Ok(NewsFilter::Only(NewsCategory::Crypto)),
            "mining" => Ok(NewsFilter::Only(NewsCategory::Mining)),
            other => Err(DashboardError::Validation(format!(
                "unknown news category '{other}'"
            ))),
        }
    }
}

impl NewsFilter {
    fn matches(&self, item: &NewsItem) -> bool {
        match self {
            NewsFilter::All => true,
            NewsFilter::Only(category) => item.category == *category,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub category: NewsCategory,
    pub published_at: DateTime<Utc>,
    pub url: String,
}

impl NewsItem {
    fn mentions(&self, needle: &str) -> bool {
        [&self.title, &self.summary, &self.source]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

struct Template {
    title: &'static str,
    summary: &'static str,
    source: &'static str,
}

const KASPA_TEMPLATES: &[Template] = &[
    Template {
        title: "Kaspa Network Reaches New All-Time High in Daily Transactions",
        summary: "The Kaspa blockchain processed over 1 million transactions in a single day, showcasing its scalability and growing adoption.",
        source: "Kaspa Official",
    },
    Template {
        title: "Major Exchange Announces Kaspa Listing",
        summary: "Leading cryptocurrency exchange confirms support for KAS trading pairs, expected to increase liquidity and accessibility.",
        source: "Crypto Exchange News",
    },
    Template {
        title: "Kaspa Mining Pool Efficiency Improvements",
        summary: "New mining pool optimizations reduce latency and increase profitability for Kaspa miners worldwide.",
        source: "Mining Pool Updates",
    },
    Template {
        title: "Kaspa Developer Team Releases Network Upgrade",
        summary: "Latest protocol upgrade enhances security and introduces new features for the Kaspa ecosystem.",
        source: "Kaspa Development",
    },
    Template {
        title: "Institutional Interest in Kaspa Grows",
        summary: "Several institutional investors express interest in Kaspa's unique GHOSTDAG consensus mechanism.",
        source: "Institutional News",
    },
];

const CRYPTO_TEMPLATES: &[Template] = &[
    Template {
        title: "Bitcoin Reaches New Price Milestone",
        summary: "Bitcoin continues its upward trajectory as institutional adoption increases globally.",
        source: "CoinDesk",
    },
    Template {
        title: "Ethereum 2.0 Staking Rewards Update",
        summary: "Latest statistics show growing participation in Ethereum staking with improved rewards.",
        source: "Ethereum Foundation",
    },
    Template {
        title: "Regulatory Clarity Boosts Crypto Market",
        summary: "New regulatory guidelines provide clearer framework for cryptocurrency operations.",
        source: "Regulatory News",
    },
    Template {
        title: "DeFi Protocol Launches New Features",
        summary: "Popular decentralized finance platform introduces innovative yield farming mechanisms.",
        source: "DeFi Pulse",
    },
];

const MINING_TEMPLATES: &[Template] = &[
    Template {
        title: "GPU Mining Profitability Analysis",
        summary: "Comprehensive analysis of current GPU mining profitability across different cryptocurrencies.",
        source: "Mining Analytics",
    },
    Template {
        title: "New ASIC Miner Released for Proof-of-Work Coins",
        summary: "Hardware manufacturer announces next-generation ASIC miner with improved efficiency.",
        source: "Hardware News",
    },
    Template {
        title: "Mining Pool Consolidation Trends",
        summary: "Analysis of mining pool market share changes and their impact on network decentralization.",
        source: "Pool Statistics",
    },
    Template {
        title: "Renewable Energy in Crypto Mining",
        summary: "Growing trend of cryptocurrency mining operations powered by renewable energy sources.",
        source: "Green Mining",
    },
];

/// Items requested per category on each load.
const FEED_PLAN: [(NewsCategory, usize); 3] = [
    (NewsCategory::Kaspa, 5),
    (NewsCategory::Crypto, 8),
    (NewsCategory::Mining, 4),
];

const HOURS_PER_WEEK: i64 = 24 * 7;

fn generate(
    category: NewsCategory,
    count: usize,
    now: DateTime<Utc>,
    rng: &mut fastrand::Rng,
) -> Vec<NewsItem> {
    let millis = now.timestamp_millis();
    category
        .templates()
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, template)| NewsItem {
            id: format!("{category}-{i}-{millis}"),
            title: template.title.to_string(),
            summary: template.summary.to_string(),
            source: template.source.to_string(),
            category,
            published_at: now - ChronoDuration::hours(rng.i64(0..HOURS_PER_WEEK)),
            url: format!("#news-{category}-{i}"),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewsSnapshot {
    pub filter: NewsFilter,
    /// Filtered items, newest first.
    pub items: Vec<NewsItem>,
}

struct NewsState {
    items: Vec<NewsItem>,
    filter: NewsFilter,
    rng: fastrand::Rng,
}

pub struct NewsManager {
    state: Mutex<NewsState>,
}

impl Default for NewsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NewsManager {
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    pub fn with_rng(rng: fastrand::Rng) -> Self {
        Self {
            state: Mutex::new(NewsState {
                items: Vec::new(),
                filter: NewsFilter::All,
                rng,
            }),
        }
    }

    /// Rebuilds the feed from every category, newest first.
    pub fn load_news(&self) -> NewsSnapshot {
        let now = Utc::now();
        let mut state = self.state.lock();
        let mut items: Vec<NewsItem> = FEED_PLAN
            .iter()
            .flat_map(|&(category, count)| generate(category, count, now, &mut state.rng))
            .collect();
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        debug!(count = items.len(), "News feed loaded");
        state.items = items;
        Self::filtered_locked(&state)
    }

    pub fn set_filter(&self, filter: NewsFilter) -> NewsSnapshot {
        let mut state = self.state.lock();
        state.filter = filter;
        Self::filtered_locked(&state)
    }

    pub fn filtered(&self) -> NewsSnapshot {
        Self::filtered_locked(&self.state.lock())
    }

    /// Case-insensitive match over title, summary and source. An empty
    /// query yields the filtered feed. The cached feed is not modified.
    pub fn search(&self, query: &str) -> Vec<NewsItem> {
        let needle = query.trim().to_lowercase();
        let state = self.state.lock();
        if needle.is_empty() {
            return Self::filtered_locked(&state).items;
        }
        state
            .items
            .iter()
            .filter(|item| item.mentions(&needle))
            .cloned()
            .collect()
    }

    fn filtered_locked(state: &NewsState) -> NewsSnapshot {
        NewsSnapshot {
            filter: state.filter,
            items: state
                .items
                .iter()
                .filter(|item| state.filter.matches(item))
                .cloned()
                .collect(),
        }
    }
}
