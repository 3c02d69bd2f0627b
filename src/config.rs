/// file: src/config.rs
/// description: runtime configuration; every endpoint, interval and limit is injectable
use crate::{cli::Args, router::Section};
use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub channel: ChannelConfig,
    pub refresh: RefreshConfig,
    pub metrics: MetricsConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: Url,
    pub reconnect_delay: Duration,
    /// 0 means retry forever.
    pub max_reconnects: u32,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub dashboard_interval: Duration,
    pub news_interval: Duration,
    pub mining_tick: Duration,
    pub history_days: u32,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub initial_section: Section,
    pub colored: bool,
    pub quiet: bool,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let base_url = parse_base_url(&args.api_url)?;
        let ws_url = Url::parse(&args.ws_url).context("invalid --ws-url")?;
        let initial_section: Section = args
            .section
            .parse()
            .with_context(|| format!("invalid --section '{}'", args.section))?;

        Ok(Config {
            api: ApiConfig {
                base_url,
                timeout: Duration::from_secs(args.request_timeout),
            },
            channel: ChannelConfig {
                url: ws_url,
                reconnect_delay: Duration::from_secs(args.reconnect_delay),
                max_reconnects: args.max_reconnects,
                connect_timeout: Duration::from_secs(args.request_timeout),
            },
            refresh: RefreshConfig {
                dashboard_interval: Duration::from_secs(args.dashboard_refresh),
                news_interval: Duration::from_secs(args.news_refresh),
                mining_tick: Duration::from_secs(args.mining_tick),
                history_days: args.history_days,
            },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            ui: UiConfig {
                initial_section,
                colored: !args.no_color,
                quiet: args.quiet,
            },
        })
    }

    /// Configuration for the given endpoints with the stock intervals and
    /// limits (the same values the CLI defaults to).
    pub fn with_endpoints(base_url: Url, ws_url: Url) -> Self {
        Config {
            api: ApiConfig {
                base_url,
                timeout: Duration::from_secs(10),
            },
            channel: ChannelConfig {
                url: ws_url,
                reconnect_delay: Duration::from_secs(5),
                max_reconnects: 5,
                connect_timeout: Duration::from_secs(10),
            },
            refresh: RefreshConfig {
                dashboard_interval: Duration::from_secs(30),
                news_interval: Duration::from_secs(15 * 60),
                mining_tick: Duration::from_secs(2),
                history_days: 7,
            },
            metrics: MetricsConfig {
                enabled: false,
                port: 9090,
            },
            ui: UiConfig {
                initial_section: Section::Dashboard,
                colored: true,
                quiet: false,
            },
        }
    }
}

/// Parses the api root so that relative endpoint joins keep its path
/// (`http://host/api/v1` + `prices/current` → `http://host/api/v1/prices/current`).
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("invalid api url '{raw}'"))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_match_cli_defaults() {
        let args = Args::parse_from(["kaspazof"]);
        let from_cli = Config::from_args(&args).unwrap();
        let default = Config::with_endpoints(
            parse_base_url("http://localhost:8000/api/v1").unwrap(),
            Url::parse("ws://localhost:8000/ws").unwrap(),
        );

        assert_eq!(from_cli.api.base_url, default.api.base_url);
        assert_eq!(from_cli.channel.url, default.channel.url);
        assert_eq!(from_cli.channel.max_reconnects, default.channel.max_reconnects);
        assert_eq!(from_cli.channel.reconnect_delay, default.channel.reconnect_delay);
        assert_eq!(
            from_cli.refresh.dashboard_interval,
            default.refresh.dashboard_interval
        );
        assert_eq!(from_cli.refresh.news_interval, Duration::from_secs(900));
        assert_eq!(from_cli.api.timeout, Duration::from_secs(10));
        assert_eq!(from_cli.ui.initial_section, Section::Dashboard);
    }

    #[test]
    fn base_url_keeps_version_path() {
        let url = parse_base_url("http://localhost:8000/api/v1").unwrap();
        assert_eq!(
            url.join("prices/current").unwrap().as_str(),
            "http://localhost:8000/api/v1/prices/current"
        );
    }

    #[test]
    fn rejects_unknown_initial_section() {
        let args = Args::parse_from(["kaspazof", "--section", "casino"]);
        assert!(Config::from_args(&args).is_err());
    }
}
