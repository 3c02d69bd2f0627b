#![doc = include_str!("../docs/rustdoc.md")]

/// Application context and interactive command loop.
pub mod app;
/// Named-event subscriber registry with failure isolation.
pub mod bus;
/// Event channel client: connection lifecycle, reconnects and dispatch.
pub mod channel;
/// Price history series and period selection.
pub mod charts;
/// Command-line argument definitions.
pub mod cli;
/// Connection state machine and reconnect budgeting.
pub mod client_state;
/// Runtime configuration model.
pub mod config;
/// Dashboard widgets and pushed-update merging.
pub mod dashboard;
/// Error types used across the crate.
pub mod error;
/// Connection status events between the channel and the UI.
pub mod events;
/// Terminal output formatters.
pub mod formatter;
/// HTTP gateway to the dashboard backend.
pub mod gateway;
/// Simulated mining sessions.
pub mod mining;
/// Prometheus metrics.
pub mod monitoring;
/// Generated news feed with filtering and search.
pub mod news;
/// Interval-driven section refresh.
pub mod refresh;
/// Section navigation.
pub mod router;
/// Cancellable repeating timers.
pub mod timer;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Backend and channel data models.
pub mod types;
/// Connection indicator and terminal views.
pub mod ui;
/// Wallet listing, creation and form validation.
pub mod wallet;

/// Primary crate error type.
pub use error::DashboardError;
