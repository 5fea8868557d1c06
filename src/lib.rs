//! cluster-health ingests the stream of firing alerts from the cluster
//! telemetry store and derives two restart-stable outputs: a per-alert
//! component health map and an incident grouping under stable group ids.
//!
//! All state is in memory; at cold start the grouping is reconstructed from
//! the alert history and reconciled with the previously emitted health map,
//! so incident identity survives restarts without durable storage.

pub mod classify;
pub mod common;
pub mod config;
pub mod error;
pub mod grouping;
pub mod intervals;
pub mod matchers;
pub mod processor;
pub mod server;
pub mod telemetry;

pub use error::{AnalyzerError, AnalyzerResult};
