//! Core library for the ktop cluster dashboard
//!
//! This crate provides:
//! - The cluster snapshot model and its aggregates
//! - A resource-state source trait with a Kubernetes implementation
//! - The collector, its snapshot store and polling loop
//! - Sorting, filtering and formatting helpers for presentation
//! - JSON export documents
//! - Health tracking and Prometheus self-metrics

pub mod collector;
pub mod error;
pub mod export;
pub mod format;
pub mod health;
pub mod models;
pub mod observability;
pub mod query;
pub mod source;

pub use collector::{Collector, PollingLoop, RefreshHandle, SnapshotReader};
pub use error::{CollectError, CollectWarning};
pub use health::{Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse};
pub use models::*;
pub use observability::{CollectorMetrics, StructuredLogger};
