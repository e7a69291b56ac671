//! Application Layer
//!
//! Orchestration of domain rules against the host:
//!
//! - **Ports**: traits the host implements (context, securities, key/value store)
//! - **Stores**: typed lists persisted through the key/value port
//! - **Services**: PnL aggregation and the effective-IV search
//! - **Sources**: resolvers for single securities and option series
//! - **Manager**: the per-bar position/risk state machine

pub mod manager;
pub mod ports;
pub mod services;
pub mod sources;
pub mod stores;

pub use manager::{OrderOutcome, PositionsManager, SkipReason, StepReport, StepRequest};
