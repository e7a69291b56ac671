// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Positions Engine - Rust Core Library
//!
//! Position and risk state machine for option market-making handlers running
//! inside a bar-driven host.
//!
//! # Architecture
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: value objects and pure rules
//!   - `security`: instrument identity
//!   - `position`: stored records and live snapshots
//!   - `intent`: volatility targets and queued orders
//!   - `smile`: volatility curves and smile snapshots
//!
//! - **Application**: ports, stores, services and the [`PositionsManager`]
//!
//! - **Infrastructure**: in-memory key/value cache and a simulated host
//!
//! - **Pricing**: Black option pricing and implied-volatility inversion
//!
//! # Step protocol
//!
//! Every bar the host calls [`PositionsManager::execute`] before any trading
//! call. Virtual positions live only in the host's book, so they are rebuilt
//! from the persisted records each step; orders placed before readiness is
//! confirmed are skipped.

/// Domain layer - value objects and pure rules.
pub mod domain;

/// Application layer - ports, stores, services and the manager.
pub mod application;

/// Infrastructure layer - adapters.
pub mod infrastructure;

/// Option pricing primitives.
pub mod pricing;

/// Configuration loading.
pub mod config;

/// Structured logging setup.
pub mod observability;

/// Error types.
pub mod error;

pub use application::manager::{OrderOutcome, PositionsManager, SkipReason, StepReport, StepRequest};
pub use application::ports::{KeyValueStore, Security, SecurityResolver, TradingContext};
pub use application::services::{EffectiveIv, EffectiveIvError, EffectiveIvSolver};
pub use application::sources::{OptionSeries, SingleSecuritySource, StrikePair};
pub use config::{Config, ConfigError, ManagerConfig, load_config};
pub use domain::intent::{IvTarget, PendingOrder, QuoteMode, VolQuote};
pub use domain::position::{PositionRecord, PositionSnapshot, TotalProfitAlgo};
pub use domain::security::SecurityIdentity;
pub use domain::shared::Side;
pub use domain::smile::SmileInfo;
pub use error::{PersistenceError, PositionsError};
