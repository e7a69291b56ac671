//! Application Ports (Driven)
//!
//! Everything the core needs from its host: live securities and their
//! position books, the trading context, a key/value cache, and the lookup
//! capability that distinguishes option-chain and single-security callers.

mod context_port;
mod resolver_port;
mod security_port;
mod store_port;

pub use context_port::TradingContext;
pub use resolver_port::{QuoteTerms, SecurityResolver};
pub use security_port::{HostError, OrderTicket, Security};
pub use store_port::{CacheKey, CacheOwner, CacheScope, KeyValueStore, ManagerKind, Pinned, StoreKind};
