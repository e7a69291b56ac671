//! Infrastructure Layer
//!
//! In-process adapters for the driven ports: a pinned-aware key/value cache
//! and a simulated host (securities with a position book, trading context).
//! Both back the test suite and serve as a reference embedding.

pub mod cache;
pub mod sim;
