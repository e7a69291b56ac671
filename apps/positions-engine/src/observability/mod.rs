//! Observability module for logging.
//!
//! Logs are the only observability channel of the engine. Warnings that the
//! host should surface to the user carry the structured field
//! `highlight = true`.

mod logging;

pub use logging::{LoggingError, init_logging, span_names};
