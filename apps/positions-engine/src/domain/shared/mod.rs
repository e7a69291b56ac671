//! Shared kernel: value objects used by every bounded context.

mod quantity;
mod side;
pub mod tolerance;

pub use quantity::{round_to_lot, round_to_step};
pub use side::Side;
