//! Security identity value object.

mod identity;

pub use identity::SecurityIdentity;
