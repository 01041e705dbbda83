//! Provider health tracking and circuit breaking
//!
//! The canonical answer to "is provider P worth trying right now, and how
//! good is it relative to its peers". All mutation goes through the tracker's
//! two recording methods; no other component writes health state.

mod tracker;
mod types;


pub use tracker::HealthTracker;
pub use types::{CircuitState, ProviderHealthRecord, ProviderHealthSnapshot};
