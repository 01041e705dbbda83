//! Core gateway subsystems
//!
//! The resilience pipeline reads bottom-up: [`types`] are the shared shapes,
//! [`providers`] talk to the wire, every call goes through a per-provider
//! [`queue`], outcomes feed [`health`], and [`aggregator`] ties selection,
//! failover, and the account lifecycle together.

pub mod aggregator;
pub mod health;
pub mod providers;
pub mod queue;
pub mod types;
