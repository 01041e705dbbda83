//! Provider adapters
//!
//! Each backing mailbox service gets one adapter implementing
//! [`MailProvider`]. Adapters translate heterogeneous wire formats into the
//! shared [`crate::core::types`] shapes and tag failures with the typed
//! [`ProviderError`] taxonomy the aggregator branches on.

pub mod base_provider;
pub mod dropmail;
pub mod error;
pub mod guerrilla;
pub mod mail_tm;
pub mod registry;
mod shared;

pub use base_provider::MailProvider;
pub use dropmail::DropMailProvider;
pub use error::ProviderError;
pub use guerrilla::GuerrillaProvider;
pub use mail_tm::MailTmProvider;
pub use registry::{ProviderEntry, ProviderRegistry};
