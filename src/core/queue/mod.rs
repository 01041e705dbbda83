//! Rate-limited request queue
//!
//! One queue per provider. Guarantees a single in-flight request at a time,
//! enforces minimum spacing between requests, and escalates a cooldown window
//! when the provider signals a rate limit. Queues of different providers are
//! fully independent.

mod queue;


pub use queue::RequestQueue;
