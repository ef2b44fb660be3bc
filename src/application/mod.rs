//! Application Layer
//!
//! Use cases wiring the domain ports together: the flush engine owning the
//! queue, the interceptor in front of the network, the notifier, and the
//! trigger dispatcher.

mod flush_engine;
mod interceptor;
mod notifier;
mod triggers;

#[cfg(test)]
pub(crate) mod test_support;

pub use flush_engine::{FlushEngine, ReplayOutcome, ReplayRun};
pub use interceptor::Interceptor;
pub use notifier::Notifier;
pub use triggers::{spawn_ticker, TriggerDispatcher, DEFAULT_FLUSH_INTERVAL};
