//! request-deferrer Library
//!
//! Offline deferral of mutating HTTP requests: failed writes are persisted
//! to a durable queue and replayed in order once the network is back.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{FlushEngine, Interceptor, Notifier, TriggerDispatcher};
pub use config::load_config;
pub use domain::entities::{DeferredRequest, FlushReport, OutgoingRequest, ReplayMessage, TransportResponse};
pub use domain::ports::{ConnectivityProbe, InterceptPort, NotifyPort, QueueStore, RequestTransport, TriggerPort};
pub use domain::services::RequestCodec;
pub use domain::value_objects::{QueueKey, ResponseClass};
pub use infrastructure::ShutdownController;
