mod connectivity;
mod intercept_port;
mod notify_port;
mod queue_store;
mod request_transport;
mod trigger_port;

pub use connectivity::ConnectivityProbe;
pub use intercept_port::InterceptPort;
pub use notify_port::NotifyPort;
pub use queue_store::QueueStore;
pub use request_transport::RequestTransport;
pub use trigger_port::TriggerPort;
