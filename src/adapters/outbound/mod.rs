mod connectivity_probe;
mod memory_queue_store;
mod reqwest_transport;
mod sqlite_queue_store;
mod webhook_notify_port;

pub use connectivity_probe::{HttpConnectivityProbe, SignalConnectivityProbe};
pub use memory_queue_store::MemoryQueueStore;
pub use reqwest_transport::ReqwestTransport;
pub use sqlite_queue_store::SqliteQueueStore;
pub use webhook_notify_port::{
    ListenerRegistry, ListenerStatus, RegisteredListener, WebhookNotifyPort,
};
