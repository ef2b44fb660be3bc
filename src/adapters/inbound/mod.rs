mod api_server;
mod proxy_server;

pub use api_server::{ApiServer, ApiState};
pub use proxy_server::{ProxyServer, ProxyState};

// Re-export for external use (e.g., integration tests)
pub use api_server::router as api_router;
pub use proxy_server::router as proxy_router;
