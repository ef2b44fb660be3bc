//! Adapters Layer
//!
//! Inbound adapters drive the application; outbound adapters implement its ports.

pub mod inbound;
pub mod outbound;
