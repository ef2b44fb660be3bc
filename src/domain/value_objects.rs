//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};

/// Named sequence inside the queue store.
///
/// The live queue holds pending work. The shadow queue holds the records
/// reserved by the flush currently in progress and is empty otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueKey {
    /// Pending records, FIFO (`queue`)
    Live,
    /// In-flight copy during an active flush (`shadow-queue`)
    Shadow,
}

impl QueueKey {
    /// Storage key used by queue store adapters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "queue",
            Self::Shadow => "shadow-queue",
        }
    }
}

impl std::fmt::Display for QueueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of an HTTP status code.
///
/// The interceptor and the flush engine both branch on this:
/// - `Success` and `ClientError` are completed exchanges for the interceptor
/// - only `ServerError` (and transport failures) lead to a requeue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Status below 400
    Success,
    /// Status in 400..=499
    ClientError,
    /// Status 500 and above
    ServerError,
}

impl ResponseClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            0..=399 => Self::Success,
            400..=499 => Self::ClientError,
            _ => Self::ServerError,
        }
    }

    pub fn should_requeue(&self) -> bool {
        matches!(self, Self::ServerError)
    }
}

/// Whether a method never carries a body and is never intercepted.
pub fn is_bodyless_method(method: &str) -> bool {
    method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD")
}
