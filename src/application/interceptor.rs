//! Interceptor - immediate send with deferral on failure
//!
//! Mutating requests are sent right away. If the exchange fails at the
//! transport level or the server answers 5xx, the request is snapshotted
//! into the live queue and the caller receives a synthetic 202.

use crate::application::FlushEngine;
use crate::domain::entities::{OutgoingRequest, TransportResponse};
use crate::domain::errors::InterceptError;
use crate::domain::ports::{InterceptPort, RequestTransport};
use crate::domain::services::RequestCodec;
use crate::domain::value_objects::{is_bodyless_method, ResponseClass};
use async_trait::async_trait;
use std::sync::Arc;

pub struct Interceptor {
    engine: Arc<FlushEngine>,
    transport: Arc<dyn RequestTransport>,
}

impl Interceptor {
    pub fn new(engine: Arc<FlushEngine>, transport: Arc<dyn RequestTransport>) -> Self {
        Self { engine, transport }
    }

    async fn defer(&self, request: &OutgoingRequest) -> Result<TransportResponse, InterceptError> {
        self.engine.enqueue(RequestCodec::serialize(request)).await?;
        Ok(TransportResponse::accepted())
    }
}

#[async_trait]
impl InterceptPort for Interceptor {
    async fn handle(&self, request: OutgoingRequest) -> Result<TransportResponse, InterceptError> {
        if is_bodyless_method(&request.method) {
            return Ok(self.transport.send(request).await?);
        }

        let original = request.clone();
        match self.transport.send(request).await {
            Ok(response) if !ResponseClass::from_status(response.status).should_requeue() => {
                Ok(response)
            }
            Ok(response) => {
                tracing::warn!(
                    method = %original.method,
                    url = %original.url,
                    status = response.status,
                    "server error, deferring request"
                );
                self.defer(&original).await
            }
            Err(e) => {
                tracing::warn!(
                    method = %original.method,
                    url = %original.url,
                    error = %e,
                    "send failed, deferring request"
                );
                self.defer(&original).await
            }
        }
    }
}
