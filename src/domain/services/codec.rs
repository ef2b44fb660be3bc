//! Request Codec
//!
//! Converts a live outgoing request to and from its storable record.

use crate::domain::entities::{DeferredRequest, OutgoingRequest};
use crate::domain::value_objects::is_bodyless_method;
use std::collections::BTreeMap;

/// Stateless serializer/deserializer for deferred requests.
pub struct RequestCodec;

impl RequestCodec {
    /// Snapshot a live request into a record.
    ///
    /// Header names are lowercased; repeated names are combined with `", "`
    /// in the order they appear. The body is read from a shared copy of the
    /// request's buffer and is captured only for methods other than GET and
    /// HEAD.
    pub fn serialize(request: &OutgoingRequest) -> DeferredRequest {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &request.headers {
            headers
                .entry(name.to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.clone());
        }

        let body = if is_bodyless_method(&request.method) {
            None
        } else {
            let copy = request.body.clone();
            Some(String::from_utf8_lossy(&copy).into_owned())
        };

        DeferredRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers,
            mode: request.mode,
            credentials: request.credentials,
            cache: request.cache,
            redirect: request.redirect,
            referrer: request.referrer.clone(),
            body,
        }
    }

    /// Rebuild a request ready to be handed to a transport.
    pub fn deserialize(record: &DeferredRequest) -> OutgoingRequest {
        OutgoingRequest {
            method: record.method.clone(),
            url: record.url.clone(),
            headers: record
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            mode: record.mode,
            credentials: record.credentials,
            cache: record.cache,
            redirect: record.redirect,
            referrer: record.referrer.clone(),
            body: record
                .body
                .as_ref()
                .map(|b| bytes::Bytes::from(b.clone()))
                .unwrap_or_default(),
        }
    }
}
