//! Wire records exchanged between relay clients and replicas.
//!
//! Each record travels as one line of compact JSON. `serde_json` escapes
//! control characters inside strings, so an encoded record never contains a
//! raw newline and the newline delimiter stays unambiguous.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identity of one client process.
pub type ClientId = u32;

/// Per-client sequence number of one logical command.
pub type RequestId = u64;

/// A command submitted to the replicated service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Identity of the submitting client.
    #[serde(rename = "ClientID")]
    pub client_id: ClientId,
    /// Sequence number of this command.
    #[serde(rename = "RequestID")]
    pub request_id: RequestId,
    /// Whether the command must be durably replicated before replying.
    #[serde(rename = "Replicate")]
    pub replicate: bool,
    /// Opaque command text.
    #[serde(rename = "Command")]
    pub command: String,
}

/// A replica's answer to a [`ClientRequest`].
///
/// The default value (zero identifiers, empty payload) is what a replica
/// produces when it has nothing to say; clients treat it as invalid. Missing
/// fields decode to their zero values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientResponse {
    /// Echo of the request's client identity.
    #[serde(rename = "ClientID")]
    pub client_id: ClientId,
    /// Echo of the request's sequence number.
    #[serde(rename = "RequestID")]
    pub request_id: RequestId,
    /// Result payload.
    #[serde(rename = "Response")]
    pub response: String,
}

impl ClientResponse {
    /// Reports whether this is the empty default record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reports whether the response answers `request`.
    #[must_use]
    pub const fn answers(&self, request: &ClientRequest) -> bool {
        self.client_id == request.client_id && self.request_id == request.request_id
    }
}

/// Errors raised while translating records to and from wire lines.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A record could not be serialised.
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
    /// A line was not a valid record.
    #[error("failed to decode record: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encodes a request as a single line, without the trailing delimiter.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when serialisation fails.
pub fn encode_request(request: &ClientRequest) -> Result<String, CodecError> {
    serde_json::to_string(request).map_err(CodecError::Encode)
}

/// Decodes a request line. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the line is not a request record.
pub fn decode_request(line: &str) -> Result<ClientRequest, CodecError> {
    serde_json::from_str(line.trim()).map_err(CodecError::Decode)
}

/// Encodes a response as a single line, without the trailing delimiter.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when serialisation fails.
pub fn encode_response(response: &ClientResponse) -> Result<String, CodecError> {
    serde_json::to_string(response).map_err(CodecError::Encode)
}

/// Decodes a response line. Surrounding whitespace is ignored and a JSON
/// `null` decodes to the default record.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the line is not a response record.
pub fn decode_response(line: &str) -> Result<ClientResponse, CodecError> {
    serde_json::from_str::<Option<ClientResponse>>(line.trim())
        .map(Option::unwrap_or_default)
        .map_err(CodecError::Decode)
}
