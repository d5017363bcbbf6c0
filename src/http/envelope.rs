//! The `{status, message}` body used for every reply the server writes on
//! its own behalf (missing route, receive failure, serialization failure).

use serde::{Deserialize, Serialize};

use crate::http::response::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Decimal status code as a string, e.g. `"404"`.
    pub status: String,
    pub message: String,
}

impl Envelope {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16().to_string(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Vec<u8> {
        // Two string fields always serialize.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
