//! The uniform response envelope used by every REST endpoint.
//!
//! The remote API answers every call with the same outer shape:
//!
//! ```json
//! { "status": "success", "code": 200, "msg": "Login successful", "data": { ... } }
//! ```
//!
//! Failures use the same shape with `"status": "error"` and `data: null`. The client
//! synthesizes an envelope with code 500 when no well-formed body was received.

use core::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error as ThisError;

/// Code used for envelopes synthesized locally after a transport failure.
pub const SYNTHESIZED_ERROR_CODE: u16 = 500;

/// Message for responses whose payload does not have the expected shape.
pub const UNEXPECTED_SHAPE: &str = "Unexpected response shape";

/// Outcome marker of an [`ApiEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

impl fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Uniform success/error response wrapper, parameterized by payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: EnvelopeStatus,
    pub code: u16,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Option<T>,
}

/// Why an envelope could not be turned into its payload.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum EnvelopeError {
    /// The server (or the transport layer) reported an error.
    #[error("request rejected ({code}): {msg}")]
    Rejected { code: u16, msg: String },
    /// The envelope claimed success but carried no usable payload.
    #[error("response ({code}) carried no payload: {msg}")]
    MissingData { code: u16, msg: String },
}

impl EnvelopeError {
    /// Message suitable for showing to the user.
    ///
    /// The server's message of a payload-less success is not a failure reason, so
    /// [`EnvelopeError::MissingData`] reports [`UNEXPECTED_SHAPE`] instead.
    #[must_use]
    pub fn message(&self) -> &str {
        match *self {
            Self::Rejected { ref msg, .. } => msg,
            Self::MissingData { .. } => UNEXPECTED_SHAPE,
        }
    }

    #[must_use]
    pub const fn code(&self) -> u16 {
        match *self {
            Self::Rejected { code, .. } | Self::MissingData { code, .. } => code,
        }
    }
}

impl<T> ApiEnvelope<T> {
    /// Builds a success envelope.
    pub fn success(code: u16, msg: impl Into<String>, data: T) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            code,
            msg: msg.into(),
            data: Some(data),
        }
    }

    /// Builds an error envelope without payload.
    pub fn error(code: u16, msg: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            code,
            msg: msg.into(),
            data: None,
        }
    }

    /// Builds the envelope used when no structured response was received.
    pub fn transport_error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self::error(
            SYNTHESIZED_ERROR_CODE,
            if msg.is_empty() {
                "Network Error".to_owned()
            } else {
                msg
            },
        )
    }

    /// True when the status is `success` and a payload is present.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, EnvelopeStatus::Success) && self.data.is_some()
    }

    /// Converts the envelope into its payload or the reason it has none.
    pub fn into_data(self) -> Result<T, EnvelopeError> {
        match self {
            Self {
                status: EnvelopeStatus::Success,
                data: Some(data),
                ..
            } => Ok(data),
            Self {
                status: EnvelopeStatus::Success,
                code,
                msg,
                data: None,
            } => Err(EnvelopeError::MissingData { code, msg }),
            Self {
                status: EnvelopeStatus::Error,
                code,
                msg,
                ..
            } => Err(EnvelopeError::Rejected { code, msg }),
        }
    }

    /// Maps the payload, keeping status, code and message.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiEnvelope<U> {
        ApiEnvelope {
            status: self.status,
            code: self.code,
            msg: self.msg,
            data: self.data.map(f),
        }
    }

    /// Maps the payload through a fallible projection. A payload that does not project is dropped,
    /// which [`ApiEnvelope::into_data`] later reports as [`EnvelopeError::MissingData`].
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Option<U>) -> ApiEnvelope<U> {
        ApiEnvelope {
            status: self.status,
            code: self.code,
            msg: self.msg,
            data: self.data.and_then(f),
        }
    }
}

impl ApiEnvelope<Value> {
    /// Deserializes the raw payload into `T`.
    ///
    /// A payload of the wrong shape is discarded rather than turned into an error, so the
    /// envelope stays well-formed and the caller decides how to treat the missing data.
    #[must_use]
    pub fn decode<T: DeserializeOwned>(self) -> ApiEnvelope<T> {
        self.and_then(|value| serde_json::from_value(value).ok())
    }

    /// Extracts the record nested under `key` (e.g. `data.device`) and deserializes it on top
    /// of `sent`, the body of the create call.
    ///
    /// The server only has to return the stored id: attributes it does not echo back are taken
    /// from `sent`, and echoed attributes that do not fit `T` fall back to the sent ones. A
    /// missing record or id leaves the envelope without data.
    #[must_use]
    pub fn unnest_onto<T: DeserializeOwned>(self, key: &str, sent: &Value) -> ApiEnvelope<T> {
        self.and_then(|mut value| {
            let Value::Object(received) = value.get_mut(key)?.take() else {
                return None;
            };
            let id = received.get("id").filter(|id| id.is_i64())?.clone();
            let base = sent.as_object().cloned().unwrap_or_default();

            let mut merged = base.clone();
            merged.extend(received);
            serde_json::from_value(Value::Object(merged)).ok().or_else(|| {
                let mut minimal = base;
                minimal.insert("id".to_owned(), id);
                serde_json::from_value(Value::Object(minimal)).ok()
            })
        })
    }
}
