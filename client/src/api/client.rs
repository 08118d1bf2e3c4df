//! Generic HTTP request wrapper around the REST API.
//!
//! Every call resolves to an [`ApiEnvelope`]: server envelopes pass through, anything else
//! (transport errors, foreign error bodies, malformed success bodies) is folded into a
//! synthesized error envelope with code 500.

use core::fmt::Write as _;
use std::sync::Once;

use devicehub_common::{ApiEnvelope, EnvelopeStatus, SYNTHESIZED_ERROR_CODE, UNEXPECTED_SHAPE};
use reqwest::{Method, StatusCode, header};
use secrecy::{ExposeSecret as _, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::bridge::{SharedBridge, log_best_effort};
use crate::config::ApiConfig;

static INIT_RUSTLS: Once = Once::new();

/// Installs the process-wide rustls crypto provider once.
///
/// Must run before any `reqwest::Client` is built.
pub fn ensure_crypto_provider() {
    INIT_RUSTLS.call_once(|| {
        // Already installed by someone else is fine as well.
        drop(rustls::crypto::ring::default_provider().install_default());
    });
}

/// HTTP client bound to one API base URL.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    bridge: SharedBridge,
}

impl ApiClient {
    /// Builds a client with the configured base URL and request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig, bridge: SharedBridge) -> Result<Self, reqwest::Error> {
        ensure_crypto_provider();
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            bridge,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues one request and normalizes the outcome to an envelope.
    ///
    /// A bearer token is attached when `auth_token` is given.
    #[tracing::instrument(skip(self, body, auth_token), fields(base_url = %self.base_url))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        auth_token: Option<&SecretString>,
    ) -> ApiEnvelope<T> {
        let url = format!("{}{path}", self.base_url);
        self.log_request(&method, &url, body, auth_token.is_some()).await;

        let mut builder = self.http.request(method, &url);
        if let Some(token) = auth_token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, "Request failed: {e}");
                log_best_effort(&*self.bridge, &format!("API Response Error: {url}\nError: {e}"))
                    .await;
                return ApiEnvelope::transport_error(e.to_string());
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                log_best_effort(&*self.bridge, &format!("API Response Error: {url}\nError: {e}"))
                    .await;
                return ApiEnvelope::transport_error(e.to_string());
            }
        };
        self.log_response(status, &url, &text).await;

        normalize_response(status, &text)
    }

    async fn log_request(&self, method: &Method, url: &str, body: Option<&Value>, bearer: bool) {
        let mut headers = json!({ "Content-Type": "application/json" });
        if bearer {
            headers["Authorization"] = Value::from("Bearer [REDACTED]");
        }
        let mut line = format!("API Request: {method} {url}\nHeaders: {headers}");
        if let Some(body) = body {
            drop(write!(line, "\nBody: {}", redact_body(body)));
        }
        log_best_effort(&*self.bridge, &line).await;
    }

    async fn log_response(&self, status: StatusCode, url: &str, text: &str) {
        let line = if status.is_success() {
            format!("API Response: {} {url}\nData: {text}", status.as_u16())
        } else {
            format!("API Response Error: {} {url}\nData: {text}", status.as_u16())
        };
        log_best_effort(&*self.bridge, &line).await;
    }
}

/// Copy of `body` with password fields masked, for logging.
fn redact_body(body: &Value) -> Value {
    let mut redacted = body.clone();
    if let Some(password) = redacted.get_mut("password") {
        *password = Value::from("[REDACTED]");
    }
    redacted
}

/// Turns a raw HTTP outcome into an envelope of `T`.
fn normalize_response<T: DeserializeOwned>(status: StatusCode, text: &str) -> ApiEnvelope<T> {
    let parsed = serde_json::from_str::<ApiEnvelope<Value>>(text);

    if !status.is_success() {
        return match parsed {
            Ok(envelope) => decode_payload(envelope),
            Err(_) => ApiEnvelope::transport_error(format!(
                "Request failed with status code {}",
                status.as_u16()
            )),
        };
    }

    match parsed {
        Ok(envelope) => decode_payload(envelope),
        Err(e) => {
            debug!("Response body is not an envelope: {e}");
            ApiEnvelope::error(SYNTHESIZED_ERROR_CODE, UNEXPECTED_SHAPE)
        }
    }
}

fn decode_payload<T: DeserializeOwned>(envelope: ApiEnvelope<Value>) -> ApiEnvelope<T> {
    match envelope {
        ApiEnvelope {
            status: EnvelopeStatus::Success,
            data: Some(data),
            code,
            msg,
        } => match serde_json::from_value(data) {
            Ok(data) => ApiEnvelope::success(code, msg, data),
            Err(e) => {
                debug!("Response payload has unexpected shape: {e}");
                ApiEnvelope::error(SYNTHESIZED_ERROR_CODE, UNEXPECTED_SHAPE)
            }
        },
        // `data` of an error envelope is not interpreted
        other => ApiEnvelope {
            status: other.status,
            code: other.code,
            msg: other.msg,
            data: None,
        },
    }
}
