//! Sign-in and sign-up against the REST API.

use devicehub_common::{
    ApiEnvelope, LoginPayload, RegisterPayload, Role, SYNTHESIZED_ERROR_CODE, Session,
};
use secrecy::SecretString;
use serde::Serialize;
use tracing::info;

use crate::api::{ApiClient, Method};

/// Maps authentication operations onto API calls.
#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `POST /login`.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: SecretString) -> ApiEnvelope<Session> {
        let payload = LoginPayload {
            email: email.to_owned(),
            password,
        };
        let envelope = self.post("/login", &payload).await;
        if envelope.is_success() {
            info!("Login accepted");
        }
        envelope
    }

    /// `POST /signup`. New accounts are always plain users with an empty balance.
    #[tracing::instrument(skip_all, fields(email = %payload.email))]
    pub async fn register(&self, mut payload: RegisterPayload) -> ApiEnvelope<Session> {
        payload.role = Role::User;
        payload.balance = 0.0;
        self.post("/signup", &payload).await
    }

    async fn post<P: Serialize>(&self, path: &str, payload: &P) -> ApiEnvelope<Session> {
        let body = match serde_json::to_value(payload) {
            Ok(body) => body,
            Err(e) => return ApiEnvelope::error(SYNTHESIZED_ERROR_CODE, e.to_string()),
        };
        self.client
            .request(Method::POST, path, Some(&body), None)
            .await
    }
}
