//! Sign-in, sign-up and sign-out through the application context.

use std::sync::Arc;

use devicehub_common::{EnvelopeError, RegisterPayload, Role};
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::json;

use crate::common::{
    ACCESS_TOKEN, MockApi, RecordingBridge, USER_ID, context, signed_in_context, temp_state_path,
};

#[tokio::test]
async fn test_invalid_credentials_leave_session_empty() {
    let mock = MockApi::start().await;
    mock.fail("/login", 401, "Invalid credentials");
    let state_path = temp_state_path("invalid_credentials");
    let ctx = context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    let err = ctx
        .login("a@b.com", SecretString::from("pw"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EnvelopeError::Rejected {
            code: 401,
            msg: "Invalid credentials".to_string()
        }
    );

    let state = ctx.store().snapshot();
    assert!(state.auth.session.is_none());
    assert_eq!(state.auth.error.as_deref(), Some("Invalid credentials"));
    assert!(!state.auth.loading, "loading should be cleared after rejection");
}

#[tokio::test]
async fn test_login_success_stores_session() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("login_success");
    let bridge = Arc::new(RecordingBridge::default());
    let ctx = context(&mock, Arc::clone(&bridge), &state_path).await;

    let session = ctx
        .login("a@b.com", SecretString::from("pw"))
        .await
        .expect("login should succeed");
    assert_eq!(session.user.id, USER_ID);
    assert_eq!(session.access_token.expose_secret(), ACCESS_TOKEN);

    let state = ctx.store().snapshot();
    assert_eq!(state.auth.session.as_ref(), Some(&session));
    assert!(state.auth.error.is_none());

    let request = mock.request_to("/login").unwrap();
    assert_eq!(request.body, json!({ "email": "a@b.com", "password": "pw" }));
    assert!(request.authorization.is_none(), "login must not carry a token");

    assert!(
        bridge.lines().iter().any(|l| l == "Attempting login..."),
        "login attempt not logged"
    );
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_register_forces_user_role_and_zero_balance() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("register");
    let ctx = context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    let session = ctx
        .register(RegisterPayload {
            name: "New User".to_string(),
            age: 25,
            email: "new@user.io".to_string(),
            address: "Addr".to_string(),
            role: Role::Admin,
            password: SecretString::from("pw"),
            balance: 1_000.0,
            phone_number: 555,
        })
        .await
        .expect("sign-up should succeed");

    let body = mock.request_to("/signup").unwrap().body;
    assert_eq!(body["role"], "user");
    assert_eq!(body["balance"], 0.0);
    assert_eq!(body["email"], "new@user.io");
    assert_eq!(session.user.email, "new@user.io");
    assert_eq!(ctx.store().session(), Some(session));
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_rejection_without_message_is_unknown_error() {
    let mock = MockApi::start().await;
    mock.fail("/signup", 400, "");
    let state_path = temp_state_path("unknown_error");
    let ctx = context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    let result = ctx
        .register(RegisterPayload {
            name: "X".to_string(),
            age: 1,
            email: "x@y.z".to_string(),
            address: String::new(),
            role: Role::User,
            password: SecretString::from("pw"),
            balance: 0.0,
            phone_number: 0,
        })
        .await;
    assert!(result.is_err(), "rejected sign-up should fail");
    assert_eq!(
        ctx.store().snapshot().auth.error.as_deref(),
        Some("Unknown error")
    );
}

#[tokio::test]
async fn test_logout_clears_session_and_rearms_provisioning() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("logout");
    let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    ctx.provisioner().trigger(Some(USER_ID)).await.unwrap();
    assert!(ctx.provisioner().has_triggered(), "guard should be consumed");

    ctx.logout().await;
    assert!(ctx.store().session().is_none());
    assert!(!ctx.provisioner().has_triggered(), "logout should re-arm the guard");
    drop(std::fs::remove_file(&state_path));
}
