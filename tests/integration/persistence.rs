//! State surviving a restart of the client.

use std::sync::Arc;

use devicehub_client::app::ProvisionRefusal;

use crate::common::{MockApi, RecordingBridge, USER_ID, context, signed_in_context, temp_state_path};

#[tokio::test]
async fn test_restart_restores_session_and_devices() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("restart");

    let (session, devices) = {
        let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;
        ctx.provision(false).await.unwrap();
        let state = ctx.store().snapshot();
        (state.auth.session.clone(), state.home.devices.clone())
    };
    assert_eq!(devices.len(), 1);

    let restarted = context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;
    let state = restarted.store().snapshot();
    assert_eq!(state.auth.session, session);
    assert_eq!(state.home.devices, devices);
    assert!(state.home.current_device.is_none(), "current device is not persisted");
    assert!(state.auth.error.is_none());
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_restart_refuses_duplicate_device_unless_forced() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("duplicate");
    {
        let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;
        ctx.provision(false).await.unwrap();
    }

    let restarted = context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;
    let refusal = restarted.provision(false).await.unwrap_err();
    assert!(
        matches!(refusal, ProvisionRefusal::AlreadyProvisioned { owner_id: USER_ID, .. }),
        "unexpected refusal: {refusal}"
    );
    assert_eq!(mock.count("/devices/"), 1);

    let report = restarted.provision(true).await.expect("forced run should start");
    assert!(report.is_complete(), "forced run incomplete: {report}");
    assert_eq!(mock.count("/devices/"), 2);
    assert_eq!(restarted.store().snapshot().home.devices.len(), 2);
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_logout_is_persisted() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("logout_persisted");
    {
        let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;
        ctx.logout().await;
    }
    let restarted = context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;
    assert!(restarted.store().session().is_none());
    drop(std::fs::remove_file(&state_path));
}
