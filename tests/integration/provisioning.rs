//! Device provisioning chain against the mock API.

use std::sync::Arc;

use devicehub_client::app::ProvisionRefusal;
use devicehub_client::provision::StepOutcome;
use devicehub_common::{ComponentKind, UNEXPECTED_SHAPE};
use serde_json::json;

use crate::common::{
    ACCESS_TOKEN, MockApi, RecordingBridge, USER_ID, context, signed_in_context, temp_state_path,
};

const FULL_CHAIN: [&str; 9] = [
    "/devices/",
    "/cpus/",
    "/devicecpus/",
    "/gpus/",
    "/devicegpus/",
    "/disks/",
    "/devicedisks/",
    "/rams/",
    "/devicerams/",
];

fn provisioning_paths(mock: &MockApi) -> Vec<String> {
    mock.paths().into_iter().filter(|p| p != "/login").collect()
}

#[tokio::test]
async fn test_full_chain_creates_then_links_in_order() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("full_chain");
    let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    let report = ctx.provision(false).await.expect("provisioning should start");
    assert!(report.is_complete(), "incomplete report: {report}");
    assert_eq!(provisioning_paths(&mock), FULL_CHAIN);

    let device = report.device.completed().unwrap().clone();
    assert_eq!(device.owner_id, USER_ID);
    assert_eq!(device.status, "ACTIVE");
    assert_eq!(device.location, "Server Room A");

    // Each link references the component created just before it
    for kind in ComponentKind::ALL {
        let component = report.component(kind).unwrap();
        let component_id = *component.component.completed().unwrap();
        let link_body = mock.request_to(kind.link_path()).unwrap().body;
        assert_eq!(link_body[kind.link_id_field()], component_id);
        assert_eq!(link_body["device_id"], device.id);
    }

    let expected_auth = format!("Bearer {ACCESS_TOKEN}");
    for request in mock.requests().iter().filter(|r| r.path != "/login") {
        assert_eq!(
            request.authorization.as_deref(),
            Some(expected_auth.as_str()),
            "missing token on {}",
            request.path
        );
    }

    let state = ctx.store().snapshot();
    assert!(!state.home.provisioning, "flag should be cleared after settling");
    assert_eq!(state.home.current_device.as_ref(), Some(&device));
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_payloads_carry_system_info() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("payloads");
    let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;
    ctx.provision(false).await.unwrap();

    let cpu = mock.request_to("/cpus/").unwrap().body;
    assert_eq!(cpu["model_name"], "Test CPU 9000");
    assert_eq!(cpu["threads"], 24);
    assert_eq!(mock.request_to("/gpus/").unwrap().body["model_name"], "Test GPU 42");
    assert_eq!(mock.request_to("/disks/").unwrap().body["capacity_gb"], 2000);
    let ram = mock.request_to("/rams/").unwrap().body;
    assert_eq!(ram["size_gb"], 32);
    assert_eq!(ram["type"], "DDR4");
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_missing_system_info_uses_placeholders() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("placeholders");
    let bridge = Arc::new(RecordingBridge::failing_system_info());
    let ctx = signed_in_context(&mock, Arc::clone(&bridge), &state_path).await;

    let report = ctx.provision(false).await.unwrap();
    assert!(report.is_complete(), "placeholders should still provision: {report}");
    assert_eq!(
        mock.request_to("/cpus/").unwrap().body["model_name"],
        "Placeholder CPU Model"
    );
    assert_eq!(
        mock.request_to("/gpus/").unwrap().body["model_name"],
        "Placeholder GPU Model"
    );
    assert!(
        bridge.lines().iter().any(|l| l.starts_with("Failed to get system info")),
        "system info failure not logged"
    );
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_trigger_twice_creates_one_device() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("one_shot");
    let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    let first = ctx.provisioner().trigger(Some(USER_ID)).await;
    let second = ctx.provisioner().trigger(Some(USER_ID)).await;
    assert!(first.is_some(), "first trigger should run");
    assert!(second.is_none(), "second trigger should be a no-op");
    assert_eq!(mock.count("/devices/"), 1);
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_trigger_without_valid_user_keeps_guard_armed() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("no_user");
    let ctx = context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    assert!(ctx.provisioner().trigger(None).await.is_none());
    assert!(ctx.provisioner().trigger(Some(0)).await.is_none());
    assert!(!ctx.provisioner().has_triggered(), "guard consumed without a user");
    assert_eq!(mock.count("/devices/"), 0);

    assert!(ctx.provisioner().trigger(Some(USER_ID)).await.is_some());
    assert_eq!(mock.count("/devices/"), 1);
}

#[tokio::test]
async fn test_cpu_failure_does_not_stop_other_components() {
    let mock = MockApi::start().await;
    mock.fail("/cpus/", 422, "Validation failed");
    let state_path = temp_state_path("cpu_failure");
    let bridge = Arc::new(RecordingBridge::default());
    let ctx = signed_in_context(&mock, Arc::clone(&bridge), &state_path).await;

    let report = ctx.provision(false).await.unwrap();
    let cpu = report.component(ComponentKind::Cpu).unwrap();
    assert_eq!(cpu.component, StepOutcome::Failed("Validation failed".to_string()));
    assert_eq!(cpu.link, StepOutcome::Skipped);
    assert_eq!(mock.count("/devicecpus/"), 0, "no link without a component id");

    for kind in [ComponentKind::Gpu, ComponentKind::Disk, ComponentKind::Ram] {
        let component = report.component(kind).unwrap();
        assert!(component.component.is_completed(), "{kind} not created");
        assert!(component.link.is_completed(), "{kind} not linked");
    }

    let state = ctx.store().snapshot();
    assert_eq!(state.home.devices.len(), 1, "device should persist without CPU link");
    assert_eq!(
        state.home.component(ComponentKind::Cpu).unwrap().error.as_deref(),
        Some("Validation failed")
    );
    assert!(
        bridge.lines().iter().any(|l| l.starts_with("Add CPU failed")),
        "CPU failure not logged"
    );
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_device_failure_skips_every_component() {
    let mock = MockApi::start().await;
    mock.fail("/devices/", 500, "Database unavailable");
    let state_path = temp_state_path("device_failure");
    let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    let report = ctx.provision(false).await.unwrap();
    assert_eq!(
        report.device,
        StepOutcome::Failed("Database unavailable".to_string())
    );
    assert!(
        report
            .components
            .iter()
            .all(|c| c.component == StepOutcome::Skipped && c.link == StepOutcome::Skipped),
        "components should be skipped: {report}"
    );
    assert_eq!(provisioning_paths(&mock), ["/devices/"]);

    let state = ctx.store().snapshot();
    assert!(!state.home.provisioning, "flag should be cleared after failure");
    assert_eq!(state.home.device.error.as_deref(), Some("Database unavailable"));
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_success_without_nested_record_is_a_failure() {
    let mock = MockApi::start().await;
    mock.respond_with(
        "/gpus/",
        201,
        json!({ "status": "success", "code": 201, "msg": "GPU created", "data": {} }),
    );
    let state_path = temp_state_path("missing_nested");
    let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    let report = ctx.provision(false).await.unwrap();
    let gpu = report.component(ComponentKind::Gpu).unwrap();
    assert_eq!(
        gpu.component,
        StepOutcome::Failed(UNEXPECTED_SHAPE.to_string()),
        "missing record should fail: {report}"
    );
    assert_eq!(mock.count("/devicegpus/"), 0);
    assert!(report.component(ComponentKind::Ram).unwrap().link.is_completed());
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_record_with_only_an_id_is_linked() {
    let mock = MockApi::start().await;
    mock.respond_with(
        "/cpus/",
        201,
        json!({
            "status": "success",
            "code": 201,
            "msg": "Component created",
            "data": { "cpu": { "id": 5 } },
        }),
    );
    mock.respond_with(
        "/devicecpus/",
        201,
        json!({
            "status": "success",
            "code": 201,
            "msg": "Linked",
            "data": { "devicecpu": { "id": 6 } },
        }),
    );
    let state_path = temp_state_path("bare_id");
    let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    let report = ctx.provision(false).await.unwrap();
    let cpu = report.component(ComponentKind::Cpu).unwrap();
    assert_eq!(cpu.component, StepOutcome::Completed(5));
    let link = cpu.link.completed().expect("CPU should be linked");
    assert_eq!(link.id, 6);
    assert_eq!(link.component_id, 5);
    assert_eq!(mock.request_to("/devicecpus/").unwrap().body["cpu_id"], 5);

    let state = ctx.store().snapshot();
    let stored = state.home.component(ComponentKind::Cpu).unwrap().result.clone().unwrap();
    assert_eq!(stored.id(), 5);
    assert!(report.is_complete(), "{report}");
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_broken_bridge_does_not_abort_calls() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("broken_bridge");
    let bridge = Arc::new(RecordingBridge::broken());
    let ctx = signed_in_context(&mock, Arc::clone(&bridge), &state_path).await;
    assert!(ctx.store().session().is_some(), "login should survive a failing log sink");

    let report = ctx.provision(false).await.unwrap();
    assert!(report.is_complete(), "{report}");
    assert_eq!(provisioning_paths(&mock), FULL_CHAIN);
    assert!(bridge.lines().is_empty());
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_link_failure_keeps_component() {
    let mock = MockApi::start().await;
    mock.fail("/devicedisks/", 409, "Already linked");
    let state_path = temp_state_path("link_failure");
    let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    let report = ctx.provision(false).await.unwrap();
    let disk = report.component(ComponentKind::Disk).unwrap();
    assert!(disk.component.is_completed(), "disk should be created");
    assert_eq!(disk.link, StepOutcome::Failed("Already linked".to_string()));
    assert_eq!(mock.count("/rams/"), 1, "RAM should still be attempted");
    drop(std::fs::remove_file(&state_path));
}

#[tokio::test]
async fn test_provision_requires_session() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("no_session");
    let ctx = context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    assert_eq!(
        ctx.provision(false).await.unwrap_err(),
        ProvisionRefusal::NotSignedIn
    );
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_second_provision_in_session_is_refused() {
    let mock = MockApi::start().await;
    let state_path = temp_state_path("same_session");
    let ctx = signed_in_context(&mock, Arc::new(RecordingBridge::default()), &state_path).await;

    ctx.provision(false).await.unwrap();
    assert!(matches!(
        ctx.provision(false).await.unwrap_err(),
        ProvisionRefusal::AlreadyProvisioned { owner_id: USER_ID, .. }
    ));
    assert_eq!(
        ctx.provision(true).await.unwrap_err(),
        ProvisionRefusal::AlreadyTriggered
    );
    assert_eq!(mock.count("/devices/"), 1);
    drop(std::fs::remove_file(&state_path));
}
