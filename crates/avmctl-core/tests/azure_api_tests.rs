//! End-to-end tests against a mock identity endpoint, ARM and webhook

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, path_regex, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use avmctl_core::{
    AvmOperation, CloudEndpoints, CoreError, OperationConfig, OperationMode, ProgressCallback,
    ProgressEvent, ServicePrincipal, VmIdentity, check_status, start_vm, stop_vm,
};

const VM_PATH: &str =
    "/subscriptions/sub-1/resourceGroups/rg-web/providers/Microsoft.Compute/virtualMachines/web-01";

fn config(server: &MockServer) -> OperationConfig {
    OperationConfig::new(
        VmIdentity::new("sub-1", "rg-web", "web-01"),
        ServicePrincipal::new("tenant-1", "client-1", "secret-1"),
    )
    .with_endpoints(CloudEndpoints {
        authority_host: server.uri(),
        resource_manager: server.uri(),
        compute_api_version: "2024-07-01".to_string(),
    })
    .with_poll_interval(Duration::from_millis(10))
    .with_webhook_timeout(Duration::from_secs(2))
}

async fn mock_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "test-token"
        })))
        .mount(server)
        .await;
}

async fn mock_instance_view(server: &MockServer, power_code: &str, display: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{}/instanceView", VM_PATH)))
        .and(query_param("api-version", "2024-07-01"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "computerName": "web-01",
            "statuses": [
                {"code": "ProvisioningState/succeeded", "level": "Info"},
                {"code": power_code, "level": "Info", "displayStatus": display}
            ]
        })))
        .mount(server)
        .await;
}

fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let callback: ProgressCallback = Arc::new(move |event| sink.lock().unwrap().push(event));
    (callback, events)
}

// ============================================================================
// Token acquisition
// ============================================================================

#[tokio::test]
async fn test_rejected_credentials_are_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&server)
        .await;

    let op = AvmOperation::new(config(&server)).unwrap();
    let err = op.start_vm().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(err.to_string().contains("AADSTS7000215"));
}

#[tokio::test]
async fn test_unrepresentable_token_lifetime_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": i64::MAX,
            "access_token": "test-token"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/start", VM_PATH)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = AvmOperation::new(config(&server))
        .unwrap()
        .start_vm()
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(err.to_string().contains("expires_in"));
}

#[tokio::test]
async fn test_empty_field_makes_no_requests() {
    let server = MockServer::start().await;
    let mut bad = config(&server);
    bad.credentials.client_secret = String::new();

    assert!(!start_vm(bad.clone()).await);
    assert!(!stop_vm(bad.clone()).await);
    assert_eq!(check_status(bad).await, None);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

// ============================================================================
// Status
// ============================================================================

#[tokio::test]
async fn test_check_status_running() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    mock_instance_view(&server, "PowerState/running", "VM running").await;

    assert_eq!(
        check_status(config(&server)).await.as_deref(),
        Some("VM running")
    );
}

#[tokio::test]
async fn test_check_status_missing_vm_is_none() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{}/instanceView", VM_PATH)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": "ResourceNotFound",
                "message": "The Resource 'Microsoft.Compute/virtualMachines/web-01' was not found."
            }
        })))
        .mount(&server)
        .await;

    let op = AvmOperation::new(config(&server)).unwrap();
    assert_eq!(op.get_status().await.unwrap(), None);
    assert_eq!(check_status(config(&server)).await, None);
}

// ============================================================================
// Long-running operations
// ============================================================================

#[tokio::test]
async fn test_start_polls_async_operation_until_succeeded() {
    let server = MockServer::start().await;
    mock_token(&server).await;

    let operation_url = format!("{}/operations/op-1", server.uri());
    Mock::given(method("POST"))
        .and(path(format!("{}/start", VM_PATH)))
        .and(query_param("api-version", "2024-07-01"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Azure-AsyncOperation", operation_url.as_str())
                .insert_header("Retry-After", "0"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .mount(&server)
        .await;

    mock_instance_view(&server, "PowerState/running", "VM running").await;

    let (callback, events) = recorder();
    let op = AvmOperation::new(config(&server))
        .unwrap()
        .with_progress(callback);

    op.start_vm().await.unwrap();
    assert!(op.get_status().await.unwrap().unwrap().contains("running"));

    let events = events.lock().unwrap();
    assert!(matches!(events.first(), Some(ProgressEvent::Started { .. })));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ProgressEvent::Polling { status, .. } if status == "InProgress"))
    );
    assert!(matches!(events.last(), Some(ProgressEvent::Completed { .. })));
}

#[tokio::test]
async fn test_power_off_polls_location_header() {
    let server = MockServer::start().await;
    mock_token(&server).await;

    let location_url = format!("{}/locations/loc-1", server.uri());
    Mock::given(method("POST"))
        .and(path(format!("{}/powerOff", VM_PATH)))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", location_url.as_str())
                .insert_header("Retry-After", "0"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/locations/loc-1"))
        .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/locations/loc-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(stop_vm(config(&server)).await);
}

#[tokio::test]
async fn test_failed_async_operation_is_task_failed() {
    let server = MockServer::start().await;
    mock_token(&server).await;

    let operation_url = format!("{}/operations/op-2", server.uri());
    Mock::given(method("POST"))
        .and(path(format!("{}/deallocate", VM_PATH)))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Azure-AsyncOperation", operation_url.as_str())
                .insert_header("Retry-After", "0"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": {"code": "OperationNotAllowed", "message": "VM is being updated"}
        })))
        .mount(&server)
        .await;

    let op = AvmOperation::new(config(&server)).unwrap();
    let err = op.deallocate_vm().await.unwrap_err();

    match err {
        CoreError::TaskFailed(message) => {
            assert_eq!(message, "OperationNotAllowed: VM is being updated")
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wait_timeout_is_enforced() {
    let server = MockServer::start().await;
    mock_token(&server).await;

    let operation_url = format!("{}/operations/slow", server.uri());
    Mock::given(method("POST"))
        .and(path(format!("{}/start", VM_PATH)))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Azure-AsyncOperation", operation_url.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .mount(&server)
        .await;

    let config = config(&server).with_wait_timeout(Some(Duration::from_millis(50)));
    let err = AvmOperation::new(config)
        .unwrap()
        .start_vm()
        .await
        .unwrap_err();

    assert!(err.is_timeout());
}

async fn mock_accepted_start(server: &MockServer, operation_path: &str) {
    let operation_url = format!("{}{}", server.uri(), operation_path);
    Mock::given(method("POST"))
        .and(path(format!("{}/start", VM_PATH)))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Azure-AsyncOperation", operation_url.as_str())
                .insert_header("Retry-After", "0"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_status_document_without_status_is_provider_error() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    mock_accepted_start(&server, "/operations/blank").await;
    Mock::given(method("GET"))
        .and(path("/operations/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (callback, events) = recorder();
    let err = AvmOperation::new(config(&server))
        .unwrap()
        .with_progress(callback)
        .start_vm()
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Provider { status: None, .. }));
    let events = events.lock().unwrap();
    assert!(matches!(events.last(), Some(ProgressEvent::Failed { .. })));
}

#[tokio::test]
async fn test_poll_server_error_reports_failed_event() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    mock_accepted_start(&server, "/operations/broken").await;
    Mock::given(method("GET"))
        .and(path("/operations/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"code": "InternalServerError", "message": "try later"}
        })))
        .mount(&server)
        .await;

    let (callback, events) = recorder();
    let err = AvmOperation::new(config(&server))
        .unwrap()
        .with_progress(callback)
        .start_vm()
        .await
        .unwrap_err();

    assert!(err.is_server_error());
    let events = events.lock().unwrap();
    assert!(matches!(events.first(), Some(ProgressEvent::Started { .. })));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Failed { operation, .. }) if operation == "start web-01"
    ));
}

#[tokio::test]
async fn test_timeout_reports_failed_event() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    mock_accepted_start(&server, "/operations/stuck").await;
    Mock::given(method("GET"))
        .and(path("/operations/stuck"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .mount(&server)
        .await;

    let (callback, events) = recorder();
    let config = config(&server).with_wait_timeout(Some(Duration::from_millis(50)));
    let err = AvmOperation::new(config)
        .unwrap()
        .with_progress(callback)
        .start_vm()
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    let events = events.lock().unwrap();
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Failed { error, .. }) if error.starts_with("timed out after")
    ));
}

#[tokio::test]
async fn test_synchronous_success_needs_no_polling() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{}/start", VM_PATH)))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(start_vm(config(&server)).await);
}

// ============================================================================
// Provider errors
// ============================================================================

#[tokio::test]
async fn test_forbidden_is_permission_error() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{}/start", VM_PATH)))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": "AuthorizationFailed",
                "message": "The client does not have authorization to perform action"
            }
        })))
        .mount(&server)
        .await;

    let op = AvmOperation::new(config(&server)).unwrap();
    let err = op.start_vm().await.unwrap_err();
    assert!(err.is_forbidden());
    assert!(err.to_string().contains("AuthorizationFailed"));

    assert!(!start_vm(config(&server)).await);
}

#[tokio::test]
async fn test_server_error_is_provider_error() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    Mock::given(method("POST"))
        .and(path_regex(r"/virtualMachines/web-01/powerOff$"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = AvmOperation::new(config(&server))
        .unwrap()
        .stop_vm()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::Provider {
            status: Some(503),
            ..
        }
    ));
}

// ============================================================================
// Notifications
// ============================================================================

async fn mock_start_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("{}/start", VM_PATH)))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_remote_mode_posts_webhook_payload() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    mock_start_ok(&server).await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({
            "event": "vm.start",
            "vm_name": "web-01",
            "resource_group": "rg-web",
            "subscription_id": "sub-1",
            "result": "success",
            "message": "VM 'web-01' started successfully",
            "mode": "prod"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server)
        .with_mode(OperationMode::parse("prod"))
        .with_webhook_url(format!("{}/hook", server.uri()));

    assert!(start_vm(config).await);
}

#[tokio::test]
async fn test_failure_is_posted_to_webhook() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{}/start", VM_PATH)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({"event": "vm.start", "result": "failure"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server)
        .with_mode(OperationMode::parse("prod"))
        .with_webhook_url(format!("{}/hook", server.uri()));

    assert!(!start_vm(config).await);
}

#[tokio::test]
async fn test_webhook_error_does_not_change_result() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    mock_start_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server)
        .with_mode(OperationMode::parse("prod"))
        .with_webhook_url(format!("{}/hook", server.uri()));

    assert!(start_vm(config).await);
}

#[tokio::test]
async fn test_dev_mode_never_calls_webhook() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    mock_start_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(&server)
        .with_mode(OperationMode::Dev)
        .with_webhook_url(format!("{}/hook", server.uri()));

    assert!(start_vm(config).await);
}

#[tokio::test]
async fn test_remote_mode_without_url_keeps_result() {
    let server = MockServer::start().await;
    mock_token(&server).await;
    mock_start_ok(&server).await;

    let config = config(&server).with_mode(OperationMode::parse("prod"));
    assert!(start_vm(config).await);
}
