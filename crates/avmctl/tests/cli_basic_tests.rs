use assert_cmd::Command;
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SETTINGS_ENV: &[&str] = &[
    "AZURE_SUBSCRIPTION_ID",
    "AZURE_RESOURCE_GROUP",
    "AZURE_VM_NAME",
    "AZURE_TENANT_ID",
    "AZURE_CLIENT_ID",
    "AZURE_CLIENT_SECRET",
    "MODE",
    "WEBHOOK_URL",
    "AVMCTL_PROFILE",
    "AVMCTL_CONFIG_FILE",
    "RUST_LOG",
];

/// Helper to create a test command with a clean environment
fn avmctl() -> Command {
    let mut cmd = Command::cargo_bin("avmctl").unwrap();
    for var in SETTINGS_ENV {
        cmd.env_remove(var);
    }
    cmd
}

/// Command bound to a config file inside `dir`
fn avmctl_with_config(dir: &TempDir) -> Command {
    let mut cmd = avmctl();
    cmd.arg("--config-file").arg(config_path(dir));
    cmd
}

fn config_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("config.toml")
}

fn set_profile(dir: &TempDir, name: &str, extra: &[&str]) {
    avmctl_with_config(dir)
        .args([
            "profile",
            "set",
            name,
            "--subscription-id",
            "sub-1",
            "--tenant-id",
            "tenant-1",
            "--client-id",
            "client-1234567890",
            "--client-secret",
            "secret-1",
        ])
        .args(extra)
        .assert()
        .success();
}

fn read_config(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_help_flag() {
    avmctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Azure VM power control"))
        .stdout(predicate::str::contains("EXAMPLES:"));
}

#[test]
fn test_version_flag() {
    avmctl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("avmctl"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_command_json() {
    avmctl()
        .args(["version", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"avmctl\""));
}

#[test]
fn test_no_args_shows_help() {
    avmctl()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_invalid_subcommand() {
    avmctl()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_stop_help_mentions_deallocate() {
    avmctl()
        .args(["stop", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--deallocate"));
}

#[test]
fn test_batch_requires_target() {
    avmctl()
        .args(["batch", "start"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--target"));
}

#[test]
fn test_batch_rejects_empty_resource_group() {
    avmctl()
        .args(["batch", "start", "-t", "web-01:"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("resource group is empty"));
}

#[test]
fn test_invalid_output_format() {
    avmctl()
        .args(["-o", "xml", "version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_completions_bash() {
    avmctl()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("avmctl"));
}

// ============================================================================
// Missing settings
// ============================================================================

#[test]
fn test_start_without_settings_lists_everything_missing() {
    let dir = TempDir::new().unwrap();
    avmctl_with_config(&dir)
        .arg("start")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Missing required settings"))
        .stderr(predicate::str::contains("subscription id"))
        .stderr(predicate::str::contains("client secret"))
        .stderr(predicate::str::contains("AZURE_CLIENT_SECRET"));
}

#[test]
fn test_env_fills_settings_partially() {
    let dir = TempDir::new().unwrap();
    avmctl_with_config(&dir)
        .env("AZURE_SUBSCRIPTION_ID", "sub-1")
        .env("AZURE_TENANT_ID", "tenant-1")
        .args(["status", "-n", "web-01", "-g", "rg-web"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("client id"))
        .stderr(predicate::str::contains("subscription id").not());
}

#[test]
fn test_unknown_profile_fails() {
    let dir = TempDir::new().unwrap();
    avmctl_with_config(&dir)
        .args(["--profile", "missing", "status"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Profile 'missing' not found"));
}

// ============================================================================
// Profile management
// ============================================================================

#[test]
fn test_profile_set_missing_required_args() {
    avmctl()
        .args(["profile", "set", "prod", "--subscription-id", "sub"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--tenant-id"));
}

#[test]
fn test_profile_set_and_list() {
    let dir = TempDir::new().unwrap();
    set_profile(&dir, "prod", &["--resource-group", "rg-web", "--vm-name", "web-01"]);

    let contents = read_config(&config_path(&dir));
    assert!(contents.contains("default_profile = \"prod\""));
    assert!(contents.contains("[profiles.prod]"));

    avmctl_with_config(&dir)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("prod"))
        .stdout(predicate::str::contains("(default)"));
}

#[test]
fn test_profile_list_json_filters_by_tag() {
    let dir = TempDir::new().unwrap();
    set_profile(&dir, "prod", &["--tag", "web"]);
    set_profile(&dir, "ci", &["--tag", "build"]);

    let output = avmctl_with_config(&dir)
        .args(["profile", "list", "--tag", "web", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["count"], 1);
    assert_eq!(value["profiles"][0]["name"], "prod");
}

#[test]
fn test_profile_show_masks_credentials() {
    let dir = TempDir::new().unwrap();
    set_profile(&dir, "prod", &[]);

    avmctl_with_config(&dir)
        .args(["profile", "show", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("client-1..."))
        .stdout(predicate::str::contains("Client Secret: configured"))
        .stdout(predicate::str::contains("secret-1").not());
}

#[test]
fn test_profile_default_and_remove() {
    let dir = TempDir::new().unwrap();
    set_profile(&dir, "prod", &[]);
    set_profile(&dir, "staging", &[]);

    avmctl_with_config(&dir)
        .args(["profile", "default", "staging"])
        .assert()
        .success();
    assert!(read_config(&config_path(&dir)).contains("default_profile = \"staging\""));

    avmctl_with_config(&dir)
        .args(["profile", "remove", "staging", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default profile cleared"));

    let contents = read_config(&config_path(&dir));
    assert!(!contents.contains("staging"));
    assert!(contents.contains("[profiles.prod]"));
}

#[test]
fn test_profile_remove_cancelled_without_confirmation() {
    let dir = TempDir::new().unwrap();
    set_profile(&dir, "prod", &[]);

    avmctl_with_config(&dir)
        .args(["profile", "remove", "prod"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("cancelled"));
    assert!(read_config(&config_path(&dir)).contains("[profiles.prod]"));
}

#[test]
fn test_profile_path_honours_config_file() {
    let dir = TempDir::new().unwrap();
    avmctl_with_config(&dir)
        .args(["profile", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ============================================================================
// Against a mock Azure
// ============================================================================

const VM_PATH: &str =
    "/subscriptions/sub-1/resourceGroups/rg-web/providers/Microsoft.Compute/virtualMachines/web-01";

async fn mock_azure(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "test-token"
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/start", VM_PATH)))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/instanceView", VM_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "computerName": "web-01",
            "statuses": [
                {"code": "ProvisioningState/succeeded", "level": "Info"},
                {"code": "PowerState/running", "level": "Info", "displayStatus": "VM running"}
            ]
        })))
        .mount(server)
        .await;
}

fn write_mock_profile(dir: &TempDir, server: &MockServer) {
    let contents = format!(
        r#"default_profile = "mock"

[profiles.mock]
subscription_id = "sub-1"
tenant_id = "tenant-1"
client_id = "client-1"
client_secret = "secret-1"
resource_group = "rg-web"
vm_name = "web-01"
mode = "dev"

[profiles.mock.endpoints]
authority_host = "{uri}"
resource_manager = "{uri}"
"#,
        uri = server.uri()
    );
    std::fs::write(config_path(dir), contents).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_and_status_against_mock_azure() {
    let server = MockServer::start().await;
    mock_azure(&server).await;
    let dir = TempDir::new().unwrap();
    write_mock_profile(&dir, &server);

    let start = tokio::task::spawn_blocking({
        let mut cmd = avmctl_with_config(&dir);
        cmd.arg("start");
        move || cmd.output().unwrap()
    })
    .await
    .unwrap();
    start
        .assert()
        .success()
        .stdout(predicate::str::contains("vm.start"))
        .stdout(predicate::str::contains("web-01"));

    let status = tokio::task::spawn_blocking({
        let mut cmd = avmctl_with_config(&dir);
        cmd.args(["status", "-o", "json"]);
        move || cmd.output().unwrap()
    })
    .await
    .unwrap();
    assert!(status.status.success());

    let value: serde_json::Value = serde_json::from_slice(&status.stdout).unwrap();
    assert_eq!(value["vm_name"], "web-01");
    assert_eq!(value["power_state"], "running");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_of_missing_vm_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "test-token"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/instanceView", VM_PATH)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "ResourceNotFound", "message": "not found"}
        })))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    write_mock_profile(&dir, &server);

    let output = tokio::task::spawn_blocking({
        let mut cmd = avmctl_with_config(&dir);
        cmd.arg("status");
        move || cmd.output().unwrap()
    })
    .await
    .unwrap();
    output
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("VM not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_json_output_is_parseable_in_dev_mode() {
    let server = MockServer::start().await;
    mock_azure(&server).await;
    let dir = TempDir::new().unwrap();
    write_mock_profile(&dir, &server);

    let output = tokio::task::spawn_blocking({
        let mut cmd = avmctl_with_config(&dir);
        cmd.args(["start", "-o", "json"]);
        move || cmd.output().unwrap()
    })
    .await
    .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["action"], "start");
    assert_eq!(value["success"], true);
    assert_eq!(value["vm_name"], "web-01");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("vm.start"));
}

#[test]
fn test_profile_default_keeps_env_reference_on_disk() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        config_path(&dir),
        r#"[profiles.prod]
subscription_id = "sub-1"
tenant_id = "tenant-1"
client_id = "client-1"
client_secret = "${AVMCTL_CLI_TEST_SECRET}"
"#,
    )
    .unwrap();

    avmctl_with_config(&dir)
        .env("AVMCTL_CLI_TEST_SECRET", "plaintext-from-env")
        .args(["profile", "default", "prod"])
        .assert()
        .success();

    let contents = read_config(&config_path(&dir));
    assert!(contents.contains("default_profile = \"prod\""));
    assert!(contents.contains("${AVMCTL_CLI_TEST_SECRET}"));
    assert!(!contents.contains("plaintext-from-env"));
}
