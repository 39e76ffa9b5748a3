//! Integration tests for the standalone `lsp-mux` binary.
//!
//! The binary runs with no feature servers registered, so these exercise the
//! runtime defaults and the unhandled paths of the JSON-RPC surface.

mod common;

use common::LspClient;
use serde_json::json;

#[test]
fn test_initialize_returns_runtime_defaults() {
    let mut client = LspClient::spawn();
    let response = client.initialize();

    let result = &response["result"];
    assert_eq!(result["serverInfo"]["name"], "lsp-mux");
    assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));

    let sync = &result["capabilities"]["textDocumentSync"];
    assert_eq!(sync["openClose"], json!(true));
    assert_eq!(sync["change"], json!(2));
    assert_eq!(sync["save"]["includeText"], json!(true));
}

#[test]
fn test_initialize_without_aws_options_reports_telemetry() {
    let mut client = LspClient::spawn();
    let response = client.initialize_with(json!({
        "processId": null,
        "capabilities": {},
        "rootUri": "file:///tmp/project"
    }));
    assert!(response.get("result").is_some());
    // Notifications sent during initialize may trail its response.
    client.shutdown();

    let telemetry: Vec<_> = client
        .notifications()
        .iter()
        .filter(|n| n.method == "telemetry/event")
        .collect();
    assert_eq!(telemetry.len(), 1);
    assert_eq!(telemetry[0].params["name"], "runtimeInitialization_validation");
    assert_eq!(telemetry[0].params["result"], "Failed");
}

#[test]
fn test_initialize_without_folders_logs_to_client() {
    let mut client = LspClient::spawn();
    client.initialize_with(json!({
        "processId": null,
        "capabilities": {},
        "initializationOptions": {"aws": {}}
    }));
    client.shutdown();

    let logged = client.notifications().iter().any(|n| {
        n.method == "window/logMessage"
            && n.params["message"] == "No workspace folders found in initialization parameters"
    });
    assert!(logged);
}

#[test]
fn test_unknown_command_is_method_not_found() {
    let mut client = LspClient::spawn();
    client.initialize();

    let response = client.request(
        2,
        "workspace/executeCommand",
        json!({"command": "nobody.owns.this", "arguments": []}),
    );

    assert_eq!(response["error"]["code"], json!(-32601));
}

#[test]
fn test_server_capabilities_section_answers_null() {
    let mut client = LspClient::spawn();
    client.initialize();

    let response = client.request(
        3,
        "aws/getConfigurationFromServer",
        json!({"section": "aws.serverCapabilities"}),
    );

    assert!(response.get("error").is_none(), "unexpected error: {response}");
    assert_eq!(response["result"], json!(null));
}

#[test]
fn test_unknown_configuration_section_is_method_not_found() {
    let mut client = LspClient::spawn();
    client.initialize();

    let response = client.request(
        4,
        "aws/getConfigurationFromServer",
        json!({"section": "aws.q"}),
    );

    assert_eq!(response["error"]["code"], json!(-32601));
}

#[test]
fn test_update_configuration_without_servers_succeeds() {
    let mut client = LspClient::spawn();
    client.initialize();

    let response = client.request(
        5,
        "aws/updateConfiguration",
        json!({"section": "aws.q", "settings": {"customization": "x"}}),
    );

    assert!(response.get("error").is_none(), "unexpected error: {response}");
}

#[test]
fn test_identity_request_without_owner_is_method_not_found() {
    let mut client = LspClient::spawn();
    client.initialize();

    let response = client.request(6, "aws/identity/listProfiles", json!({}));

    assert_eq!(response["error"]["code"], json!(-32601));
}

#[test]
fn test_shutdown_response() {
    let mut client = LspClient::spawn();
    client.initialize();

    let response = client.shutdown();

    assert_eq!(response["result"], json!(null));
    assert_eq!(response["id"], json!(999));
}
