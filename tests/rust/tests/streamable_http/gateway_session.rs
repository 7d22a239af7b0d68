//! Full MCP session against the gateway router

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rmcp::{
    model::*,
    service::{RunningService, ServiceExt},
    transport::StreamableHttpClientTransport,
    RoleClient,
};
use sapmux_core::SapMuxConfig;
use sapmux_gateway::{DependenciesBuilder, GatewayConfig, GatewayServer};
use serde_json::{json, Value};
use tests::fixtures;
use tests::mocks::{CountingMetadataSource, RecordingExecutor, StaticDiscovery};
use tokio_util::sync::CancellationToken;

/// Start the gateway on a random port; returns its base URL
async fn start_gateway() -> (String, CancellationToken) {
    let (url, ct, _) = start_gateway_with(SapMuxConfig::default()).await;
    (url, ct)
}

/// Same, with explicit settings and the executor exposed for assertions
async fn start_gateway_with(
    settings: SapMuxConfig,
) -> (String, CancellationToken, Arc<RecordingExecutor>) {
    let executor = Arc::new(RecordingExecutor::new());
    let dependencies = DependenciesBuilder::new()
        .with_discovery(Arc::new(StaticDiscovery::new(fixtures::test_services())))
        .with_metadata_source(Arc::new(CountingMetadataSource::new()))
        .with_executor(executor.clone())
        .build()
        .expect("dependencies are complete");
    let server = GatewayServer::start(GatewayConfig::default(), &settings, dependencies).await;

    let router = server.build_router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to random port");
    let addr = listener.local_addr().unwrap();

    let ct = CancellationToken::new();
    let ct_clone = ct.clone();
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { ct_clone.cancelled().await })
            .await
            .unwrap();
    });

    // Give server a moment to start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{}", addr.port()), ct, executor)
}

async fn connect(base_url: &str) -> RunningService<RoleClient, ClientInfo> {
    let transport = StreamableHttpClientTransport::from_uri(format!("{}/mcp", base_url));
    ClientInfo {
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "test-client".to_string(),
            version: "1.0.0".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
    .serve(transport)
    .await
    .expect("client should connect")
}

fn call(name: &str, arguments: Value) -> CallToolRequestParams {
    serde_json::from_value(json!({"name": name, "arguments": arguments}))
        .expect("valid call parameters")
}

/// First text block of a tool result, parsed as JSON, plus the error flag
fn tool_output(result: CallToolResult) -> (Value, bool) {
    let raw = serde_json::to_value(&result).unwrap();
    let text = raw["content"][0]["text"].as_str().unwrap_or_default().to_string();
    let is_error = raw["isError"].as_bool().unwrap_or(false);
    (serde_json::from_str(&text).unwrap_or(Value::String(text)), is_error)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_session_lists_three_tools() {
    let (url, ct) = start_gateway().await;
    let client = connect(&url).await;

    let info = client.peer_info().expect("server info after initialize");
    assert_eq!(info.server_info.name, "sapmux");

    let tools = client
        .list_tools(Default::default())
        .await
        .expect("list_tools should work");
    let names: Vec<String> = tools.tools.iter().map(|t| t.name.to_string()).collect();
    assert_eq!(names, vec!["discover", "getMetadata", "executeOperation"]);

    client.cancel().await.ok();
    ct.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_progressive_calls_over_http() {
    let (url, ct) = start_gateway().await;
    let client = connect(&url).await;

    let (discovered, is_error) = tool_output(
        client
            .call_tool(call("discover", json!({"query": "customer"})))
            .await
            .unwrap(),
    );
    assert!(!is_error);
    assert_eq!(
        discovered["matches"][0]["service"]["serviceId"],
        json!(fixtures::BUSINESS_PARTNER)
    );

    let (metadata, is_error) = tool_output(
        client
            .call_tool(call(
                "getMetadata",
                json!({"serviceId": fixtures::BUSINESS_PARTNER, "entityName": "Customer"}),
            ))
            .await
            .unwrap(),
    );
    assert!(!is_error);
    assert_eq!(metadata["capabilities"]["updatable"], json!(true));

    // No Authorization header on this connection
    let (failure, is_error) = tool_output(
        client
            .call_tool(call(
                "executeOperation",
                json!({
                    "serviceId": fixtures::BUSINESS_PARTNER,
                    "entityName": "Customer",
                    "operation": "update",
                    "parameters": {"CustomerID": "1000", "EmailAddress": "new@acme.com"}
                }),
            ))
            .await
            .unwrap(),
    );
    assert!(is_error);
    assert_eq!(failure["error"]["kind"], json!("AuthenticationRequired"));

    client.cancel().await.ok();
    ct.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_preset_user_token_not_shared_with_http_sessions() {
    let settings = SapMuxConfig {
        user_token: Some("operator-token".to_string()),
        ..Default::default()
    };
    let (url, ct, executor) = start_gateway_with(settings).await;
    let client = connect(&url).await;

    let (failure, is_error) = tool_output(
        client
            .call_tool(call(
                "executeOperation",
                json!({
                    "serviceId": fixtures::BUSINESS_PARTNER,
                    "entityName": "Customer",
                    "operation": "update",
                    "parameters": {"CustomerID": "1000", "EmailAddress": "new@acme.com"}
                }),
            ))
            .await
            .unwrap(),
    );
    assert!(is_error);
    assert_eq!(failure["error"]["kind"], json!("AuthenticationRequired"));
    assert_eq!(executor.request_count(), 0);

    client.cancel().await.ok();
    ct.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_catalog_resources() {
    let (url, ct) = start_gateway().await;
    let client = connect(&url).await;

    let listed = client
        .list_resources(Default::default())
        .await
        .expect("list_resources should work");
    let listed = serde_json::to_value(&listed).unwrap();
    let uris: Vec<&str> = listed["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uri"].as_str().unwrap())
        .collect();
    assert_eq!(uris[0], "sap://services");
    assert_eq!(uris.len(), 4);

    let read: ReadResourceRequestParams =
        serde_json::from_value(json!({"uri": "sap://services"})).unwrap();
    let contents = client.read_resource(read).await.expect("read_resource");
    let contents = serde_json::to_value(&contents).unwrap();
    let body: Value =
        serde_json::from_str(contents["contents"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(body["services"].as_array().unwrap().len(), 3);

    client.cancel().await.ok();
    ct.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_endpoint() {
    let (url, ct) = start_gateway().await;

    let health: Value = reqwest::get(format!("{}/health", url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(health["status"], json!("ok"));
    assert_eq!(health["services"], json!(3));

    ct.cancel();
}
