//! MCP server tests over an in-memory stdio pair

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use apisix_mcp::admin::{HttpRequest, HttpResponse, HttpTransport, TransportFailure};
use apisix_mcp::error::rpc_codes;
use apisix_mcp::protocol::PROTOCOL_VERSION;
use apisix_mcp::server::Server;
use apisix_mcp::tools::Toolbox;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::io::BufReader;

/// Records every request and answers 200 `{"ok": true}`
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<HttpRequest>>,
}

#[async_trait]
impl HttpTransport for Recorder {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.seen.lock().unwrap().push(request);
        Ok(HttpResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: json!({ "ok": true }),
        })
    }
}

struct NotFound;

#[async_trait]
impl HttpTransport for NotFound {
    async fn send(&self, _: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        Ok(HttpResponse {
            status: 404,
            headers: BTreeMap::new(),
            body: json!({ "message": "Key not found" }),
        })
    }
}

fn server_with(admin: Arc<dyn HttpTransport>) -> Server {
    Server::new(Toolbox::new(admin, Arc::new(Recorder::default())))
}

async fn call(server: &Server, message: Value) -> Value {
    let response = server.handle_value(message).await.expect("response");
    serde_json::to_value(response).unwrap()
}

async fn call_tool(server: &Server, name: &str, arguments: Value) -> Value {
    call(
        server,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        }),
    )
    .await
}

fn tool_text(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

/// initialize negotiates the version and advertises tools
#[tokio::test]
async fn test_initialize() {
    let server = server_with(Arc::new(Recorder::default()));
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "1" }
            }
        }),
    )
    .await;

    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(response["result"]["serverInfo"]["name"], "apisix-mcp");
    assert!(response["result"]["capabilities"]["tools"].is_object());

    let unknown = call(
        &server,
        json!({ "jsonrpc": "2.0", "id": 2, "method": "initialize", "params": { "protocolVersion": "1.0" } }),
    )
    .await;
    assert_eq!(unknown["result"]["protocolVersion"], PROTOCOL_VERSION);
}

/// tools/list carries every tool with an input schema
#[tokio::test]
async fn test_tools_list() {
    let server = server_with(Arc::new(Recorder::default()));
    let response = call(&server, json!({ "jsonrpc": "2.0", "id": "l", "method": "tools/list" })).await;

    let tools = response["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert!(names.contains(&"get_resource"));
    assert!(names.contains(&"create_or_update_route"));
    assert!(names.contains(&"patch_upstream"));
    assert!(names.contains(&"send_request_to_gateway"));
    assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
}

/// Successful calls return the Admin API body as text
#[tokio::test]
async fn test_tools_call_success() {
    let recorder = Arc::new(Recorder::default());
    let server = server_with(recorder.clone());

    let response = call_tool(
        &server,
        "create_or_update_upstream",
        json!({ "id": "u1", "type": "roundrobin", "nodes": { "127.0.0.1:1980": 1 } }),
    )
    .await;

    assert_eq!(response["result"]["isError"], false);
    assert_eq!(tool_text(&response), json!({ "ok": true }));

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, reqwest::Method::PUT);
    assert_eq!(seen[0].path, "/upstreams/u1");
}

/// Validation errors are tool errors, not protocol errors
#[tokio::test]
async fn test_tools_call_validation_error() {
    let recorder = Arc::new(Recorder::default());
    let server = server_with(recorder.clone());

    let response = call_tool(&server, "create_or_update_route", json!({ "name": "no uri" })).await;

    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], true);
    assert_eq!(tool_text(&response)["error"], "schema_violation");
    assert!(recorder.seen.lock().unwrap().is_empty());
}

/// Remote failures report the whole outcome
#[tokio::test]
async fn test_tools_call_remote_failure() {
    let server = server_with(Arc::new(NotFound));

    let response = call_tool(&server, "get_resource", json!({ "type": "route", "id": "r9" })).await;

    assert_eq!(response["result"]["isError"], true);
    let outcome = tool_text(&response);
    assert_eq!(outcome["status"], 404);
    assert_eq!(outcome["data"]["message"], "Key not found");
}

/// Unknown tools are invalid params
#[tokio::test]
async fn test_unknown_tool() {
    let server = server_with(Arc::new(Recorder::default()));
    let response = call_tool(&server, "drop_database", json!({})).await;
    assert_eq!(response["error"]["code"], rpc_codes::INVALID_PARAMS);
    assert_eq!(response["id"], 7);
}

/// Unknown methods, bad JSON and malformed envelopes
#[tokio::test]
async fn test_protocol_errors() {
    let server = server_with(Arc::new(Recorder::default()));

    let response = call(&server, json!({ "jsonrpc": "2.0", "id": 3, "method": "resources/list" })).await;
    assert_eq!(response["error"]["code"], rpc_codes::METHOD_NOT_FOUND);

    let parse = server.handle_line("{not json").await.unwrap();
    let parse = serde_json::to_value(parse).unwrap();
    assert_eq!(parse["error"]["code"], rpc_codes::PARSE_ERROR);
    assert_eq!(parse["id"], Value::Null);

    let invalid = call(&server, json!({ "id": 4, "method": "ping" })).await;
    assert_eq!(invalid["error"]["code"], rpc_codes::INVALID_REQUEST);
    assert_eq!(invalid["id"], 4);
}

/// Notifications get no reply
#[tokio::test]
async fn test_notifications_are_silent() {
    let server = server_with(Arc::new(Recorder::default()));
    let response = server
        .handle_value(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
        .await;
    assert!(response.is_none());
}

/// The line loop answers each request on its own line
#[tokio::test]
async fn test_serve_loop() {
    let server = server_with(Arc::new(Recorder::default()));
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        "\n"
    );
    let mut output = Vec::new();

    server
        .serve(BufReader::new(input.as_bytes()), &mut output)
        .await
        .unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(
        lines,
        vec![
            json!({ "jsonrpc": "2.0", "id": 1, "result": {} }),
            json!({ "jsonrpc": "2.0", "id": 2, "result": {} }),
        ]
    );
}

/// Batches report every attempt and stay successful overall
#[tokio::test]
async fn test_gateway_batch_tool() {
    let gateway = Arc::new(Recorder::default());
    let server = Server::new(Toolbox::new(Arc::new(Recorder::default()), gateway.clone()));

    let response = call_tool(
        &server,
        "send_request_to_gateway",
        json!({ "requests": [{ "path": "/get", "method": "GET", "repeatCount": 3 }] }),
    )
    .await;

    assert_eq!(response["result"]["isError"], false);
    let report = tool_text(&response);
    assert_eq!(report["summary"], json!({ "total": 3, "successful": 3, "failed": 0 }));
    assert_eq!(gateway.seen.lock().unwrap().len(), 3);
}

/// An oversized batch is a tool error and nothing reaches the gateway
#[tokio::test]
async fn test_gateway_batch_over_ceiling() {
    let gateway = Arc::new(Recorder::default());
    let server = Server::new(
        Toolbox::new(Arc::new(Recorder::default()), gateway.clone()).with_max_attempts(10),
    );

    let response = call_tool(
        &server,
        "send_request_to_gateway",
        json!({ "requests": [{ "path": "/get", "method": "GET", "repeatCount": 4_294_967_295_u32 }] }),
    )
    .await;

    assert_eq!(response["result"]["isError"], true);
    assert_eq!(tool_text(&response)["error"], "invalid_arguments");
    assert!(gateway.seen.lock().unwrap().is_empty());
}
