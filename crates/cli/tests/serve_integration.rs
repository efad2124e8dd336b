//! Integration tests for the `assets serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port,
//! makes HTTP requests, and verifies the responses.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use serde_json::{json, Value};

/// Base port is derived from the process id so separate test binaries
/// running in parallel don't collide.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// A running `assets serve` process, killed on drop.
struct Server {
    port: u16,
    child: Child,
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn start_server() -> Server {
    let port = next_port();
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root");

    let child = Command::new(env!("CARGO_BIN_EXE_assets"))
        .current_dir(workspace_root)
        .args(["serve", "fixtures/assets.toml", "--port", &port.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start assets serve");

    // Wait for the listener by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server { port, child }
}

impl Server {
    /// Send one request and return (status, parsed JSON body).
    fn request(&self, method: &str, path: &str, actor: Option<&str>, body: Option<Value>) -> (u16, Value) {
        let mut stream =
            TcpStream::connect(format!("127.0.0.1:{}", self.port)).expect("failed to connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let mut headers = String::new();
        if let Some(actor) = actor {
            headers.push_str(&format!("X-Asset-User: {}\r\n", actor));
        }
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        if !body.is_empty() {
            headers.push_str("Content-Type: application/json\r\n");
        }
        let request = format!(
            "{} {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            method,
            path,
            self.port,
            headers,
            body.len(),
            body
        );
        std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

        let mut response = String::new();
        let _ = stream.read_to_string(&mut response);
        let (status, body) = parse_http_response(&response);
        let json = serde_json::from_str(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn get(&self, path: &str, actor: &str) -> (u16, Value) {
        self.request("GET", path, Some(actor), None)
    }

    fn post(&self, path: &str, actor: &str, body: Value) -> (u16, Value) {
        self.request("POST", path, Some(actor), Some(body))
    }

    fn put(&self, path: &str, actor: &str, body: Value) -> (u16, Value) {
        self.request("PUT", path, Some(actor), Some(body))
    }

    fn create(&self, name: &str, catalog: &str) -> i64 {
        let (status, asset) = self.post(
            "/assets",
            "alice",
            json!({ "name": name, "catalog": catalog }),
        );
        assert_eq!(status, 201, "create failed: {}", asset);
        asset["id"].as_i64().expect("id")
    }
}

/// Parse an HTTP response into (status_code, body).
fn parse_http_response(response: &str) -> (u16, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"");
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status = headers
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    let body = if headers.to_ascii_lowercase().contains("transfer-encoding: chunked") {
        decode_chunked(&body)
    } else {
        body
    };
    (status, body)
}

fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;
    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        let end = (start + size).min(remaining.len());
        result.push_str(&remaining[start..end]);
        remaining = remaining.get(end + 2..).unwrap_or("");
    }
    result
}

#[test]
fn health_returns_200_with_version() {
    let server = start_server();
    let (status, body) = server.request("GET", "/health", None, None);
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[test]
fn catalogs_and_lifecycles_are_listed() {
    let server = start_server();
    let (status, body) = server.request("GET", "/catalogs", None, None);
    assert_eq!(status, 200);
    assert_eq!(body["catalogs"].as_array().unwrap().len(), 3);
    assert_eq!(body["catalogs"][2]["disabled"], true);

    let (status, lc) = server.request("GET", "/lifecycles/theft", None, None);
    assert_eq!(status, 200);
    assert_eq!(lc["inactive"], json!(["stolen", "recycled"]));

    let (status, _) = server.request("GET", "/lifecycles/boats", None, None);
    assert_eq!(status, 404);
}

#[test]
fn asset_routes_require_actor_header() {
    let server = start_server();
    let (status, body) = server.request("GET", "/assets", None, None);
    assert_eq!(status, 401);
    assert_eq!(body["error"], "missing X-Asset-User header");
}

#[test]
fn create_defaults_status_and_view_resolves_names() {
    let server = start_server();
    let id = server.create("Laptop", "General assets");

    let (status, view) = server.get(&format!("/assets/{}", id), "alice");
    assert_eq!(status, 200);
    assert_eq!(view["status"], "new");
    assert_eq!(view["catalog_name"], "General assets");
    assert_eq!(view["category"], "initial");
    assert_eq!(view["creator"], "alice");
}

#[test]
fn create_with_unreachable_status_is_rejected() {
    let server = start_server();
    let (status, body) = server.post(
        "/assets",
        "alice",
        json!({ "name": "Laptop", "catalog": "General assets", "status": "stolen" }),
    );
    assert_eq!(status, 422);
    assert_eq!(body["error"], "New records cannot have status 'stolen'.");

    let (_, list) = server.get("/assets", "alice");
    assert_eq!(list["assets"], json!([]));
}

#[test]
fn theft_scenario_over_http() {
    let server = start_server();
    let id = server.create("Red bike", "Bikes");

    let (status, body) = server.put(
        &format!("/assets/{}/status", id),
        "alice",
        json!({ "status": "missing" }),
    );
    assert_eq!(status, 422);
    assert_eq!(
        body["error"],
        "Status 'missing' isn't a valid status for this record type."
    );

    let (status, asset) = server.put(
        &format!("/assets/{}/status", id),
        "alice",
        json!({ "status": "recycled" }),
    );
    assert_eq!(status, 200);
    assert_eq!(asset["status"], "recycled");

    let (status, history) = server.get(&format!("/assets/{}/history", id), "alice");
    assert_eq!(status, 200);
    let changes = history["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1]["old_value"], "new");
    assert_eq!(changes[1]["new_value"], "recycled");
}

#[test]
fn permission_denied_is_403() {
    let server = start_server();
    let (status, body) = server.post(
        "/assets",
        "bob",
        json!({ "name": "Laptop", "catalog": "General assets" }),
    );
    assert_eq!(status, 403);
    assert!(body["error"].as_str().unwrap().contains("CreateAsset"));

    let id = server.create("Laptop", "General assets");
    let (status, _) = server.get(&format!("/assets/{}", id), "mallory");
    assert_eq!(status, 403);
}

#[test]
fn reopening_deleted_asset_needs_create_right() {
    let server = start_server();
    let id = server.create("Laptop", "General assets");

    let (status, deleted) = server.request("DELETE", &format!("/assets/{}", id), Some("bob"), None);
    assert_eq!(status, 200);
    assert_eq!(deleted["status"], "deleted");

    let path = format!("/assets/{}/status", id);
    let (status, _) = server.put(&path, "bob", json!({ "status": "in-use" }));
    assert_eq!(status, 403);
    let (status, _) = server.put(&path, "alice", json!({ "status": "in-use" }));
    assert_eq!(status, 200);
}

#[test]
fn missing_asset_is_404() {
    let server = start_server();
    let (status, body) = server.get("/assets/99", "alice");
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Asset #99 not found");
}

#[test]
fn single_role_replaces_member() {
    let server = start_server();
    let id = server.create("Laptop", "General assets");
    let path = format!("/assets/{}/roles", id);

    let (status, _) = server.post(&path, "alice", json!({ "role": "Owner", "principal": "alice" }));
    assert_eq!(status, 200);
    let (status, body) = server.post(&path, "alice", json!({ "role": "Owner", "principal": "user:bob" }));
    assert_eq!(status, 200);
    assert_eq!(body["members"], json!([{ "type": "user", "name": "bob" }]));

    let (status, _) = server.post(&path, "alice", json!({ "role": "Owner", "principal": "group:it" }));
    assert_eq!(status, 422);

    let (status, body) = server.request(
        "DELETE",
        &path,
        Some("alice"),
        Some(json!({ "role": "Owner", "principal": "bob" })),
    );
    assert_eq!(status, 200);
    assert_eq!(body["members"], json!([]));
}

#[test]
fn custom_field_values_are_validated() {
    let server = start_server();
    let id = server.create("Laptop", "General assets");

    let (status, body) = server.put(
        &format!("/assets/{}/custom-fields/Color", id),
        "alice",
        json!({ "values": ["green"] }),
    );
    assert_eq!(status, 422);
    assert!(body["error"].as_str().unwrap().contains("green"));

    let (status, body) = server.put(
        &format!("/assets/{}/custom-fields/Color", id),
        "alice",
        json!({ "values": ["red"] }),
    );
    assert_eq!(status, 200);
    assert_eq!(body["values"], json!(["red"]));

    let (_, view) = server.get(&format!("/assets/{}", id), "alice");
    assert_eq!(view["custom_fields"]["Color"], json!(["red"]));
}

#[test]
fn search_filters_by_catalog_and_status() {
    let server = start_server();
    server.create("Laptop", "General assets");
    let bike = server.create("Bike", "Bikes");
    server.put(
        &format!("/assets/{}/status", bike),
        "alice",
        json!({ "status": "stolen" }),
    );

    let (status, body) = server.get("/assets?catalog=Bikes&status=stolen", "alice");
    assert_eq!(status, 200);
    let assets = body["assets"].as_array().unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0]["name"], "Bike");

    let (_, body) = server.get("/assets", "alice");
    assert_eq!(body["assets"].as_array().unwrap().len(), 2);
}

#[test]
fn rename_and_move_catalog() {
    let server = start_server();
    let id = server.create("Laptop", "General assets");

    let (status, asset) = server.put(&format!("/assets/{}/name", id), "bob", json!({ "name": "Work laptop" }));
    assert_eq!(status, 200);
    assert_eq!(asset["name"], "Work laptop");

    let (status, _) = server.put(&format!("/assets/{}/catalog", id), "alice", json!({ "catalog": "Retired" }));
    assert_eq!(status, 422);

    let (status, asset) = server.put(&format!("/assets/{}/catalog", id), "alice", json!({ "catalog": "Bikes" }));
    assert_eq!(status, 200);
    assert_eq!(asset["catalog"], 2);
}

#[test]
fn unknown_route_is_json_404() {
    let server = start_server();
    let (status, body) = server.request("GET", "/nope", None, None);
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not found");
}
