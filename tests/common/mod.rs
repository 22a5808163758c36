//! In-process fake of the PVE JSON API used by the integration tests
//!
//! Issues numbered tickets (`PVE:root@pam:<n>`) and CSRF tokens
//! (`csrf-<n>`), enforces the cookie on every call and the CSRF header on
//! mutations, and records each request for later inspection.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use pvectl::ClientConfig;

pub const USERNAME: &str = "root@pam";
pub const PASSWORD: &str = "secret";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub csrf: Option<String>,
    pub ticket: Option<String>,
    pub query: HashMap<String, String>,
}

pub struct FakePve {
    session: Mutex<Option<(String, String)>>,
    issued: AtomicUsize,
    pub reject_login: AtomicBool,
    pub fail_actions: AtomicBool,
    /// `/version` answers after the client timeout
    pub slow_version: AtomicBool,
    /// Rejected status actions send headers, then stall the body
    pub stall_rejections: AtomicBool,
    pub resources: Mutex<Value>,
    pub containers: Mutex<HashSet<u32>>,
    pub requests: Mutex<Vec<RecordedRequest>>,
}

impl FakePve {
    fn new() -> Self {
        Self {
            session: Mutex::new(None),
            issued: AtomicUsize::new(0),
            reject_login: AtomicBool::new(false),
            fail_actions: AtomicBool::new(false),
            slow_version: AtomicBool::new(false),
            stall_rejections: AtomicBool::new(false),
            resources: Mutex::new(default_resources()),
            containers: Mutex::new([100, 101].into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of successful logins
    pub fn logins(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    /// Invalidate the current ticket server-side
    pub fn expire(&self) {
        *self.session.lock().unwrap() = None;
    }

    pub fn set_resources(&self, resources: Value) {
        *self.resources.lock().unwrap() = resources;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests to a path
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    fn current(&self) -> Option<(String, String)> {
        self.session.lock().unwrap().clone()
    }
}

pub fn default_resources() -> Value {
    json!({
        "data": [
            {"id": "node/pve1", "type": "node", "node": "pve1", "mem": 8192, "status": "online"},
            {"id": "node/pve2", "type": "node", "node": "pve2", "mem": 8192, "status": "online"},
            {"id": "lxc/100", "type": "lxc", "node": "pve1", "vmid": 100, "mem": 4096, "status": "running"},
            {"id": "lxc/101", "type": "lxc", "node": "pve2", "vmid": 101, "mem": 1024, "status": "stopped"},
            {"id": "qemu/200", "type": "qemu", "node": "pve1", "vmid": 200, "mem": 2048},
            {"id": "storage/pve1/local", "type": "storage", "node": "pve1", "storage": "local"},
            {"id": "sdn/pve1/localnetwork", "type": "sdn", "node": "pve1"}
        ]
    })
}

fn ticket_from(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|c| c.strip_prefix("PVEAuthCookie="))
        .map(str::to_string)
}

fn data(value: Value) -> Response {
    (StatusCode::OK, Json(json!({ "data": value }))).into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "authentication failure").into_response()
}

async fn login(
    State(state): State<Arc<FakePve>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        method: "POST".to_string(),
        path: "/access/ticket".to_string(),
        csrf: None,
        ticket: None,
        query: HashMap::new(),
    });

    let accepted = !state.reject_login.load(Ordering::SeqCst)
        && form.get("username").map(String::as_str) == Some(USERNAME)
        && form.get("password").map(String::as_str) == Some(PASSWORD);
    if !accepted {
        return unauthorized();
    }

    let n = state.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let ticket = format!("PVE:{}:{}", USERNAME, n);
    let csrf = format!("csrf-{}", n);
    *state.session.lock().unwrap() = Some((ticket.clone(), csrf.clone()));

    data(json!({
        "ticket": ticket,
        "CSRFPreventionToken": csrf,
        "username": USERNAME
    }))
}

async fn api(
    State(state): State<Arc<FakePve>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let path = uri
        .path()
        .strip_prefix("/api2/json")
        .unwrap_or(uri.path())
        .to_string();
    let ticket = ticket_from(&headers);
    let csrf = headers
        .get("CSRFPreventionToken")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        csrf: csrf.clone(),
        ticket: ticket.clone(),
        query: query.clone(),
    });

    let (valid_ticket, valid_csrf) = match state.current() {
        Some(session) => session,
        None => return unauthorized(),
    };
    if ticket.as_deref() != Some(valid_ticket.as_str()) {
        return unauthorized();
    }
    if method != Method::GET && csrf.as_deref() != Some(valid_csrf.as_str()) {
        return (StatusCode::UNAUTHORIZED, "Permission check failed (invalid CSRF token)")
            .into_response();
    }

    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match (method.as_str(), segments.as_slice()) {
        ("GET", ["version"]) => {
            if state.slow_version.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            data(json!({"version": "6.2", "release": "6.2-4"}))
        }
        ("GET", ["cluster", "resources"]) => {
            (StatusCode::OK, Json(state.resources.lock().unwrap().clone())).into_response()
        }
        ("GET", ["cluster", "nextid"]) => data(json!("105")),
        ("GET", ["nodes", "slow", "status"]) => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            data(json!({}))
        }
        ("GET", ["nodes", _node, "status"]) => data(json!({
            "cpu": 0.05,
            "memory": {"total": 8192, "used": 2048, "free": 6144},
            "uptime": 3600,
            "pveversion": "pve-manager/6.2-4",
            "loadavg": ["0.01", "0.02", "0.03"]
        })),
        ("GET", ["nodes", _node, "storage", bucket, "content"]) => match *bucket {
            "templates" => data(json!([
                {"content": "vztmpl", "volid": "templates:vztmpl/debian-10.0-standard_10.0-1_amd64.tar.gz", "format": "tgz", "size": 231060971},
                {"content": "vztmpl", "volid": "templates:vztmpl/alpine-3.12-default_20200823_amd64.tar.xz", "format": "txz", "size": 2386800}
            ])),
            "ISOs" => data(json!([
                {"content": "iso", "volid": "ISOs:iso/debian-10.4.0-amd64-netinst.iso", "format": "iso", "size": 352321536}
            ])),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "storage does not exist").into_response(),
        },
        ("GET", ["nodes", _node, "lxc", vmid, "config"]) => data(json!({
            "hostname": format!("ct-{}", vmid),
            "memory": 512,
            "cores": 1,
            "cpulimit": "1",
            "digest": "0123abcd",
            "net0": "name=eth0,bridge=vmbr3,hwaddr=02:00:00:00:00:01,ip=dhcp,tag=10,type=veth"
        })),
        ("POST", ["nodes", _node, "lxc"]) => {
            let vmid: u32 = match query.get("vmid").and_then(|v| v.parse().ok()) {
                Some(vmid) => vmid,
                None => {
                    return (StatusCode::BAD_REQUEST, "parameter verification failed: vmid")
                        .into_response()
                }
            };
            if !state.containers.lock().unwrap().insert(vmid) {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("CT {} already exists on node", vmid),
                )
                    .into_response();
            }
            data(json!(format!("UPID:pve1:vzcreate:{}", vmid)))
        }
        ("POST", ["nodes", _node, "lxc", vmid, "status", action]) => {
            if state.stall_rejections.load(Ordering::SeqCst) {
                let stalled = futures::stream::once(async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    Ok::<_, std::io::Error>("too late")
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, Body::from_stream(stalled))
                    .into_response();
            }
            if state.fail_actions.load(Ordering::SeqCst) {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("CT {} is locked ({})", vmid, action),
                )
                    .into_response();
            }
            data(json!(format!("UPID:pve1:vz{}:{}", action, vmid)))
        }
        ("DELETE", ["nodes", _node, "lxc", vmid]) => {
            let vmid: u32 = vmid.parse().unwrap_or(0);
            if !state.containers.lock().unwrap().remove(&vmid) {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("CT {} does not exist", vmid),
                )
                    .into_response();
            }
            data(json!(format!("UPID:pve1:vzdestroy:{}", vmid)))
        }
        _ => (StatusCode::NOT_IMPLEMENTED, "no such method").into_response(),
    }
}

/// Start the fake API on an ephemeral port
pub async fn spawn_fake_pve() -> (String, Arc<FakePve>) {
    let state = Arc::new(FakePve::new());
    let app = Router::new()
        .route("/api2/json/access/ticket", post(login))
        .fallback(api)
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake PVE");
    let addr = listener.local_addr().expect("Failed to get local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

pub fn config_for(base_url: &str) -> ClientConfig {
    ClientConfig::new(base_url, USERNAME, PASSWORD).with_timeout(2)
}
