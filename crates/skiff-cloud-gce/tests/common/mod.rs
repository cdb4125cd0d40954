use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use serde_json::{Value, json};
use skiff_cloud_gce::{GceClient, GceProvider, StaticToken};
use skiff_config::{PollSettings, Settings};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const PROJECT: &str = "beaker-compute";
pub const ZONE: &str = "us-central1-a";
pub const TOKEN: &str = "ya29.test-token";

/// In-memory Compute Engine API served over HTTP
///
/// Mutations are applied immediately; every operation reports `RUNNING` on
/// its first probe and `DONE` afterwards.
#[derive(Default)]
pub struct FakeCompute {
    pub resources: HashMap<String, Value>,
    pub images: HashMap<String, Vec<Value>>,
    pub operation_probes: HashMap<String, u32>,
    pub requests: Vec<String>,
    /// Status codes to answer the next operation probes with
    pub operation_failures: Vec<u16>,
    next_operation: u32,
}

pub type Shared = Arc<Mutex<FakeCompute>>;

pub struct TestServer {
    pub state: Shared,
    pub base_url: String,
}

impl TestServer {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeCompute::default()));
        {
            let mut compute = state.lock().unwrap();
            let zonal = format!("{}/zones/{}", PROJECT, ZONE);
            compute.resources.insert(
                format!("{}/machineTypes/n1-standard-1", zonal),
                json!({
                    "name": "n1-standard-1",
                    "selfLink": format!("https://www.googleapis.com/compute/v1/projects/{}/machineTypes/n1-standard-1", zonal),
                }),
            );
            compute.resources.insert(
                format!("{}/global/networks/default", PROJECT),
                json!({
                    "name": "default",
                    "selfLink": format!("https://www.googleapis.com/compute/v1/projects/{}/global/networks/default", PROJECT),
                }),
            );
        }

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base_url: format!("http://{}/compute/v1", addr),
        }
    }

    pub fn client(&self, token: &str) -> GceClient {
        GceClient::new(Arc::new(StaticToken::new(token))).with_base_url(&self.base_url)
    }

    pub fn provider(&self) -> GceProvider {
        GceProvider::new(settings(), self.client(TOKEN)).unwrap()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn set_images(&self, project: &str, images: Vec<Value>) {
        self.state
            .lock()
            .unwrap()
            .images
            .insert(project.to_string(), images);
    }

    pub fn has_resource(&self, key: &str) -> bool {
        self.state.lock().unwrap().resources.contains_key(key)
    }

    pub fn resource(&self, key: &str) -> Option<Value> {
        self.state.lock().unwrap().resources.get(key).cloned()
    }
}

pub fn settings() -> Settings {
    Settings {
        project: PROJECT.to_string(),
        zone: ZONE.to_string(),
        timeout_secs: 1,
        poll: PollSettings {
            interval_ms: 10,
            max_interval_ms: 10,
            multiplier: 1.0,
            probe_timeout_ms: 5_000,
        },
        ..Settings::default()
    }
}

fn reply(status: StatusCode, body: Value) -> (StatusCode, Json<Value>) {
    (status, Json(body))
}

fn not_found(path: &str) -> (StatusCode, Json<Value>) {
    reply(
        StatusCode::NOT_FOUND,
        json!({"error": {"code": 404, "message": format!("The resource '{}' was not found", path)}}),
    )
}

async fn handle(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let mut compute = state.lock().unwrap();
    compute
        .requests
        .push(format!("{} {}", method, uri.path()));

    let expected = format!("Bearer {}", TOKEN);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return reply(
            StatusCode::UNAUTHORIZED,
            json!({"error": {"code": 401, "message": "Request had invalid authentication credentials."}}),
        );
    }

    let Some(path) = uri.path().strip_prefix("/compute/v1/projects/") else {
        return not_found(uri.path());
    };
    let path = path.to_string();
    let segments: Vec<&str> = path.split('/').collect();

    // <project>/zones/<zone>/<collection>[/<name>[/<action>]]
    // <project>/global/<collection>[/<name>]
    let (scope, rest) = match segments.as_slice() {
        [project, "zones", zone, rest @ ..] => (format!("{}/zones/{}", project, zone), rest.to_vec()),
        [project, "global", rest @ ..] => (format!("{}/global", project), rest.to_vec()),
        _ => return not_found(&path),
    };
    let zone_link = segments
        .get(1)
        .filter(|s| **s == "zones")
        .map(|_| format!("https://www.googleapis.com/compute/v1/projects/{}", scope));

    match (method, rest.as_slice()) {
        (Method::GET, ["images"]) => {
            let project = segments[0];
            let images = compute.images.get(project).cloned().unwrap_or_default();
            let second_page = uri.query().is_some_and(|q| q.contains("pageToken=page-2"));
            if images.len() > 1 && !second_page {
                reply(
                    StatusCode::OK,
                    json!({"items": [images[0].clone()], "nextPageToken": "page-2"}),
                )
            } else if second_page {
                reply(StatusCode::OK, json!({"items": images[1..].to_vec()}))
            } else {
                reply(StatusCode::OK, json!({"items": images}))
            }
        }
        (Method::GET, ["operations", name]) => {
            if let Some(code) = compute.operation_failures.pop() {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                return reply(status, json!({"error": {"code": code, "message": "backendError"}}));
            }
            let probes = compute.operation_probes.entry(name.to_string()).or_insert(0);
            *probes += 1;
            let status = if *probes == 1 { "RUNNING" } else { "DONE" };
            reply(
                StatusCode::OK,
                operation(name, status, zone_link.as_deref()),
            )
        }
        (Method::GET, [collection]) => {
            let prefix = format!("{}/{}/", scope, collection);
            let items: Vec<Value> = compute
                .resources
                .iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .map(|(_, v)| v.clone())
                .collect();
            reply(StatusCode::OK, json!({"items": items}))
        }
        (Method::POST, [collection]) => {
            let mut resource: Value = serde_json::from_str(&body).unwrap_or(json!({}));
            let name = resource["name"].as_str().unwrap_or_default().to_string();
            let key = format!("{}/{}/{}", scope, collection, name);
            if compute.resources.contains_key(&key) {
                return reply(
                    StatusCode::CONFLICT,
                    json!({"error": {"code": 409, "message": format!("The resource '{}' already exists", key)}}),
                );
            }
            resource["selfLink"] = json!(format!("https://www.googleapis.com/compute/v1/projects/{}", key));
            resource["metadata"] = json!({"fingerprint": "QifdRPFQkVk=", "kind": "compute#metadata"});
            compute.resources.insert(key, resource);
            let op = compute.start_operation();
            reply(StatusCode::OK, operation(&op, "PENDING", zone_link.as_deref()))
        }
        (Method::GET, [collection, name]) => {
            let key = format!("{}/{}/{}", scope, collection, name);
            match compute.resources.get(&key) {
                Some(resource) => reply(StatusCode::OK, resource.clone()),
                None => not_found(&key),
            }
        }
        (Method::DELETE, [collection, name]) => {
            let key = format!("{}/{}/{}", scope, collection, name);
            if compute.resources.remove(&key).is_none() {
                return not_found(&key);
            }
            let op = compute.start_operation();
            reply(StatusCode::OK, operation(&op, "PENDING", zone_link.as_deref()))
        }
        (Method::POST, [collection, name, "setMetadata"]) => {
            let key = format!("{}/{}/{}", scope, collection, name);
            let update: Value = serde_json::from_str(&body).unwrap_or(json!({}));
            let Some(resource) = compute.resources.get_mut(&key) else {
                return not_found(&key);
            };
            resource["metadata"] = json!({
                "fingerprint": "updated-fingerprint",
                "items": update["items"].clone(),
            });
            let op = compute.start_operation();
            reply(StatusCode::OK, operation(&op, "PENDING", zone_link.as_deref()))
        }
        _ => not_found(&path),
    }
}

impl FakeCompute {
    fn start_operation(&mut self) -> String {
        self.next_operation += 1;
        format!("operation-{}", self.next_operation)
    }
}

fn operation(name: &str, status: &str, zone_link: Option<&str>) -> Value {
    let mut op = json!({
        "kind": "compute#operation",
        "name": name,
        "status": status,
    });
    if let Some(zone) = zone_link {
        op["zone"] = json!(zone);
    }
    op
}
