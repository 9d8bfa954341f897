//! An in-process stand-in for the dispatch server under test.
//!
//! The mock speaks just enough of the server's two surfaces for the
//! harness to exercise the whole synchronization protocol hermetically:
//!
//! - control API: `GET/POST/PUT /routes`, `GET/DELETE /routes/{id}`,
//!   `GET /handlers/{id}/{resource}`
//! - data API: any request matching an installed route spawns the route's
//!   entrypoint as a child process, with the handler id in the
//!   `ENCUENTRO_HANDLER_ID` environment variable, and holds the HTTP
//!   response open until that process exits
//!
//! Route matching is exact method + path; pattern routing belongs to the
//! real server, not to this stand-in.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use encuentro_core::types::{Route, RouteSpec};

use crate::error::Result;

#[derive(Debug, Default)]
struct MockState {
    routes: Mutex<Vec<Route>>,
    /// Handler id -> pid for every request currently held open.
    live: Mutex<HashMap<String, u32>>,
}

impl MockState {
    fn routes(&self) -> MutexGuard<'_, Vec<Route>> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn live(&self) -> MutexGuard<'_, HashMap<String, u32>> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A running mock dispatch server.
///
/// Dropping it stops both listeners and SIGKILLs any handler process
/// still held open, so a failed test cannot leak probes.
#[derive(Debug)]
pub struct MockDispatchServer {
    state: Arc<MockState>,
    control_url: String,
    data_url: String,
    control_task: JoinHandle<()>,
    data_task: JoinHandle<()>,
}

impl MockDispatchServer {
    /// Binds the control and data listeners on ephemeral localhost ports.
    ///
    /// # Errors
    /// Fails if either listener cannot be bound.
    pub async fn start() -> Result<Self> {
        let state = Arc::new(MockState::default());

        let control_router = Router::new()
            .route(
                "/routes",
                get(list_routes).post(append_route).put(insert_route),
            )
            .route("/routes/:id", get(get_route).delete(delete_route))
            .route("/handlers/:id/:resource", get(handler_resource))
            .with_state(state.clone());
        let data_router = Router::new().fallback(dispatch).with_state(state.clone());

        let control_listener = TcpListener::bind("127.0.0.1:0").await?;
        let data_listener = TcpListener::bind("127.0.0.1:0").await?;
        let control_url = format!("http://{}", control_listener.local_addr()?);
        let data_url = format!("http://{}", data_listener.local_addr()?);
        tracing::debug!(%control_url, %data_url, "mock dispatch server listening");

        let control_task = tokio::spawn(async move {
            let _ = axum::serve(control_listener, control_router).await;
        });
        let data_task = tokio::spawn(async move {
            let _ = axum::serve(data_listener, data_router).await;
        });

        Ok(Self {
            state,
            control_url,
            data_url,
            control_task,
            data_task,
        })
    }

    /// Base URL of the mock control API.
    #[must_use]
    pub fn control_url(&self) -> &str {
        &self.control_url
    }

    /// Base URL of the mock data API.
    #[must_use]
    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Number of requests currently held open by their handlers.
    #[must_use]
    pub fn live_handlers(&self) -> usize {
        self.state.live().len()
    }
}

impl Drop for MockDispatchServer {
    fn drop(&mut self) {
        self.control_task.abort();
        self.data_task.abort();
        for (handler_id, pid) in self.state.live().drain() {
            tracing::warn!(handler_id, pid, "killing leaked handler process");
            #[allow(clippy::cast_possible_wrap)] // pids fit in i32 on Unix
            let _ = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(pid as i32),
                nix::sys::signal::Signal::SIGKILL,
            );
        }
    }
}

async fn list_routes(State(state): State<Arc<MockState>>) -> Json<Vec<Route>> {
    Json(state.routes().clone())
}

async fn append_route(State(state): State<Arc<MockState>>, body: String) -> Response {
    match serde_json::from_str::<RouteSpec>(&body) {
        Ok(spec) => {
            let route = mint_route(spec);
            state.routes().push(route.clone());
            (StatusCode::CREATED, Json(route)).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            format!("invalid route document: {e}\n"),
        )
            .into_response(),
    }
}

/// `PUT /routes` inserts at an optional zero-based index, front by default.
#[derive(Debug, Deserialize)]
struct InsertDocument {
    #[serde(flatten)]
    spec: RouteSpec,
    #[serde(default)]
    index: usize,
}

async fn insert_route(State(state): State<Arc<MockState>>, body: String) -> Response {
    match serde_json::from_str::<InsertDocument>(&body) {
        Ok(doc) => {
            let route = mint_route(doc.spec);
            let mut routes = state.routes();
            let index = doc.index.min(routes.len());
            routes.insert(index, route.clone());
            (StatusCode::CREATED, Json(route)).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            format!("invalid route document: {e}\n"),
        )
            .into_response(),
    }
}

async fn get_route(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    let found = state.routes().iter().find(|r| r.id == id).cloned();
    match found {
        Some(route) => Json(route).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no route {id}\n")).into_response(),
    }
}

async fn delete_route(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    let mut routes = state.routes();
    let before = routes.len();
    routes.retain(|r| r.id != id);
    if routes.len() < before {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, format!("no route {id}\n")).into_response()
    }
}

async fn handler_resource(
    State(state): State<Arc<MockState>>,
    Path((id, resource)): Path<(String, String)>,
) -> Response {
    let Some(pid) = state.live().get(&id).copied() else {
        return (StatusCode::NOT_FOUND, format!("no live handler {id}\n")).into_response();
    };
    match resource.as_str() {
        "pid" => Json(json!({ "pid": pid })).into_response(),
        _ => Json(json!({ "id": id, "resource": resource, "state": "held" })).into_response(),
    }
}

/// The data path: match a route, spawn its entrypoint, hold the response
/// open until the handler exits.
async fn dispatch(State(state): State<Arc<MockState>>, method: Method, uri: Uri) -> Response {
    let route = state
        .routes()
        .iter()
        .find(|r| r.method.eq_ignore_ascii_case(method.as_str()) && r.path == uri.path())
        .cloned();
    let Some(route) = route else {
        return (StatusCode::NOT_FOUND, "no matching route\n").into_response();
    };

    let mut argv = route.entrypoint.split_whitespace();
    let Some(program) = argv.next() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "empty entrypoint\n").into_response();
    };

    let handler_id = uuid::Uuid::new_v4().to_string();
    let spawned = tokio::process::Command::new(program)
        .args(argv)
        .env("ENCUENTRO_HANDLER_ID", &handler_id)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to spawn handler: {e}\n"),
            )
                .into_response();
        }
    };

    let pid = child.id().unwrap_or(0);
    state.live().insert(handler_id.clone(), pid);
    tracing::debug!(handler_id, pid, path = uri.path(), "handler spawned, holding response");

    let waited = child.wait().await;
    state.live().remove(&handler_id);

    match waited {
        Ok(_status) => (StatusCode::OK, format!("handler {handler_id} done\n")).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("handler wait failed: {e}\n"),
        )
            .into_response(),
    }
}

fn mint_route(spec: RouteSpec) -> Route {
    Route {
        id: uuid::Uuid::new_v4().to_string(),
        method: spec.method,
        path: spec.path,
        entrypoint: spec.entrypoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encuentro_client::ControlClient;
    use encuentro_core::types::RouteSpec;

    #[tokio::test]
    async fn test_mock_starts_empty() {
        let mock = MockDispatchServer::start().await.unwrap();
        let control = ControlClient::new(mock.control_url());
        assert!(control.list_routes().await.unwrap().is_empty());
        assert_eq!(mock.live_handlers(), 0);
    }

    #[tokio::test]
    async fn test_mock_mints_distinct_route_ids() {
        let mock = MockDispatchServer::start().await.unwrap();
        let control = ControlClient::new(mock.control_url());
        let spec = RouteSpec::new("GET", "/hello", "probe --fifo /tmp/x");
        let a = control.append_route(&spec).await.unwrap();
        let b = control.append_route(&spec).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_data_path_404_without_routes() {
        let mock = MockDispatchServer::start().await.unwrap();
        let snapshot = encuentro_client::DataClient::new(mock.data_url(), mock.data_url())
            .get("/nothing")
            .await
            .unwrap();
        assert_eq!(snapshot.status, 404);
    }
}
