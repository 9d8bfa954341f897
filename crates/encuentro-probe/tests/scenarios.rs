//! End-to-end scenarios: mock dispatch server, real probe binary, real
//! FIFO rendezvous and marker discovery.

use std::time::Duration;

use encuentro_client::ControlClient;
use encuentro_client::DataClient;
use encuentro_core::HarnessConfig;
use encuentro_harness::{MockDispatchServer, Scenario};
use encuentro_sync::{HandlerHandle, LifecycleController};
use serde_json::json;

const DEADLINE: Duration = Duration::from_secs(10);

fn probe_bin() -> &'static str {
    env!("CARGO_BIN_EXE_encuentro-probe")
}

fn scenario_in(base: &tempfile::TempDir) -> Scenario {
    let config = HarnessConfig {
        mailbox_base: base.path().to_path_buf(),
        ..HarnessConfig::default()
    };
    Scenario::new(&config).unwrap().with_probe_bin(probe_bin())
}

#[tokio::test]
async fn test_held_open_request_rendezvous_and_release() {
    let mock = MockDispatchServer::start().await.unwrap();
    let control = ControlClient::new(mock.control_url());
    let data = DataClient::new(mock.data_url(), mock.data_url());
    let base = tempfile::tempdir().unwrap();
    let scenario = scenario_in(&base);

    let spec = encuentro_core::types::RouteSpec::new("GET", "/hello", scenario.probe_entrypoint());
    control.append_route(&spec).await.unwrap();

    let pending = data.get_in_background("/hello");
    let handle = scenario.await_handshake(DEADLINE).await.unwrap();

    // The handler is live and holding the request open.
    assert!(scenario.is_alive(&handle));
    assert!(!pending.is_finished());
    let resource = control
        .handler_resource(handle.handler_id(), "pid")
        .await
        .unwrap();
    assert_eq!(resource.status, 200);
    assert!(resource.body_contains(&json!({ "pid": handle.pid() })));
    let body = control
        .handler_resource(handle.handler_id(), "body")
        .await
        .unwrap();
    assert_eq!(body.status, 200);

    let snapshot = scenario
        .release_and_join(&handle, pending, DEADLINE)
        .await
        .unwrap();
    assert_eq!(snapshot.status, 200);
    assert!(!scenario.is_alive(&handle));
    assert_eq!(mock.live_handlers(), 0);
}

#[tokio::test]
async fn test_marker_discovery_names_the_live_handler() {
    let mock = MockDispatchServer::start().await.unwrap();
    let control = ControlClient::new(mock.control_url());
    let data = DataClient::new(mock.data_url(), mock.data_url());
    let base = tempfile::tempdir().unwrap();
    let scenario = scenario_in(&base);

    let spec = encuentro_core::types::RouteSpec::new(
        "GET",
        "/background",
        scenario.probe_mailbox_entrypoint(),
    );
    control.append_route(&spec).await.unwrap();

    let pending = data.get_in_background("/background");
    let handler_id = scenario.discover_marker(DEADLINE).await.unwrap();

    // The discovered id is the one the server minted for this request.
    let resource = control.handler_resource(&handler_id, "pid").await.unwrap();
    assert_eq!(resource.status, 200);
    let pid = resource.json().unwrap()["pid"].as_u64().unwrap();

    let handle = HandlerHandle::new(handler_id, i32::try_from(pid).unwrap());
    let controller = LifecycleController::new();
    controller.release(&handle).unwrap();

    let snapshot = pending.join(DEADLINE).await.unwrap();
    assert_eq!(snapshot.status, 200);
}

#[tokio::test]
async fn test_released_handler_resource_is_gone() {
    let mock = MockDispatchServer::start().await.unwrap();
    let control = ControlClient::new(mock.control_url());
    let data = DataClient::new(mock.data_url(), mock.data_url());
    let base = tempfile::tempdir().unwrap();
    let scenario = scenario_in(&base);

    let spec = encuentro_core::types::RouteSpec::new("GET", "/once", scenario.probe_entrypoint());
    control.append_route(&spec).await.unwrap();

    let pending = data.get_in_background("/once");
    let handle = scenario.await_handshake(DEADLINE).await.unwrap();
    scenario
        .release_and_join(&handle, pending, DEADLINE)
        .await
        .unwrap();

    let resource = control
        .handler_resource(handle.handler_id(), "pid")
        .await
        .unwrap();
    assert_eq!(resource.status, 404);
}

#[tokio::test]
async fn test_append_and_insert_ordering() {
    let mock = MockDispatchServer::start().await.unwrap();
    let control = ControlClient::new(mock.control_url());

    let appended = control
        .append_route(&encuentro_core::types::RouteSpec::new(
            "GET", "/a", "probe-a",
        ))
        .await
        .unwrap();
    let inserted = control
        .insert_route_raw(
            json!({ "method": "GET", "path": "/b", "entrypoint": "probe-b" }).to_string(),
        )
        .await
        .unwrap();
    assert!(inserted.is_success(), "insert answered {}", inserted.status);

    // Insert lands at the front; append stays last.
    let routes = control.list_routes().await.unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].path, "/b");
    assert_eq!(routes[1].path, "/a");

    let first = control
        .resolve_position(encuentro_core::types::RoutePosition::First)
        .await
        .unwrap();
    assert_eq!(first.path, "/b");
    let fetched = control
        .get_route_at(encuentro_core::types::RoutePosition::First)
        .await
        .unwrap();
    assert_eq!(fetched.status, 200);
    assert!(fetched.body_contains(&json!({ "path": "/b" })));
    let last = control
        .resolve_position(encuentro_core::types::RoutePosition::Last)
        .await
        .unwrap();
    assert_eq!(last.id, appended.id);
}

#[tokio::test]
async fn test_route_ids_are_unique_for_identical_specs() {
    let mock = MockDispatchServer::start().await.unwrap();
    let control = ControlClient::new(mock.control_url());
    let spec = encuentro_core::types::RouteSpec::new("GET", "/same", "probe");

    let a = control.append_route(&spec).await.unwrap();
    let b = control.append_route(&spec).await.unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(control.list_routes().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_is_not_idempotent() {
    let mock = MockDispatchServer::start().await.unwrap();
    let control = ControlClient::new(mock.control_url());
    let route = control
        .append_route(&encuentro_core::types::RouteSpec::new("GET", "/x", "probe"))
        .await
        .unwrap();

    let first = control.delete_route(&route.id).await.unwrap();
    assert_eq!(first.status, 204);
    let second = control.delete_route(&route.id).await.unwrap();
    assert_eq!(second.status, 404);
}

#[tokio::test]
async fn test_malformed_route_document_is_rejected_without_side_effects() {
    let mock = MockDispatchServer::start().await.unwrap();
    let control = ControlClient::new(mock.control_url());
    control
        .append_route(&encuentro_core::types::RouteSpec::new(
            "GET", "/keep", "probe",
        ))
        .await
        .unwrap();

    let snapshot = control
        .append_route_raw("{\"method\": \"GET\", \"path\":")
        .await
        .unwrap();
    assert_eq!(snapshot.status, 400);
    assert_eq!(snapshot.reason, "Bad Request");

    // The listing is exactly what it was before the bad request.
    let routes = control.list_routes().await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].path, "/keep");
}

#[tokio::test]
async fn test_malformed_insert_document_is_rejected_without_side_effects() {
    let mock = MockDispatchServer::start().await.unwrap();
    let control = ControlClient::new(mock.control_url());
    control
        .append_route(&encuentro_core::types::RouteSpec::new(
            "GET", "/keep", "probe",
        ))
        .await
        .unwrap();

    let snapshot = control
        .insert_route_raw("{\"method\": \"PUT\", \"path\"")
        .await
        .unwrap();
    assert_eq!(snapshot.status, 400);
    assert_eq!(snapshot.reason, "Bad Request");

    let routes = control.list_routes().await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].path, "/keep");
}

#[tokio::test]
async fn test_unmatched_request_is_dispatched_to_nothing() {
    let mock = MockDispatchServer::start().await.unwrap();
    let data = DataClient::new(mock.data_url(), mock.data_url());
    let snapshot = data.get("/unrouted").await.unwrap();
    assert_eq!(snapshot.status, 404);
    assert_eq!(mock.live_handlers(), 0);
}
