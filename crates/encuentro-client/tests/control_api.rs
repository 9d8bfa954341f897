//! Control-plane client against a live in-process dispatch server.

use encuentro_client::{ClientError, ControlClient};
use encuentro_core::types::{RoutePosition, RouteSpec};
use encuentro_harness::MockDispatchServer;

async fn control() -> (MockDispatchServer, ControlClient) {
    let mock = MockDispatchServer::start().await.unwrap();
    let client = ControlClient::new(mock.control_url());
    (mock, client)
}

#[tokio::test]
async fn test_append_echoes_spec_with_minted_id() {
    let (_mock, client) = control().await;
    let spec = RouteSpec::new("POST", "/submit", "probe --fifo /tmp/f");
    let route = client.append_route(&spec).await.unwrap();

    assert!(!route.id.is_empty());
    assert_eq!(route.spec(), spec);
}

#[tokio::test]
async fn test_listing_preserves_append_order() {
    let (_mock, client) = control().await;
    for path in ["/one", "/two", "/three"] {
        client
            .append_route(&RouteSpec::new("GET", path, "probe"))
            .await
            .unwrap();
    }

    let paths: Vec<String> = client
        .list_routes()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.path)
        .collect();
    assert_eq!(paths, ["/one", "/two", "/three"]);
}

#[tokio::test]
async fn test_get_route_round_trips_by_id() {
    let (_mock, client) = control().await;
    let route = client
        .append_route(&RouteSpec::new("GET", "/lookup", "probe"))
        .await
        .unwrap();

    let snapshot = client.get_route(&route.id).await.unwrap();
    assert_eq!(snapshot.status, 200);
    let fetched: encuentro_core::types::Route = snapshot.json_as().unwrap();
    assert_eq!(fetched, route);
}

#[tokio::test]
async fn test_get_unknown_route_is_404() {
    let (_mock, client) = control().await;
    let snapshot = client.get_route("no-such-id").await.unwrap();
    assert_eq!(snapshot.status, 404);
}

#[tokio::test]
async fn test_position_resolution_on_empty_listing_fails() {
    let (_mock, client) = control().await;
    let err = client.resolve_position(RoutePosition::First).await.unwrap_err();
    assert!(
        matches!(err, ClientError::PositionOutOfRange { len: 0, .. }),
        "got {err}"
    );
}

#[tokio::test]
async fn test_second_position_needs_two_routes() {
    let (_mock, client) = control().await;
    client
        .append_route(&RouteSpec::new("GET", "/only", "probe"))
        .await
        .unwrap();

    let err = client.resolve_position(RoutePosition::Second).await.unwrap_err();
    assert!(matches!(err, ClientError::PositionOutOfRange { .. }), "got {err}");

    client
        .append_route(&RouteSpec::new("GET", "/more", "probe"))
        .await
        .unwrap();
    let second = client.resolve_position(RoutePosition::Second).await.unwrap();
    assert_eq!(second.path, "/more");
}

#[tokio::test]
async fn test_delete_at_position_removes_exactly_that_route() {
    let (_mock, client) = control().await;
    for path in ["/a", "/b", "/c"] {
        client
            .append_route(&RouteSpec::new("GET", path, "probe"))
            .await
            .unwrap();
    }

    let snapshot = client.delete_route_at(RoutePosition::Last).await.unwrap();
    assert_eq!(snapshot.status, 204);

    let paths: Vec<String> = client
        .list_routes()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.path)
        .collect();
    assert_eq!(paths, ["/a", "/b"]);
}

#[tokio::test]
async fn test_single_route_is_both_first_and_last() {
    let (_mock, client) = control().await;
    let route = client
        .append_route(&RouteSpec::new("GET", "/solo", "probe"))
        .await
        .unwrap();

    let first = client.resolve_position(RoutePosition::First).await.unwrap();
    let last = client.resolve_position(RoutePosition::Last).await.unwrap();
    assert_eq!(first.id, route.id);
    assert_eq!(last.id, route.id);
}

#[tokio::test]
async fn test_malformed_append_leaves_listing_untouched() {
    let (_mock, client) = control().await;
    let snapshot = client.append_route_raw("not json at all").await.unwrap();
    assert_eq!(snapshot.status, 400);
    assert!(client.list_routes().await.unwrap().is_empty());
}
