//! Control-plane client: route CRUD and handler-resource lookups.

use encuentro_core::types::{HandlerId, Route, RoutePosition, RouteSpec};

use crate::error::{ClientError, Result};
use crate::response::ResponseSnapshot;

/// Client for the dispatch server's control API.
///
/// One HTTP call per method, no retries: the assertion layer sees exactly
/// what the server said. Typed methods (`list_routes`, `append_route`)
/// insist on success because scenario setup cannot proceed without it;
/// the `*_raw` and id-addressed methods return snapshots verbatim so
/// scenarios can assert on failures too.
#[derive(Debug, Clone)]
pub struct ControlClient {
    base: String,
    http: reqwest::Client,
}

impl ControlClient {
    /// Creates a client for the control API at `base`.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: trim_base(base.into()),
            http: reqwest::Client::new(),
        }
    }

    /// Returns the base URL this client talks to.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn routes_url(&self) -> String {
        format!("{}/routes", self.base)
    }

    fn route_url(&self, id: &str) -> String {
        format!("{}/routes/{id}", self.base)
    }

    /// Lists all routes, in server order.
    ///
    /// # Errors
    /// Fails on transport errors, non-success statuses, or an unparseable
    /// listing.
    pub async fn list_routes(&self) -> Result<Vec<Route>> {
        let url = self.routes_url();
        tracing::debug!(%url, "listing routes");
        let snapshot = ResponseSnapshot::capture(self.http.get(&url).send().await?).await?;
        snapshot.into_success()?.json_as()
    }

    /// Appends a route and returns it with its server-assigned id.
    ///
    /// # Errors
    /// Fails on transport errors or a non-success status.
    pub async fn append_route(&self, spec: &RouteSpec) -> Result<Route> {
        let url = self.routes_url();
        tracing::debug!(%url, method = %spec.method, path = %spec.path, "appending route");
        let snapshot =
            ResponseSnapshot::capture(self.http.post(&url).json(spec).send().await?).await?;
        snapshot.into_success()?.json_as()
    }

    /// Appends with a caller-supplied raw body, surfacing whatever the
    /// server answers. Used for malformed-document scenarios.
    ///
    /// # Errors
    /// Fails only on transport errors.
    pub async fn append_route_raw(&self, body: impl Into<String>) -> Result<ResponseSnapshot> {
        let response = self
            .http
            .post(self.routes_url())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .send()
            .await?;
        ResponseSnapshot::capture(response).await
    }

    /// Inserts with a raw JSON document (`PUT /routes`), surfacing the
    /// response verbatim.
    ///
    /// # Errors
    /// Fails only on transport errors.
    pub async fn insert_route_raw(&self, body: impl Into<String>) -> Result<ResponseSnapshot> {
        let response = self
            .http
            .put(self.routes_url())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .send()
            .await?;
        ResponseSnapshot::capture(response).await
    }

    /// Fetches one route by id, surfacing the response verbatim.
    ///
    /// # Errors
    /// Fails only on transport errors.
    pub async fn get_route(&self, id: &str) -> Result<ResponseSnapshot> {
        let response = self.http.get(self.route_url(id)).send().await?;
        ResponseSnapshot::capture(response).await
    }

    /// Deletes one route by id, surfacing the response verbatim.
    ///
    /// # Errors
    /// Fails only on transport errors.
    pub async fn delete_route(&self, id: &str) -> Result<ResponseSnapshot> {
        tracing::debug!(id, "deleting route");
        let response = self.http.delete(self.route_url(id)).send().await?;
        ResponseSnapshot::capture(response).await
    }

    /// Resolves a symbolic position against a fresh listing.
    ///
    /// Read-then-act: the returned route is only guaranteed to still hold
    /// that position while no other actor mutates the collection.
    ///
    /// # Errors
    /// Fails if the listing cannot be fetched or is too short.
    pub async fn resolve_position(&self, position: RoutePosition) -> Result<Route> {
        let routes = self.list_routes().await?;
        let len = routes.len();
        let out_of_range = ClientError::PositionOutOfRange {
            position: position_word(position),
            len,
        };
        let index = position.index(len).ok_or(out_of_range)?;
        routes
            .into_iter()
            .nth(index)
            .ok_or(ClientError::PositionOutOfRange {
                position: position_word(position),
                len,
            })
    }

    /// Fetches the route at a symbolic position.
    ///
    /// # Errors
    /// Fails if the position cannot be resolved or on transport errors.
    pub async fn get_route_at(&self, position: RoutePosition) -> Result<ResponseSnapshot> {
        let route = self.resolve_position(position).await?;
        self.get_route(&route.id).await
    }

    /// Deletes the route at a symbolic position.
    ///
    /// # Errors
    /// Fails if the position cannot be resolved or on transport errors.
    pub async fn delete_route_at(&self, position: RoutePosition) -> Result<ResponseSnapshot> {
        let route = self.resolve_position(position).await?;
        self.delete_route(&route.id).await
    }

    /// Reads a control-plane resource of a live request handler
    /// (`GET /handlers/{handler_id}/{resource}`), verbatim.
    ///
    /// # Errors
    /// Fails only on transport errors.
    pub async fn handler_resource(
        &self,
        handler_id: &HandlerId,
        resource: &str,
    ) -> Result<ResponseSnapshot> {
        let url = format!("{}/handlers/{handler_id}/{resource}", self.base);
        tracing::debug!(%url, "reading handler resource");
        let response = self.http.get(&url).send().await?;
        ResponseSnapshot::capture(response).await
    }
}

fn position_word(position: RoutePosition) -> &'static str {
    match position {
        RoutePosition::First => "first",
        RoutePosition::Second => "second",
        RoutePosition::Last => "last",
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}
