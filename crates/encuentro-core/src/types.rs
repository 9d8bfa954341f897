//! Core identifiers and route representations.
//!
//! Identities are opaque: route ids and handler ids are minted by the
//! dispatch server and never interpreted by the harness beyond equality.

use serde::{Deserialize, Serialize};

/// Server-minted identifier for one in-flight request handler.
///
/// The harness treats this as an opaque capability for control-plane
/// lookups (`/handlers/{id}/...`); the OS process id is carried
/// separately and only used for signal delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(String);

impl HandlerId {
    /// Creates a handler id from the server-supplied string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is empty (a protocol violation upstream).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique token scoping one test scenario.
///
/// The token names the scenario's rendezvous FIFO and mailbox directory so
/// concurrent scenarios never share filesystem state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioToken(uuid::Uuid);

impl ScenarioToken {
    /// Generates a fresh random token.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ScenarioToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScenarioToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A route definition as submitted to the control API.
///
/// The server assigns the id; the harness only ever references routes it
/// created, it never owns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// HTTP method the route matches.
    pub method: String,
    /// Path pattern the route matches.
    pub path: String,
    /// Full command line of the handler program.
    pub entrypoint: String,
}

impl RouteSpec {
    /// Creates a route spec.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        entrypoint: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            entrypoint: entrypoint.into(),
        }
    }
}

/// A route as returned by the control API, including its server-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Server-assigned opaque id.
    pub id: String,
    /// HTTP method the route matches.
    pub method: String,
    /// Path pattern the route matches.
    pub path: String,
    /// Full command line of the handler program.
    pub entrypoint: String,
}

impl Route {
    /// Returns the spec portion of the route.
    #[must_use]
    pub fn spec(&self) -> RouteSpec {
        RouteSpec::new(&self.method, &self.path, &self.entrypoint)
    }
}

/// Symbolic position into the ordered route listing.
///
/// Resolution is read-then-act against a fresh listing; it is only sound
/// while a single actor mutates the route collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePosition {
    /// The first route in the listing.
    First,
    /// The second route in the listing.
    Second,
    /// The last route in the listing.
    Last,
}

impl RoutePosition {
    /// Maps the English words used in scenario text to a position.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "first" => Some(Self::First),
            "second" => Some(Self::Second),
            "last" => Some(Self::Last),
            _ => None,
        }
    }

    /// Resolves the position against a listing of `len` routes.
    #[must_use]
    pub fn index(self, len: usize) -> Option<usize> {
        match self {
            Self::First => (len >= 1).then_some(0),
            Self::Second => (len >= 2).then_some(1),
            Self::Last => len.checked_sub(1),
        }
    }
}
