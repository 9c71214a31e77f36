//! Scope types on both sides of the adapter.
//!
//! - [`ServerScope`] is what the host server hands over for each request:
//!   plain text fields, some of them optional.
//! - [`HttpScope`] is what the application receives: the same information in
//!   AppProtocol form (byte-encoded path, query string and headers, split
//!   address pairs, protocol metadata and the shared lifespan state).
//! - [`LifespanScope`] is passed once per process to the lifespan handshake.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::messages::Headers;
use super::{DEFAULT_ASGI_VERSION, DEFAULT_SPEC_VERSION};

/// Protocol metadata advertised in every scope (`scope["asgi"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsgiVersion {
    pub version: String,
    pub spec_version: String,
}

impl Default for AsgiVersion {
    fn default() -> Self {
        Self {
            version: DEFAULT_ASGI_VERSION.to_string(),
            spec_version: DEFAULT_SPEC_VERSION.to_string(),
        }
    }
}

// ── Shared state ──────────────────────────────────────────────────────────────

/// The mutable state mapping shared between the lifespan handshake and every
/// request scope.
///
/// Cloning a `SharedState` clones the handle, not the map: all clones see the
/// same entries.  The adapter never holds the lock across an `.await`; any
/// multi-step coordination between requests is the application's business.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, serde_json::Value>> {
        // A panicking application must not make the state unusable for every
        // later request, so a poisoned lock is recovered rather than propagated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: serde_json::Value) {
        self.lock().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.lock().remove(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns `true` when both handles refer to the same underlying map.
    pub fn same_as(&self, other: &SharedState) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ── Host server view ──────────────────────────────────────────────────────────

/// The per-request scope object supplied by the host server.
///
/// Addresses use the `"host:port"` form.  Headers are kept in the order the
/// host server iterates them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerScope {
    pub proto: String,
    pub http_version: String,
    pub server: Option<String>,
    pub client: Option<String>,
    pub scheme: String,
    pub method: String,
    pub path: Option<String>,
    pub query_string: Option<String>,
    pub headers: Option<Vec<(String, String)>>,
}

impl ServerScope {
    /// Returns `true` when every field is empty or absent.
    ///
    /// An empty scope carries no request at all and is treated the same as a
    /// missing one by the scope translator.
    pub fn is_empty(&self) -> bool {
        self.proto.is_empty()
            && self.http_version.is_empty()
            && self.server.is_none()
            && self.client.is_none()
            && self.scheme.is_empty()
            && self.method.is_empty()
            && self.path.is_none()
            && self.query_string.is_none()
            && self.headers.is_none()
    }
}

// ── Application view ──────────────────────────────────────────────────────────

/// The AppProtocol scope for one HTTP request.
#[derive(Debug, Clone)]
pub struct HttpScope {
    pub asgi: AsgiVersion,
    /// Extensions the adapter supports, keyed by name.
    pub extensions: BTreeMap<String, serde_json::Value>,
    /// Connection type, copied from the host's `proto` (e.g. `"http"`).
    pub scope_type: String,
    pub http_version: String,
    /// `[host, port]`, or empty when the host did not report an address.
    pub server: Vec<String>,
    /// `[host, port]`, or empty when the host did not report an address.
    pub client: Vec<String>,
    pub scheme: String,
    pub method: String,
    pub path: String,
    pub raw_path: Vec<u8>,
    pub query_string: Vec<u8>,
    pub headers: Headers,
    pub root_path: String,
    pub state: SharedState,
}

/// The AppProtocol scope for the lifespan handshake.
#[derive(Debug, Clone)]
pub struct LifespanScope {
    pub asgi: AsgiVersion,
    pub state: SharedState,
}

/// The scope passed to [`Application::call`](super::app::Application::call).
#[derive(Debug, Clone)]
pub enum Scope {
    Http(HttpScope),
    Lifespan(LifespanScope),
}

impl Scope {
    /// The scope's `type` value.
    pub fn type_name(&self) -> &str {
        match self {
            Scope::Http(scope) => &scope.scope_type,
            Scope::Lifespan(_) => "lifespan",
        }
    }

    pub fn state(&self) -> &SharedState {
        match self {
            Scope::Http(scope) => &scope.state,
            Scope::Lifespan(scope) => &scope.state,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
