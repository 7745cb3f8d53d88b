//! An in-memory client for tests.
//!
//! `MockClient` answers from canned responses keyed by method and URI and
//! records every request it sees, so tests can assert on exactly which pages
//! were fetched or which verb a save used.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::request::{Method, Request};
use crate::response::Response;

#[derive(Debug, Clone)]
struct Canned {
    status: u16,
    content: Value,
}

#[derive(Debug, Default)]
struct Routes {
    /// Responses served once each, in order, before falling back.
    queued: BTreeMap<(Method, String), VecDeque<Canned>>,
    /// Responses served every time.
    fixed: BTreeMap<(Method, String), Canned>,
}

/// A [`Client`] serving canned responses.
///
/// URIs are matched exactly after resolution against the root URI, query
/// string included.
#[derive(Debug, Default)]
pub struct MockClient {
    root_uri: String,
    routes: Mutex<Routes>,
    requests: Mutex<Vec<Request>>,
}

impl MockClient {
    /// Creates an empty mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock client that resolves relative URIs against `root_uri`.
    pub fn with_root(root_uri: impl Into<String>) -> Self {
        Self {
            root_uri: root_uri.into(),
            ..Self::default()
        }
    }

    /// Serves `status`/`content` for every `method uri` request.
    #[must_use]
    pub fn on(self, method: Method, uri: impl Into<String>, status: u16, content: Value) -> Self {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fixed
            .insert((method, uri.into()), Canned { status, content });
        self
    }

    /// Serves `status`/`content` for the next `method uri` request only.
    #[must_use]
    pub fn once(self, method: Method, uri: impl Into<String>, status: u16, content: Value) -> Self {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queued
            .entry((method, uri.into()))
            .or_default()
            .push_back(Canned { status, content });
        self
    }

    /// Shorthand for a 200 GET.
    #[must_use]
    pub fn get_ok(self, uri: impl Into<String>, content: Value) -> Self {
        self.on(Method::Get, uri, 200, content)
    }

    /// Returns every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many requests hit `method uri`.
    pub fn count(&self, method: Method, uri: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.method == method && r.uri == uri)
            .count()
    }

    /// Returns the total number of requests.
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forgets the recorded requests.
    pub fn reset(&self) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Client for MockClient {
    fn request(&self, request: Request) -> Result<Response> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let key = (request.method, request.uri.clone());
        let canned = {
            let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            let queued = routes.queued.get_mut(&key).and_then(VecDeque::pop_front);
            queued.or_else(|| routes.fixed.get(&key).cloned())
        };

        match canned {
            Some(Canned { status, content }) => {
                tracing::debug!(method = %request.method, uri = %request.uri, status, "mock response");
                Ok(Response::new(request, status, content))
            }
            None => Err(ClientError::Unmatched {
                method: request.method.to_string(),
                uri: request.uri,
            }),
        }
    }

    fn root_uri(&self) -> &str {
        &self.root_uri
    }
}
