//! The client abstraction resources talk to, and the process-wide default.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::request::{Method, Request};
use crate::response::Response;

/// A synchronous HTTP/JSON client.
///
/// Implementors only provide [`Client::request`]; the verb helpers and URI
/// resolution are shared. Every call blocks until a response or a transport
/// error is available.
pub trait Client: fmt::Debug + Send + Sync {
    /// Performs a fully resolved request.
    fn request(&self, request: Request) -> Result<Response>;

    /// Base URI relative request URIs are joined onto.
    fn root_uri(&self) -> &str {
        ""
    }

    /// Media type sent as `Accept` and `Content-Type`. Responses whose
    /// content type starts with it are deserialized.
    fn mime_type(&self) -> Option<&str> {
        Some("application/json")
    }

    /// Builds a [`Request`], resolving `uri` against [`Client::root_uri`].
    fn create_request(&self, uri: &str, method: Method, body: Option<Value>) -> Result<Request> {
        let uri = resolve_uri(self.root_uri(), uri)?;
        let mut request = Request::new(method, uri);
        if let Some(mime) = self.mime_type() {
            request = request.header("Accept", mime).header("Content-Type", mime);
        }
        request.body = body;
        Ok(request)
    }

    /// Performs a GET request.
    fn get(&self, uri: &str) -> Result<Response> {
        self.request(self.create_request(uri, Method::Get, None)?)
    }

    /// Performs a POST request.
    fn post(&self, uri: &str, body: Value) -> Result<Response> {
        self.request(self.create_request(uri, Method::Post, Some(body))?)
    }

    /// Performs a PUT request.
    fn put(&self, uri: &str, body: Value) -> Result<Response> {
        self.request(self.create_request(uri, Method::Put, Some(body))?)
    }

    /// Performs a DELETE request.
    fn delete(&self, uri: &str) -> Result<Response> {
        self.request(self.create_request(uri, Method::Delete, None)?)
    }
}

/// Joins `uri` onto `root` unless it already lives under it.
pub fn resolve_uri(root: &str, uri: &str) -> Result<String> {
    if root.is_empty() || uri.starts_with(root) {
        return Ok(uri.to_string());
    }
    let base = url::Url::parse(root).map_err(|source| ClientError::InvalidUri {
        uri: root.to_string(),
        source,
    })?;
    base.join(uri)
        .map(String::from)
        .map_err(|source| ClientError::InvalidUri {
            uri: uri.to_string(),
            source,
        })
}

static DEFAULT_CLIENT: RwLock<Option<Arc<dyn Client>>> = RwLock::new(None);

/// Installs the process-wide default client.
///
/// Resource types capture the default when they are built and never read it
/// again, so this belongs in startup code.
pub fn set_default_client(client: Arc<dyn Client>) {
    *DEFAULT_CLIENT.write().unwrap_or_else(PoisonError::into_inner) = Some(client);
}

/// Removes the process-wide default client.
pub fn clear_default_client() {
    *DEFAULT_CLIENT.write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Returns the process-wide default client, if one is installed.
pub fn default_client() -> Option<Arc<dyn Client>> {
    DEFAULT_CLIENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Installs `client` as the default until the returned guard is dropped.
///
/// ```ignore
/// let mock = Arc::new(MockClient::new());
/// {
///     let _guard = scoped_default_client(mock.clone());
///     let books = book_type();   // captures `mock`
/// }
/// // previous default restored here
/// ```
pub fn scoped_default_client(client: Arc<dyn Client>) -> DefaultClientGuard {
    let mut slot = DEFAULT_CLIENT.write().unwrap_or_else(PoisonError::into_inner);
    let previous = slot.replace(client);
    DefaultClientGuard { previous }
}

/// Restores the previous default client on drop.
#[must_use = "the default client is restored as soon as the guard is dropped"]
pub struct DefaultClientGuard {
    previous: Option<Arc<dyn Client>>,
}

impl Drop for DefaultClientGuard {
    fn drop(&mut self) {
        *DEFAULT_CLIENT.write().unwrap_or_else(PoisonError::into_inner) = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_uri() {
        let uri = resolve_uri("http://localhost/api/", "book/1").unwrap();
        assert_eq!(uri, "http://localhost/api/book/1");
    }

    #[test]
    fn test_resolve_uri_under_root_is_untouched() {
        let uri = resolve_uri("http://localhost/api/", "http://localhost/api/book/").unwrap();
        assert_eq!(uri, "http://localhost/api/book/");
    }

    #[test]
    fn test_resolve_uri_on_other_host() {
        let uri = resolve_uri("http://localhost/api/", "http://search.localhost/q").unwrap();
        assert_eq!(uri, "http://search.localhost/q");
    }

    #[test]
    fn test_resolve_without_root() {
        assert_eq!(resolve_uri("", "book/").unwrap(), "book/");
    }

    #[test]
    fn test_invalid_root() {
        assert!(matches!(
            resolve_uri("not a url", "book/"),
            Err(ClientError::InvalidUri { .. })
        ));
    }
}
