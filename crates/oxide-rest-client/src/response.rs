//! HTTP response type.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::request::{canonical_header, Request};

/// A response as seen by the resource layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers, with canonical (`Title-Case`) names.
    pub headers: BTreeMap<String, String>,
    /// Body content.
    ///
    /// Deserialized JSON when the content type matched the client's media
    /// type, the raw text as a JSON string otherwise, `Null` when empty.
    pub content: Value,
    /// The request that produced this response.
    pub request: Request,
}

impl Response {
    /// Creates a response with the given status and content.
    pub fn new(request: Request, status_code: u16, content: Value) -> Self {
        Self {
            status_code,
            headers: BTreeMap::new(),
            content,
            request,
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(canonical_header(key), value.into());
        self
    }

    /// Gets a header value.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers.get(&canonical_header(key)).map(String::as_str)
    }

    /// Returns true when the body carries something: not null, false, zero
    /// or an empty string, list or object.
    pub fn has_content(&self) -> bool {
        match &self.content {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;
    use serde_json::json;

    #[test]
    fn test_has_content() {
        let req = Request::new(Method::Delete, "http://localhost/book/1");
        assert!(!Response::new(req.clone(), 204, Value::Null).has_content());
        assert!(!Response::new(req.clone(), 200, json!({})).has_content());
        assert!(!Response::new(req.clone(), 200, json!(false)).has_content());
        assert!(!Response::new(req.clone(), 200, json!(0)).has_content());
        assert!(Response::new(req.clone(), 200, json!("ok")).has_content());
        assert!(Response::new(req, 200, json!({"deleted": true})).has_content());
    }

    #[test]
    fn test_header_lookup_is_normalized() {
        let req = Request::new(Method::Get, "http://localhost/");
        let res = Response::new(req, 200, Value::Null).header("content-type", "application/json");
        assert_eq!(res.get_header("Content-Type"), Some("application/json"));
    }
}
