//! # oxide-rest-client
//!
//! The transport layer behind `oxide-rest` resources.
//!
//! This crate provides:
//! - `Client`, the blocking request/response interface resources talk to
//! - `HttpClient`, a `reqwest`-backed implementation configured by `ClientConfig`
//! - `MockClient`, canned responses plus request recording for tests
//! - A process-wide default client slot, read once when a resource type is built
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use oxide_rest_client::{Client, ClientConfig, HttpClient};
//!
//! let client = HttpClient::new(ClientConfig::new("http://localhost/api/"))?;
//! let response = client.get("book/")?;
//! assert_eq!(response.status_code, 200);
//! println!("{}", response.content);
//! ```
//!
//! ## Testing
//!
//! ```ignore
//! use oxide_rest_client::{Method, MockClient};
//! use serde_json::json;
//!
//! let client = MockClient::new()
//!     .get_ok("http://localhost/book/", json!([{"id": 1}]))
//!     .on(Method::Post, "http://localhost/book/", 201, json!({"id": 2}));
//! ```

mod client;
mod error;
mod http;
mod mock;
mod request;
mod response;

pub use client::{
    clear_default_client, default_client, resolve_uri, scoped_default_client,
    set_default_client, Client, DefaultClientGuard,
};
pub use error::{ClientError, Result};
pub use http::{ClientConfig, HttpClient};
pub use mock::MockClient;
pub use request::{Method, Request};
pub use response::Response;
