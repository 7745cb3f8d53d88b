//! Blocking HTTP client built on `reqwest`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::request::{canonical_header, Method, Request};
use crate::response::Response;

/// Maximum length of a body written to the debug log.
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncates a body for logging.
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };
    truncated.replace(char::is_control, "")
}

/// Configuration for [`HttpClient`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URI relative resource addresses are joined onto.
    pub root_uri: String,
    /// Media type used for `Accept`/`Content-Type` and response decoding.
    /// `None` decodes every body as JSON when possible.
    pub mime_type: Option<String>,
    /// `User-Agent` header.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            root_uri: String::new(),
            mime_type: Some("application/json".to_string()),
            user_agent: concat!("oxide-rest/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: Some(30),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration rooted at `root_uri`.
    pub fn new(root_uri: impl Into<String>) -> Self {
        Self {
            root_uri: root_uri.into(),
            ..Self::default()
        }
    }

    /// Sets the media type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: Option<String>) -> Self {
        self.mime_type = mime_type;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// A [`Client`] performing real HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
    config: ClientConfig,
}

impl HttpClient {
    /// Creates a client from its configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        Ok(Self { client, config })
    }

    /// Creates a client with default settings rooted at `root_uri`.
    pub fn with_root(root_uri: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(root_uri))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn decode(&self, headers: &BTreeMap<String, String>, body: &str) -> Value {
        if body.is_empty() {
            return Value::Null;
        }
        let matches = match &self.config.mime_type {
            None => true,
            Some(mime) => headers
                .get("Content-Type")
                .is_some_and(|ct| ct.starts_with(mime.as_str())),
        };
        if matches {
            if let Ok(value) = serde_json::from_str(body) {
                return value;
            }
        }
        Value::String(body.to_string())
    }
}

impl Client for HttpClient {
    fn request(&self, request: Request) -> Result<Response> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.uri);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().map_err(|source| {
            tracing::error!(method = %request.method, uri = %request.uri, "request failed: {source}");
            ClientError::Transport {
                method: request.method.to_string(),
                uri: request.uri.clone(),
                source,
            }
        })?;

        let status_code = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (canonical_header(name.as_str()), v.to_string()))
            })
            .collect();
        let body = response.text().map_err(|source| ClientError::Transport {
            method: request.method.to_string(),
            uri: request.uri.clone(),
            source,
        })?;

        tracing::info!(method = %request.method, uri = %request.uri, status = status_code, "HTTP request");
        tracing::debug!(body = %sanitize_for_log(&body), "HTTP response body");

        let content = self.decode(&headers, &body);
        Ok(Response {
            status_code,
            headers,
            content,
            request,
        })
    }

    fn root_uri(&self) -> &str {
        &self.config.root_uri
    }

    fn mime_type(&self) -> Option<&str> {
        self.config.mime_type.as_deref()
    }
}
