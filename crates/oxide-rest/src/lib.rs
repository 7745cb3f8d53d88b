//! # oxide-rest
//!
//! Django-like resources over HTTP/JSON APIs.
//!
//! This crate provides:
//! - `ResourcePattern` for mapping between URLs and named parameters
//! - Field types that clean values on assignment
//! - `ResourceBuilder` to declare resource types, with inheritance
//! - `Manager` and lazy, paginated `QuerySet`s
//! - `Resource` instances with `save`, `delete` and lazy relations
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use oxide_rest::fields::{CharField, FieldOptions, IntegerField};
//! use oxide_rest::ResourceBuilder;
//! use oxide_rest_client::MockClient;
//! use serde_json::json;
//!
//! # fn main() -> oxide_rest::Result<()> {
//! let client = Arc::new(
//!     MockClient::new()
//!         .get_ok(
//!             "http://localhost/api/book/?page=1&page_size=2",
//!             json!({"count": 3, "results": [{"id": 1, "title": "A"}, {"id": 2, "title": "B"}]}),
//!         )
//!         .get_ok(
//!             "http://localhost/api/book/?page=2&page_size=2",
//!             json!({"count": 3, "results": [{"id": 3, "title": "C"}]}),
//!         ),
//! );
//!
//! let book = ResourceBuilder::new("book")
//!     .root("http://localhost/api/")
//!     .list(r"^book/$")
//!     .item(r"^book/(?P<id>\d+)$")
//!     .page_size(2)
//!     .client(client)
//!     .field("id", IntegerField::new().options(FieldOptions::new().primary_key(true)))
//!     .field("title", CharField::new().max_length(200))
//!     .build()?;
//!
//! let mut books = book.objects().all();
//! assert_eq!(books.count()?, 3);
//!
//! let third = books.get_index(2)?;
//! assert_eq!(third.get("title")?, json!("C"));
//! assert_eq!(third.absolute_url(), Some("http://localhost/api/book/3"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Saving
//!
//! ```ignore
//! let mut data = serde_json::Map::new();
//! data.insert("title".into(), "Dune".into());
//! let created = book.objects().create(data)?; // POST to the list address
//!
//! let mut existing = book.objects().get([("pk", 7)])?;
//! existing.set("title", "Dune Messiah")?;
//! existing.save()?; // PUT to the absolute URL
//! ```

mod error;
pub mod fields;
mod manager;
mod options;
mod pattern;
mod queryset;
mod registry;
mod resource;

pub use error::{ResourceError, Result};
pub use manager::Manager;
pub use options::{ResourceBuilder, ResourceOptions, ResourceType};
pub use pattern::{
    encode_query, value_to_param, Params, PatternError, PatternSpec, Query, ResourcePattern,
};
pub use queryset::QuerySet;
pub use registry::Registry;
pub use resource::{LazyResource, Resource};

// Re-export the client surface resources are configured with
pub use oxide_rest_client::{
    default_client, scoped_default_client, set_default_client, Client, ClientError, Method,
};
