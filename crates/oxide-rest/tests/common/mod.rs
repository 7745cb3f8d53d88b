//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::ops::RangeInclusive;
use std::sync::Arc;

use oxide_rest::fields::{CharField, FieldOptions, IntegerField, ToManyField, ToOneField};
use oxide_rest::{ResourceBuilder, ResourceType};
use oxide_rest_client::MockClient;
use serde_json::{json, Map, Value};

pub const ROOT: &str = "http://localhost/api/";

pub fn primary_key() -> IntegerField {
    IntegerField::new().options(FieldOptions::new().primary_key(true))
}

pub fn author(client: Arc<MockClient>) -> ResourceType {
    ResourceBuilder::new("author")
        .root(ROOT)
        .list(r"^author/$")
        .item(r"^author/(?P<id>\d+)$")
        .client(client)
        .field("id", primary_key())
        .field("name", CharField::new())
        .build()
        .unwrap()
}

pub fn book(client: Arc<MockClient>, page_size: Option<usize>) -> ResourceType {
    let mut builder = ResourceBuilder::new("book")
        .root(ROOT)
        .list(r"^book/$")
        .item(r"^book/(?P<id>\d+)$")
        .client(client)
        .field("id", primary_key())
        .field("title", CharField::new().max_length(200));
    if let Some(page_size) = page_size {
        builder = builder.page_size(page_size);
    }
    builder.build().unwrap()
}

pub fn book_with_author(client: Arc<MockClient>, author: &ResourceType) -> ResourceType {
    ResourceBuilder::new("book")
        .root(ROOT)
        .list(r"^book/$")
        .item(r"^book/(?P<id>\d+)$")
        .client(client)
        .field("id", primary_key())
        .field("title", CharField::new())
        .field("author", ToOneField::new(author))
        .field(
            "translator",
            ToOneField::new(author).options(FieldOptions::new().null(true)),
        )
        .field("reviewers", ToManyField::new(author))
        .build()
        .unwrap()
}

/// The list URL of `page` (1-indexed) for `page_size`.
pub fn page_url(resource: &str, page: usize, page_size: usize) -> String {
    format!("{ROOT}{resource}/?page={page}&page_size={page_size}")
}

/// Book rows for the given ids.
pub fn rows(ids: RangeInclusive<u64>) -> Vec<Value> {
    ids.map(|id| json!({"id": id, "title": format!("Book {id}")}))
        .collect()
}

/// A paginated envelope.
pub fn envelope(count: usize, ids: RangeInclusive<u64>) -> Value {
    json!({
        "count": count,
        "next": null,
        "previous": null,
        "results": rows(ids),
    })
}

pub fn data(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
