//! Creating, updating and deleting resources.

mod common;

use std::sync::Arc;

use common::{book, data, ROOT};
use oxide_rest::fields::{CharField, FieldOptions, IntegerField};
use oxide_rest::{ResourceBuilder, ResourceError};
use oxide_rest_client::{Method, MockClient};
use serde_json::{json, Value};

#[test]
fn test_manager_create() {
    let client = Arc::new(MockClient::new().on(
        Method::Post,
        format!("{ROOT}book/"),
        201,
        json!({"id": 7, "title": "X"}),
    ));
    let ty = book(client.clone(), None);

    let created = ty.objects().create(data(json!({"title": "X"}))).unwrap();
    assert_eq!(created.absolute_url(), Some("http://localhost/api/book/7"));
    assert_eq!(created.get("title").unwrap(), json!("X"));
    assert_eq!(created.pk(), Some(&json!(7)));
    assert!(!created.is_adding());

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, Some(json!({"title": "X"})));
    assert_eq!(requests[0].get_header("content-type"), Some("application/json"));
}

#[test]
fn test_save_posts_then_puts() {
    let client = Arc::new(
        MockClient::new()
            .on(
                Method::Post,
                format!("{ROOT}book/"),
                201,
                json!({"id": 3, "title": "Dune"}),
            )
            .on(
                Method::Put,
                format!("{ROOT}book/3"),
                200,
                json!({"id": 3, "title": "Dune Messiah", "updated": true}),
            ),
    );
    let ty = book(client.clone(), None);
    let mut instance = ty.new_instance(data(json!({"title": "Dune"})));
    assert!(instance.is_adding());

    assert!(instance.save().unwrap());
    assert_eq!(instance.absolute_url(), Some("http://localhost/api/book/3"));

    instance.set("title", "Dune Messiah").unwrap();
    assert!(!instance.save().unwrap());
    assert_eq!(instance.data()["updated"], json!(true));

    assert_eq!(client.count(Method::Post, &format!("{ROOT}book/")), 1);
    assert_eq!(client.count(Method::Put, &format!("{ROOT}book/3")), 1);
    let put = &client.requests()[1];
    assert_eq!(put.body, Some(json!({"id": 3, "title": "Dune Messiah"})));
}

#[test]
fn test_save_without_body_keeps_local_data() {
    let client = Arc::new(
        MockClient::new()
            .get_ok(format!("{ROOT}book/3"), json!({"id": 3, "title": "Dune"}))
            .on(Method::Put, format!("{ROOT}book/3"), 204, Value::Null),
    );
    let ty = book(client.clone(), None);
    let mut fetched = ty.objects().get([("pk", 3)]).unwrap();
    assert_eq!(fetched.absolute_url(), Some("http://localhost/api/book/3"));

    fetched.set("title", "Children of Dune").unwrap();
    assert!(!fetched.save().unwrap());
    assert_eq!(fetched.get("title").unwrap(), json!("Children of Dune"));
    assert_eq!(client.count(Method::Put, &format!("{ROOT}book/3")), 1);
}

#[test]
fn test_validation_error_carries_body() {
    let client = Arc::new(MockClient::new().on(
        Method::Post,
        format!("{ROOT}book/"),
        400,
        json!({"title": ["This field is required."]}),
    ));
    let ty = book(client, None);
    let mut instance = ty.new_instance(data(json!({})));

    let err = instance.save().unwrap_err();
    match &err {
        ResourceError::Validation {
            operation,
            uri,
            status,
            body,
        } => {
            assert_eq!(*operation, "save");
            assert_eq!(uri, "http://localhost/api/book/");
            assert_eq!(*status, 400);
            assert_eq!(body["title"][0], json!("This field is required."));
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert!(instance.absolute_url().is_none());
}

#[test]
fn test_server_error_on_save() {
    let client = Arc::new(MockClient::new().on(
        Method::Post,
        format!("{ROOT}book/"),
        503,
        json!("unavailable"),
    ));
    let ty = book(client, None);
    let mut instance = ty.new_instance(data(json!({"title": "Dune"})));
    let err = instance.save().unwrap_err();
    assert!(matches!(err, ResourceError::Server { status: 503, .. }));
}

#[test]
fn test_delete() {
    let client = Arc::new(
        MockClient::new()
            .get_ok(format!("{ROOT}book/3"), json!({"id": 3, "title": "Dune"}))
            .on(Method::Delete, format!("{ROOT}book/3"), 204, Value::Null)
            .get_ok(format!("{ROOT}book/4"), json!({"id": 4, "title": "Emma"}))
            .on(
                Method::Delete,
                format!("{ROOT}book/4"),
                200,
                json!({"deleted": 4}),
            ),
    );
    let ty = book(client.clone(), None);

    let dune = ty.objects().get([("pk", 3)]).unwrap();
    assert_eq!(dune.delete().unwrap(), None);

    let emma = ty.objects().get_by_uri("book/4").unwrap();
    assert_eq!(emma.delete().unwrap(), Some(json!({"deleted": 4})));
    assert_eq!(client.count(Method::Delete, &format!("{ROOT}book/3")), 1);
}

#[test]
fn test_delete_validation_error() {
    let client = Arc::new(
        MockClient::new()
            .get_ok(format!("{ROOT}book/3"), json!({"id": 3}))
            .on(
                Method::Delete,
                format!("{ROOT}book/3"),
                400,
                json!({"detail": "book is on loan"}),
            ),
    );
    let ty = book(client, None);
    let dune = ty.objects().get([("id", 3)]).unwrap();
    let err = dune.delete().unwrap_err();
    assert!(matches!(err, ResourceError::Validation { operation: "delete", .. }));
    assert_eq!(err.body(), Some(&json!({"detail": "book is on loan"})));
}

#[test]
fn test_nested_list_address_is_filled_from_data() {
    let client = Arc::new(MockClient::new().on(
        Method::Post,
        format!("{ROOT}author/5/book/"),
        201,
        json!({"id": 11, "author_id": 5, "title": "Emma"}),
    ));
    let ty = ResourceBuilder::new("book")
        .root(ROOT)
        .list(r"^author/(?P<author_id>\d+)/book/$")
        .item(r"^book/(?P<id>\d+)$")
        .client(client.clone())
        .field("id", common::primary_key())
        .field("author_id", IntegerField::new())
        .field("title", CharField::new())
        .build()
        .unwrap();

    let created = ty
        .objects()
        .create(data(json!({"author_id": 5, "title": "Emma"})))
        .unwrap();
    assert_eq!(created.absolute_url(), Some("http://localhost/api/book/11"));
    assert_eq!(client.request_count(), 1);
}

#[test]
fn test_non_editable_fields_reject_assignment() {
    let client = Arc::new(MockClient::new());
    let ty = ResourceBuilder::new("book")
        .client(client)
        .field(
            "created",
            CharField::new().options(FieldOptions::new().editable(false)),
        )
        .build()
        .unwrap();
    let mut instance = ty.new_instance(data(json!({"created": "2024-01-01"})));
    assert!(matches!(
        instance.set("created", "2025-01-01"),
        Err(ResourceError::NotEditable { .. })
    ));
    assert_eq!(instance.get("created").unwrap(), json!("2024-01-01"));
}
