//! Declaring resource types: fields, inheritance and registration.

mod common;

use std::sync::Arc;

use common::{data, primary_key, ROOT};
use oxide_rest::fields::{
    BooleanField, CharField, DateTimeField, FieldKind, FieldOptions, IntegerField, TextField,
};
use oxide_rest::{Registry, ResourceBuilder, ResourceError};
use oxide_rest_client::MockClient;
use serde_json::json;

fn client() -> Arc<MockClient> {
    Arc::new(MockClient::new())
}

#[test]
fn test_fields_keep_declaration_order() {
    let ty = ResourceBuilder::new("article")
        .client(client())
        .field("id", primary_key())
        .field("title", CharField::new().max_length(80))
        .field("body", TextField::new())
        .field("published", BooleanField::new())
        .build()
        .unwrap();

    assert_eq!(ty.field_names(), ["id", "title", "body", "published"]);
    assert_eq!(ty.pk_name(), Some("id"));
    assert_eq!(ty.field("published").map(|f| f.kind()), Some(FieldKind::Boolean));
    assert_eq!(ty.verbose_name(), "article");
    assert_eq!(ty.verbose_name_plural(), "articles");
}

#[test]
fn test_multiple_primary_keys_are_rejected() {
    let err = ResourceBuilder::new("article")
        .client(client())
        .field("id", primary_key())
        .field("uuid", CharField::new().options(FieldOptions::new().primary_key(true)))
        .build()
        .unwrap_err();
    assert!(matches!(err, ResourceError::Configuration(msg) if msg.contains("multiple primary keys")));
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let err = ResourceBuilder::new("article")
        .client(client())
        .list(r"^article/(?P<id>\d+$")
        .build()
        .unwrap_err();
    assert!(matches!(err, ResourceError::Addressing(_)));
}

#[test]
fn test_inheritance_adds_and_shadows_fields() {
    let base = ResourceBuilder::new("entry")
        .root(ROOT)
        .list(r"^entry/$")
        .item(r"^entry/(?P<id>\d+)$")
        .page_size(20)
        .client(client())
        .field("id", primary_key())
        .field("title", CharField::new().max_length(10))
        .field("created", DateTimeField::new())
        .build()
        .unwrap();

    let post = ResourceBuilder::new("post")
        .extend(&base)
        .item(r"^post/(?P<id>\d+)$")
        .field("title", CharField::new().max_length(200))
        .field("views", IntegerField::new())
        .remove_field("created")
        .build()
        .unwrap();

    assert_eq!(post.name(), "post");
    assert_eq!(post.field_names(), ["id", "title", "views"]);
    assert_eq!(post.pk_name(), Some("id"));
    assert_eq!(post.page_size(), Some(20));
    assert_eq!(post.root(), Some(ROOT));
    assert_eq!(post.list_pattern().map(|p| p.pattern()), Some(r"^entry/$"));
    assert_eq!(post.item_pattern().map(|p| p.pattern()), Some(r"^post/(?P<id>\d+)$"));

    // The shadowing field's options apply.
    let mut instance = post.new_instance(data(json!({})));
    instance.set("title", "x".repeat(50)).unwrap();
    assert_eq!(instance.get("title").unwrap(), json!("x".repeat(50)));

    // The parent is untouched.
    assert_eq!(base.field_names(), ["id", "title", "created"]);
    let mut entry = base.new_instance(data(json!({})));
    entry.set("title", "x".repeat(50)).unwrap();
    assert_eq!(entry.get("title").unwrap(), json!("x".repeat(10)));
}

#[test]
fn test_inherited_primary_key_conflicts_with_a_new_one() {
    let base = ResourceBuilder::new("entry")
        .client(client())
        .field("id", primary_key())
        .build()
        .unwrap();
    let err = ResourceBuilder::new("post")
        .extend(&base)
        .field("slug", CharField::new().options(FieldOptions::new().primary_key(true)))
        .build()
        .unwrap_err();
    assert!(matches!(err, ResourceError::Configuration(_)));

    let renamed = ResourceBuilder::new("post")
        .extend(&base)
        .remove_field("id")
        .field("slug", CharField::new().options(FieldOptions::new().primary_key(true)))
        .build()
        .unwrap();
    assert_eq!(renamed.pk_name(), Some("slug"));
}

#[test]
fn test_field_defaults_and_cleaning() {
    let ty = ResourceBuilder::new("task")
        .client(client())
        .field("done", BooleanField::new().options(FieldOptions::new().default(false)))
        .field("priority", IntegerField::new())
        .field("due", DateTimeField::new())
        .build()
        .unwrap();
    let mut task = ty.new_instance(data(json!({})));

    assert_eq!(task.get("done").unwrap(), json!(false));
    assert_eq!(task.get("priority").unwrap(), json!(null));

    task.set("done", "yes").unwrap();
    task.set("priority", " 3 ").unwrap();
    task.set("due", "2024-03-01T10:00:00Z").unwrap();
    assert_eq!(task.get("done").unwrap(), json!(true));
    assert_eq!(task.get_as::<i64>("priority").unwrap(), 3);
    assert_eq!(task.get("due").unwrap(), json!("2024-03-01T10:00:00+00:00"));

    let err = task.set("priority", "high").unwrap_err();
    assert!(matches!(err, ResourceError::Field { ref field, .. } if field == "priority"));
    assert_eq!(task.get_as::<i64>("priority").unwrap(), 3);
}

#[test]
fn test_registry_lookup_and_conflicts() {
    let registry = Registry::new();
    let users = ResourceBuilder::new("user")
        .app_label("accounts")
        .client(client())
        .register_in(&registry)
        .build()
        .unwrap();
    ResourceBuilder::new("group")
        .app_label("accounts")
        .client(client())
        .register_in(&registry)
        .build()
        .unwrap();

    assert_eq!(registry.get("accounts", "user"), Some(users.clone()));
    assert_eq!(registry.lookup("accounts.user").unwrap(), users);
    assert_eq!(registry.lookup("user").unwrap(), users);
    assert_eq!(registry.app_labels(), ["accounts"]);
    assert_eq!(users.to_string(), "accounts.user");

    // Registering the same type again is harmless.
    registry.register(&users).unwrap();
    assert_eq!(registry.resources("accounts").len(), 2);

    let err = ResourceBuilder::new("user")
        .app_label("accounts")
        .client(client())
        .register_in(&registry)
        .build()
        .unwrap_err();
    assert!(matches!(err, ResourceError::Configuration(msg) if msg.contains("Conflicting 'user'")));
}

#[test]
fn test_registering_requires_an_app_label() {
    let registry = Registry::new();
    let err = ResourceBuilder::new("orphan")
        .client(client())
        .register_in(&registry)
        .build()
        .unwrap_err();
    assert!(matches!(err, ResourceError::Configuration(_)));
    assert!(registry.app_labels().is_empty());
}

#[test]
fn test_custom_page_parameters() {
    let client = Arc::new(MockClient::new().get_ok(
        format!("{ROOT}event/?limit=5&p=1"),
        json!({"count": 0, "results": []}),
    ));
    let ty = ResourceBuilder::new("event")
        .root(ROOT)
        .list(r"^event/$")
        .page_size(5)
        .page_param("p")
        .page_size_param("limit")
        .client(client.clone())
        .build()
        .unwrap();
    assert_eq!(ty.objects().all().count().unwrap(), 0);
    assert_eq!(client.request_count(), 1);
}
