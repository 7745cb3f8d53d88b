//! Configuration file for the `oxide-rest` binary.
//!
//! ```json
//! {
//!   "client": {"root_uri": "http://localhost:8000/api/", "timeout_secs": 10},
//!   "resource": {
//!     "name": "book",
//!     "list": "^book/$",
//!     "item": "^book/(?P<id>\\d+)/$",
//!     "page_size": 25,
//!     "fields": {"title": "char", "published": "date"}
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use oxide_rest::fields::{
    BooleanField, CharField, DateField, DateTimeField, FieldOptions, IntegerField, TextField,
    UrlField,
};
use oxide_rest::{ResourceBuilder, ResourceType};
use oxide_rest_client::{Client, ClientConfig};
use serde::Deserialize;

/// Field types a configured resource can declare.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Char,
    Text,
    Url,
    Integer,
    Date,
    DateTime,
}

/// The resource the commands operate on.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResourceConfig {
    pub name: String,
    pub list: Option<String>,
    pub item: Option<String>,
    pub primary_key: String,
    pub page_size: Option<usize>,
    /// Overrides the client's root URI for this resource.
    pub root: Option<String>,
    /// Declared fields besides the primary key. Only declared fields are
    /// sent on create and update.
    pub fields: BTreeMap<String, FieldType>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            name: "resource".to_string(),
            list: None,
            item: None,
            primary_key: "id".to_string(),
            page_size: None,
            root: None,
            fields: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    pub client: ClientConfig,
    pub resource: ResourceConfig,
}

impl CliConfig {
    /// Reads the configuration file, or returns the defaults without one.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Applies the `--root` / `OXIDE_REST_ROOT` override.
    #[must_use]
    pub fn with_root(mut self, root: Option<String>) -> Self {
        if let Some(root) = root {
            self.client.root_uri = root;
        }
        self
    }

    /// Builds the configured resource type.
    pub fn resource_type(&self, client: Arc<dyn Client>) -> oxide_rest::Result<ResourceType> {
        let resource = &self.resource;
        let mut builder = ResourceBuilder::new(resource.name.as_str()).client(client);
        if let Some(list) = &resource.list {
            builder = builder.list(list.as_str());
        }
        if let Some(item) = &resource.item {
            builder = builder.item(item.as_str());
        }
        let root = resource.root.as_deref().unwrap_or(&self.client.root_uri);
        if !root.is_empty() {
            builder = builder.root(root);
        }
        if let Some(page_size) = resource.page_size {
            builder = builder.page_size(page_size);
        }

        if !resource.fields.contains_key(&resource.primary_key) {
            builder = declare(builder, &resource.primary_key, FieldType::Integer, true);
        }
        for (name, kind) in &resource.fields {
            builder = declare(builder, name, *kind, *name == resource.primary_key);
        }
        builder.build()
    }
}

fn declare(builder: ResourceBuilder, name: &str, kind: FieldType, primary_key: bool) -> ResourceBuilder {
    // Fields from a file are optional on the wire.
    let options = FieldOptions::new()
        .primary_key(primary_key)
        .required(false)
        .null(true);
    match kind {
        FieldType::Boolean => builder.field(name, BooleanField::new().options(options)),
        FieldType::Char => builder.field(name, CharField::new().options(options)),
        FieldType::Text => builder.field(name, TextField::new().options(options)),
        FieldType::Url => builder.field(name, UrlField::new().options(options)),
        FieldType::Integer => builder.field(name, IntegerField::new().options(options)),
        FieldType::Date => builder.field(name, DateField::new().options(options)),
        FieldType::DateTime => builder.field(name, DateTimeField::new().options(options)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_rest_client::MockClient;

    fn parse(json: &str) -> CliConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.resource.name, "resource");
        assert_eq!(config.resource.primary_key, "id");
        assert_eq!(config.client.mime_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_partial_file() {
        let config = parse(
            r#"{"client": {"root_uri": "http://localhost/api/"},
                "resource": {"name": "book", "list": "^book/$", "fields": {"title": "char", "added": "datetime"}}}"#,
        );
        assert_eq!(config.client.root_uri, "http://localhost/api/");
        assert_eq!(config.client.timeout_secs, Some(30));
        assert_eq!(config.resource.fields["added"], FieldType::DateTime);
        assert_eq!(config.resource.item, None);
    }

    #[test]
    fn test_root_override() {
        let config = parse(r#"{"client": {"root_uri": "http://a/"}}"#)
            .with_root(Some("http://b/".to_string()));
        assert_eq!(config.client.root_uri, "http://b/");
        assert_eq!(config.with_root(None).client.root_uri, "http://b/");
    }

    #[test]
    fn test_resource_type() {
        let config = parse(
            r#"{"client": {"root_uri": "http://localhost/api/"},
                "resource": {"name": "book", "list": "^book/$", "item": "^book/(?P<id>\\d+)$",
                             "page_size": 10, "fields": {"title": "char"}}}"#,
        );
        let ty = config.resource_type(Arc::new(MockClient::new())).unwrap();
        assert_eq!(ty.name(), "book");
        assert_eq!(ty.pk_name(), Some("id"));
        assert_eq!(ty.field_names(), ["id", "title"]);
        assert_eq!(ty.page_size(), Some(10));
        assert_eq!(ty.root(), Some("http://localhost/api/"));
    }

    #[test]
    fn test_declared_primary_key_keeps_its_type() {
        let config = parse(
            r#"{"resource": {"name": "tag", "primary_key": "slug", "fields": {"slug": "char"}}}"#,
        );
        let ty = config.resource_type(Arc::new(MockClient::new())).unwrap();
        assert_eq!(ty.pk_name(), Some("slug"));
        assert_eq!(ty.field_names(), ["slug"]);
        assert_eq!(ty.root(), None);
    }
}
