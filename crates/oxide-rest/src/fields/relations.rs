//! Relational field types for to-one and to-many relationships.
//!
//! A relation field stores the related resource's key in the owning
//! resource's data. Reading the related resource goes through the target
//! type's manager; see `Resource::related` and `Resource::related_many`.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};

use super::{Field, FieldError, FieldKind, FieldOptions};
use crate::error::{ResourceError, Result};
use crate::options::ResourceType;
use crate::registry::{Registry, WeakRegistry};

/// Turns a stored relation value into lookup parameters for the target's
/// item address.
pub type LookupFn = Arc<dyn Fn(&Value, &ResourceType) -> Map<String, Value> + Send + Sync>;

/// The default lookup: `{pk_name: key}`, where the key is taken from an
/// object's primary key or is the raw value itself.
pub fn default_lookup(value: &Value, target: &ResourceType) -> Map<String, Value> {
    let pk = target.pk_name().unwrap_or("pk");
    let key = match value {
        Value::Object(obj) => obj.get(pk).cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };
    let mut params = Map::new();
    params.insert(pk.to_string(), key);
    params
}

/// The resource type a relation points to.
#[derive(Clone)]
pub enum RelatedTarget {
    /// A type known when the field is declared.
    Type(ResourceType),
    /// A type resolved through a registry on first use, as `"app.resource"`
    /// or a bare resource name.
    Named(NamedTarget),
}

/// A relation target looked up by name.
///
/// Only a weak handle to the registry is kept; resolving after the registry
/// was dropped is a configuration error.
#[derive(Clone)]
pub struct NamedTarget {
    registry: WeakRegistry,
    name: String,
    resolved: OnceLock<ResourceType>,
}

impl NamedTarget {
    /// Returns the name the target is looked up by.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self) -> Result<ResourceType> {
        if let Some(ty) = self.resolved.get() {
            return Ok(ty.clone());
        }
        let registry = self.registry.upgrade().ok_or_else(|| {
            ResourceError::Configuration(format!(
                "the registry resolving {} was dropped",
                self.name
            ))
        })?;
        let ty = registry.lookup(&self.name)?;
        Ok(self.resolved.get_or_init(|| ty).clone())
    }
}

impl RelatedTarget {
    /// Creates a target resolved lazily by name.
    pub fn named(registry: &Registry, name: impl Into<String>) -> Self {
        Self::Named(NamedTarget {
            registry: registry.downgrade(),
            name: name.into(),
            resolved: OnceLock::new(),
        })
    }

    /// Returns the target type, resolving it on first use.
    pub fn resolve(&self) -> Result<ResourceType> {
        match self {
            Self::Type(ty) => Ok(ty.clone()),
            Self::Named(named) => named.resolve(),
        }
    }
}

impl From<ResourceType> for RelatedTarget {
    fn from(ty: ResourceType) -> Self {
        Self::Type(ty)
    }
}

impl From<&ResourceType> for RelatedTarget {
    fn from(ty: &ResourceType) -> Self {
        Self::Type(ty.clone())
    }
}

impl fmt::Debug for RelatedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(ty) => f.debug_tuple("Type").field(&ty.name()).finish(),
            Self::Named(named) => f.debug_tuple("Named").field(&named.name).finish(),
        }
    }
}

/// The relation shared by to-one and to-many fields.
#[derive(Clone)]
pub struct Relation {
    target: RelatedTarget,
    lookup: Option<LookupFn>,
    through: Option<String>,
}

impl Relation {
    fn new(target: RelatedTarget) -> Self {
        Self {
            target,
            lookup: None,
            through: None,
        }
    }

    /// Returns the related resource type.
    pub fn target(&self) -> Result<ResourceType> {
        self.target.resolve()
    }

    /// Name of the intermediate resource, for to-many relations managed
    /// through another endpoint.
    pub fn through(&self) -> Option<&str> {
        self.through.as_deref()
    }

    /// Lookup parameters for one stored value.
    pub fn lookup_params(&self, value: &Value) -> Result<Map<String, Value>> {
        let target = self.target()?;
        Ok(match &self.lookup {
            Some(lookup) => lookup(value, &target),
            None => default_lookup(value, &target),
        })
    }

    /// Reduces an object carrying the target's primary key to that key.
    pub(crate) fn key_of(&self, value: Value) -> Value {
        let Value::Object(obj) = &value else {
            return value;
        };
        let pk = self
            .target()
            .ok()
            .and_then(|ty| ty.pk_name().map(str::to_string));
        match pk.and_then(|pk| obj.get(&pk).cloned()) {
            Some(key) => key,
            None => value,
        }
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("target", &self.target)
            .field("custom_lookup", &self.lookup.is_some())
            .field("through", &self.through)
            .finish()
    }
}

/// A field holding the key of a single related resource.
///
/// # Example
///
/// ```ignore
/// let book = ResourceBuilder::new("book")
///     .field("author", ToOneField::new(&author))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct ToOneField {
    relation: Relation,
    /// Field options.
    pub options: FieldOptions,
}

impl ToOneField {
    /// Creates a new ToOneField pointing at `target`.
    pub fn new(target: impl Into<RelatedTarget>) -> Self {
        Self {
            relation: Relation::new(target.into()),
            options: FieldOptions::new(),
        }
    }

    /// Replaces the default lookup.
    #[must_use]
    pub fn lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&Value, &ResourceType) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.relation.lookup = Some(Arc::new(lookup));
        self
    }

    /// Sets field options.
    #[must_use]
    pub fn options(mut self, options: FieldOptions) -> Self {
        self.options.replace(options);
        self
    }
}

impl Field for ToOneField {
    fn kind(&self) -> FieldKind {
        FieldKind::ToOne
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn clean(&self, value: Value) -> std::result::Result<Value, FieldError> {
        Ok(self.relation.key_of(value))
    }

    fn relation(&self) -> Option<&Relation> {
        Some(&self.relation)
    }
}

/// A field holding the keys of several related resources.
#[derive(Debug, Clone)]
pub struct ToManyField {
    relation: Relation,
    /// Field options.
    pub options: FieldOptions,
}

impl ToManyField {
    /// Creates a new ToManyField pointing at `target`.
    pub fn new(target: impl Into<RelatedTarget>) -> Self {
        Self {
            relation: Relation::new(target.into()),
            options: FieldOptions::new(),
        }
    }

    /// Replaces the default lookup.
    #[must_use]
    pub fn lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&Value, &ResourceType) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.relation.lookup = Some(Arc::new(lookup));
        self
    }

    /// Marks the relation as managed through an intermediate resource. Such
    /// fields are left out of write payloads.
    #[must_use]
    pub fn through(mut self, resource: impl Into<String>) -> Self {
        self.relation.through = Some(resource.into());
        self
    }

    /// Sets field options.
    #[must_use]
    pub fn options(mut self, options: FieldOptions) -> Self {
        self.options.replace(options);
        self
    }
}

impl Field for ToManyField {
    fn kind(&self) -> FieldKind {
        FieldKind::ToMany
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn clean(&self, value: Value) -> std::result::Result<Value, FieldError> {
        Ok(match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.relation.key_of(item))
                    .collect(),
            ),
            other => other,
        })
    }

    fn relation(&self) -> Option<&Relation> {
        Some(&self.relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::IntegerField;
    use crate::options::ResourceBuilder;
    use oxide_rest_client::MockClient;
    use serde_json::json;

    fn author() -> ResourceType {
        ResourceBuilder::new("author")
            .item(r"^author/(?P<id>\d+)$")
            .client(Arc::new(MockClient::new()))
            .field(
                "id",
                IntegerField::new().options(FieldOptions::new().primary_key(true)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_lookup() {
        let author = author();
        assert_eq!(default_lookup(&json!(3), &author), json!({"id": 3}).as_object().cloned().unwrap());
        assert_eq!(
            default_lookup(&json!({"id": 4, "name": "x"}), &author),
            json!({"id": 4}).as_object().cloned().unwrap()
        );
    }

    #[test]
    fn test_to_one_clean_reduces_objects() {
        let field = ToOneField::new(author());
        assert_eq!(field.clean(json!({"id": 9, "name": "A"})).unwrap(), json!(9));
        assert_eq!(field.clean(json!(9)).unwrap(), json!(9));
        assert_eq!(field.clean(json!({"name": "A"})).unwrap(), json!({"name": "A"}));
    }

    #[test]
    fn test_to_many_clean_maps_elements() {
        let field = ToManyField::new(author());
        assert_eq!(
            field.clean(json!([{"id": 1}, 2, {"id": 3}])).unwrap(),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn test_custom_lookup() {
        let field = ToOneField::new(author()).lookup(|value, _| {
            let mut params = Map::new();
            params.insert("slug".to_string(), value.clone());
            params
        });
        let params = field.relation().unwrap().lookup_params(&json!("ada")).unwrap();
        assert_eq!(params["slug"], json!("ada"));
    }

    #[test]
    fn test_named_target_resolves_once() {
        let registry = Registry::new();
        let field = ToOneField::new(RelatedTarget::named(&registry, "people.author"));
        assert!(field.relation().unwrap().target().is_err());

        let author = ResourceBuilder::new("author")
            .app_label("people")
            .client(Arc::new(MockClient::new()))
            .register_in(&registry)
            .build()
            .unwrap();
        let resolved = field.relation().unwrap().target().unwrap();
        assert_eq!(resolved, author);
    }

    #[test]
    fn test_registered_type_does_not_keep_its_registry_alive() {
        let registry = Registry::new();
        let handle = registry.downgrade();
        let book = ResourceBuilder::new("book")
            .app_label("library")
            .client(Arc::new(MockClient::new()))
            .field("author", ToOneField::new(RelatedTarget::named(&registry, "library.author")))
            .register_in(&registry)
            .build()
            .unwrap();
        assert!(handle.upgrade().is_some());

        drop(registry);
        assert!(handle.upgrade().is_none());
        let err = book.field("author").unwrap().relation().unwrap().target().unwrap_err();
        assert!(matches!(err, ResourceError::Configuration(msg) if msg.contains("dropped")));
    }
}
