//! Resource instances.
//!
//! A [`Resource`] holds one object's data mapping and, once persisted, its
//! absolute URL. Field reads and writes go through the type's declared
//! fields. Related resources are fetched lazily and cached per instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::unsync::OnceCell;
use oxide_rest_client::Client;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ResourceError, Result};
use crate::fields::{is_truthy, Field, FieldError, FieldKind, Relation};
use crate::options::ResourceType;
use crate::pattern::{value_to_param, Params, Query};
use crate::queryset::check_status;

/// Statuses accepted for writes.
const WRITE_STATUSES: [u16; 3] = [200, 201, 204];

#[derive(Debug, Clone)]
enum RelationCell {
    One(OnceCell<Option<Resource>>),
    Many(OnceCell<Vec<LazyResource>>),
}

impl RelationCell {
    fn for_kind(kind: FieldKind) -> Option<Self> {
        match kind {
            FieldKind::ToOne => Some(Self::One(OnceCell::new())),
            FieldKind::ToMany => Some(Self::Many(OnceCell::new())),
            _ => None,
        }
    }
}

/// A single object of a resource type.
#[derive(Debug, Clone)]
pub struct Resource {
    resource: ResourceType,
    client: Arc<dyn Client>,
    absolute_url: Option<String>,
    data: Map<String, Value>,
    relations: HashMap<String, RelationCell>,
}

impl Resource {
    pub(crate) fn new(
        resource: ResourceType,
        data: Map<String, Value>,
        absolute_url: Option<String>,
        client: Arc<dyn Client>,
    ) -> Self {
        let relations = empty_relation_cells(&resource);
        Self {
            resource,
            client,
            absolute_url,
            data,
            relations,
        }
    }

    /// Returns the instance's resource type.
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource
    }

    /// Returns the client this instance saves and deletes through.
    pub fn client(&self) -> &Arc<dyn Client> {
        &self.client
    }

    /// Returns the absolute URL, once known.
    pub fn absolute_url(&self) -> Option<&str> {
        self.absolute_url.as_deref()
    }

    /// Returns the raw data mapping.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Consumes the instance, returning its data mapping.
    pub fn into_data(self) -> Map<String, Value> {
        self.data
    }

    /// Returns the primary key value, if the type has one and it is set.
    pub fn pk(&self) -> Option<&Value> {
        self.resource
            .pk_name()
            .and_then(|pk| self.data.get(pk))
            .filter(|value| !value.is_null())
    }

    /// Returns true while the instance has neither an absolute URL nor a
    /// primary key.
    pub fn is_adding(&self) -> bool {
        self.absolute_url.is_none() && self.pk().is_none()
    }

    /// Reads a field, falling back to its default.
    pub fn get(&self, name: &str) -> Result<Value> {
        Ok(self.declared(name)?.get(&self.data, name))
    }

    /// Reads a field and deserializes it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.get(name)?;
        serde_json::from_value(value.clone()).map_err(|_| ResourceError::Field {
            field: name.to_string(),
            source: FieldError::TypeConversion {
                expected: std::any::type_name::<T>(),
                value,
            },
        })
    }

    /// Cleans and assigns a field. Assigning a relation field drops its
    /// cached related resources.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let ty = self.resource.clone();
        let field = declared_field(&ty, name)?;
        field.set(&mut self.data, name, value.into())?;
        self.reset_relation(name, field.kind());
        Ok(())
    }

    /// Assigns a to-one relation from an already loaded resource, storing its
    /// primary key and caching it.
    pub fn set_related(&mut self, name: &str, related: &Resource) -> Result<()> {
        let ty = self.resource.clone();
        let field = declared_field(&ty, name)?;
        if field.kind() != FieldKind::ToOne {
            return Err(not_a_relation(&ty, name, "to-one"));
        }
        let key = related.pk().cloned().unwrap_or(Value::Null);
        field.set(&mut self.data, name, key)?;
        let cell = OnceCell::new();
        let _ = cell.set(Some(related.clone()));
        self.relations.insert(name.to_string(), RelationCell::One(cell));
        Ok(())
    }

    /// Returns the related resource of a to-one field, fetching it on first
    /// access.
    ///
    /// Returns `None` without any request when the lookup parameters are all
    /// empty and the field allows null or blank values.
    pub fn related(&self, name: &str) -> Result<Option<&Resource>> {
        let field = self.declared(name)?;
        let (Some(relation), Some(RelationCell::One(cell))) =
            (field.relation(), self.relations.get(name))
        else {
            return Err(not_a_relation(&self.resource, name, "to-one"));
        };
        let related = cell.get_or_try_init(|| self.fetch_related(name, field, relation))?;
        Ok(related.as_ref())
    }

    /// Returns one lazy handle per element of a to-many field.
    pub fn related_many(&self, name: &str) -> Result<&[LazyResource]> {
        let field = self.declared(name)?;
        let (Some(relation), Some(RelationCell::Many(cell))) =
            (field.relation(), self.relations.get(name))
        else {
            return Err(not_a_relation(&self.resource, name, "to-many"));
        };
        let handles = cell.get_or_try_init(|| {
            let items = match field.get(&self.data, name) {
                Value::Null => Vec::new(),
                Value::Array(items) => items,
                other => {
                    return Err(ResourceError::Field {
                        field: name.to_string(),
                        source: FieldError::TypeConversion {
                            expected: "list",
                            value: other,
                        },
                    })
                }
            };
            let target = relation.target()?;
            items
                .iter()
                .map(|item| {
                    Ok(LazyResource {
                        target: target.clone(),
                        params: relation.lookup_params(item)?,
                        cell: OnceCell::new(),
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(handles)
    }

    /// Builds the body sent by [`Resource::save`].
    ///
    /// Only declared fields are sent. Relations are reduced to primary keys;
    /// to-many relations managed through another resource are left out.
    pub fn request_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        for (key, value) in &self.data {
            let Some(field) = self.resource.field(key) else {
                continue;
            };
            let value = match field.relation() {
                Some(relation) if field.kind() == FieldKind::ToMany => {
                    if relation.through().is_some() {
                        continue;
                    }
                    match value {
                        Value::Array(items) => Value::Array(
                            items.iter().map(|item| relation.key_of(item.clone())).collect(),
                        ),
                        other => other.clone(),
                    }
                }
                Some(relation) if is_truthy(value) => self
                    .cached_pk(key)
                    .unwrap_or_else(|| relation.key_of(value.clone())),
                _ => value.clone(),
            };
            payload.insert(key.clone(), value);
        }
        payload
    }

    /// Creates or updates the object on the server.
    ///
    /// Without an absolute URL the payload is POSTed to the list address,
    /// otherwise it is PUT to the absolute URL. An object in the response
    /// replaces the local data. Returns whether the object was created.
    pub fn save(&mut self) -> Result<bool> {
        let payload = Value::Object(self.request_payload());
        let (created, response) = match &self.absolute_url {
            Some(url) => (false, self.client.put(url, payload)?),
            None => {
                let url = self.list_url()?;
                (true, self.client.post(&url, payload)?)
            }
        };
        tracing::debug!(
            resource = self.resource.name(),
            created,
            status = response.status_code,
            "saved resource"
        );
        check_status("save", &response, &WRITE_STATUSES)?;

        if let Value::Object(data) = response.content {
            self.data = data;
            self.relations = empty_relation_cells(&self.resource);
            if self.absolute_url.is_none() {
                self.absolute_url = match self.pk() {
                    Some(pk) => self.resource.item_url(pk)?,
                    None => None,
                };
            }
        }
        Ok(created)
    }

    /// Deletes the object on the server, returning the response body if it
    /// has one.
    pub fn delete(&self) -> Result<Option<Value>> {
        let url = self
            .absolute_url
            .as_deref()
            .ok_or_else(|| ResourceError::NotPersisted {
                resource: self.resource.name().to_string(),
            })?;
        let response = self.client.delete(url)?;
        check_status("delete", &response, &WRITE_STATUSES)?;
        Ok(response.has_content().then_some(response.content))
    }

    fn declared(&self, name: &str) -> Result<&dyn Field> {
        declared_field(&self.resource, name)
    }

    fn fetch_related(
        &self,
        name: &str,
        field: &dyn Field,
        relation: &Relation,
    ) -> Result<Option<Resource>> {
        let raw = field.get(&self.data, name);
        let params = relation.lookup_params(&raw)?;
        if field.options().allows_empty() && !params.values().any(is_truthy) {
            return Ok(None);
        }
        let target = relation.target()?;
        tracing::debug!(
            resource = self.resource.name(),
            field = name,
            target = target.name(),
            "fetching related resource"
        );
        target.objects().get(params).map(Some)
    }

    fn cached_pk(&self, name: &str) -> Option<Value> {
        match self.relations.get(name)? {
            RelationCell::One(cell) => cell.get()?.as_ref()?.pk().cloned(),
            RelationCell::Many(_) => None,
        }
    }

    fn reset_relation(&mut self, name: &str, kind: FieldKind) {
        if let Some(cell) = RelationCell::for_kind(kind) {
            self.relations.insert(name.to_string(), cell);
        }
    }

    fn list_url(&self) -> Result<String> {
        let list = self.resource.list_pattern().ok_or_else(|| {
            ResourceError::Configuration(format!("{} has no list address", self.resource.name()))
        })?;
        let params: Params = list
            .param_names()
            .iter()
            .filter_map(|name| {
                self.data
                    .get(name)
                    .map(|value| (name.clone(), value_to_param(value)))
            })
            .collect();
        Ok(list.get_absolute_url(self.resource.root(), &Query::new(), &params)?)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}: {}>",
            self.resource.name(),
            self.absolute_url.as_deref().unwrap_or("unsaved")
        )
    }
}

/// A related resource fetched on its first [`LazyResource::get`].
#[derive(Debug, Clone)]
pub struct LazyResource {
    target: ResourceType,
    params: Map<String, Value>,
    cell: OnceCell<Resource>,
}

impl LazyResource {
    /// Returns the lookup parameters used to fetch the resource.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Returns the related resource type.
    pub fn resource_type(&self) -> &ResourceType {
        &self.target
    }

    /// Returns true once the resource has been fetched.
    pub fn is_fetched(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Fetches the resource on first call and returns the cached instance.
    pub fn get(&self) -> Result<&Resource> {
        self.cell
            .get_or_try_init(|| self.target.objects().get(self.params.clone()))
    }
}

fn empty_relation_cells(resource: &ResourceType) -> HashMap<String, RelationCell> {
    resource
        .fields()
        .filter_map(|(name, field)| {
            RelationCell::for_kind(field.kind()).map(|cell| (name.to_string(), cell))
        })
        .collect()
}

fn declared_field<'a>(ty: &'a ResourceType, name: &str) -> Result<&'a dyn Field> {
    ty.field(name).ok_or_else(|| ResourceError::UnknownField {
        resource: ty.name().to_string(),
        field: name.to_string(),
    })
}

fn not_a_relation(ty: &ResourceType, name: &str, kind: &str) -> ResourceError {
    ResourceError::Configuration(format!("{}.{name} is not a {kind} relation", ty.name()))
}
