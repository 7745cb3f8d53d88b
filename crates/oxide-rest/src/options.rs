//! Resource definitions.
//!
//! A resource type is assembled once with [`ResourceBuilder`] and then shared
//! as a cheap [`ResourceType`] handle. The handle gives access to the type's
//! manager and creates new instances; instances themselves never expose the
//! manager.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use oxide_rest_client::{default_client, Client};
use serde_json::{Map, Value};

use crate::error::{ResourceError, Result};
use crate::fields::Field;
use crate::manager::Manager;
use crate::pattern::{value_to_param, Params, PatternSpec, Query, ResourcePattern};
use crate::registry::Registry;
use crate::resource::Resource;

const DEFAULT_PAGE_PARAM: &str = "page";
const DEFAULT_PAGE_SIZE_PARAM: &str = "page_size";

/// The immutable description of a resource type.
pub struct ResourceOptions {
    resource_name: String,
    app_label: Option<String>,
    verbose_name: String,
    verbose_name_plural: String,
    list: Option<ResourcePattern>,
    item: Option<ResourcePattern>,
    root: Option<String>,
    client: Arc<dyn Client>,
    page_size: Option<usize>,
    page_param: String,
    page_size_param: String,
    fields: Vec<(String, Arc<dyn Field>)>,
    pk_name: Option<String>,
}

impl ResourceOptions {
    /// Returns the resource name.
    pub fn name(&self) -> &str {
        &self.resource_name
    }

    /// Returns the application label, if any.
    pub fn app_label(&self) -> Option<&str> {
        self.app_label.as_deref()
    }

    /// Returns the human-readable name.
    pub fn verbose_name(&self) -> &str {
        &self.verbose_name
    }

    /// Returns the human-readable plural name.
    pub fn verbose_name_plural(&self) -> &str {
        &self.verbose_name_plural
    }

    /// Returns the list address pattern.
    pub fn list_pattern(&self) -> Option<&ResourcePattern> {
        self.list.as_ref()
    }

    /// Returns the item address pattern.
    pub fn item_pattern(&self) -> Option<&ResourcePattern> {
        self.item.as_ref()
    }

    /// Returns the root prepended to generated addresses.
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Returns the client used by managers of this type.
    pub fn client(&self) -> &Arc<dyn Client> {
        &self.client
    }

    /// Returns the page size; `None` means the list is not paginated.
    pub fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    /// Returns the query parameter carrying the page number.
    pub fn page_param(&self) -> &str {
        &self.page_param
    }

    /// Returns the query parameter carrying the page size.
    pub fn page_size_param(&self) -> &str {
        &self.page_size_param
    }

    /// Returns the primary key field name.
    pub fn pk_name(&self) -> Option<&str> {
        self.pk_name.as_deref()
    }

    /// Returns the field registered under `name`.
    pub fn field(&self, name: &str) -> Option<&dyn Field> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, field)| field.as_ref())
    }

    /// Iterates the fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &dyn Field)> {
        self.fields
            .iter()
            .map(|(name, field)| (name.as_str(), field.as_ref()))
    }

    /// Returns the field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Builds the absolute item URL for a primary key value.
    ///
    /// Returns `None` when the type has no item pattern or no primary key.
    pub fn item_url(&self, pk: &Value) -> Result<Option<String>> {
        let (Some(item), Some(pk_name)) = (&self.item, &self.pk_name) else {
            return Ok(None);
        };
        let mut params = Params::new();
        params.insert(pk_name.clone(), value_to_param(pk));
        Ok(Some(item.get_absolute_url(
            self.root(),
            &Query::new(),
            &params,
        )?))
    }
}

impl fmt::Debug for ResourceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("resource_name", &self.resource_name)
            .field("app_label", &self.app_label)
            .field("list", &self.list.as_ref().map(ResourcePattern::pattern))
            .field("item", &self.item.as_ref().map(ResourcePattern::pattern))
            .field("root", &self.root)
            .field("page_size", &self.page_size)
            .field("fields", &self.field_names())
            .field("pk_name", &self.pk_name)
            .finish()
    }
}

/// A shared handle to a built resource type.
///
/// Two handles compare equal when they come from the same `build()` call.
#[derive(Clone)]
pub struct ResourceType(Arc<ResourceOptions>);

impl ResourceType {
    /// Returns the type's options.
    pub fn options(&self) -> &ResourceOptions {
        &self.0
    }

    /// Returns the default manager.
    pub fn objects(&self) -> Manager {
        Manager::new(self.clone())
    }

    /// Returns a user-supplied manager wrapping the default one.
    pub fn manager<M: From<Manager>>(&self) -> M {
        M::from(self.objects())
    }

    /// Creates an unsaved instance holding `data` as-is.
    pub fn new_instance(&self, data: Map<String, Value>) -> Resource {
        Resource::new(self.clone(), data, None, Arc::clone(&self.0.client))
    }
}

impl Deref for ResourceType {
    type Target = ResourceOptions;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ResourceType {}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceType").field(&self.0.resource_name).finish()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.app_label {
            Some(app) => write!(f, "{app}.{}", self.0.resource_name),
            None => f.write_str(&self.0.resource_name),
        }
    }
}

/// Builder for resource types.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use oxide_rest::fields::{CharField, FieldOptions, IntegerField};
/// use oxide_rest::ResourceBuilder;
/// use oxide_rest_client::MockClient;
///
/// let book = ResourceBuilder::new("book")
///     .list(r"^book/$")
///     .item(r"^book/(?P<id>\d+)$")
///     .root("http://localhost/api/")
///     .client(Arc::new(MockClient::new()))
///     .field("id", IntegerField::new().options(FieldOptions::new().primary_key(true)))
///     .field("title", CharField::new().max_length(200))
///     .build()
///     .unwrap();
///
/// assert_eq!(book.pk_name(), Some("id"));
/// assert_eq!(book.field_names(), ["id", "title"]);
/// ```
#[must_use]
pub struct ResourceBuilder {
    resource_name: String,
    app_label: Option<String>,
    verbose_name: Option<String>,
    verbose_name_plural: Option<String>,
    list: Option<PatternSpec>,
    item: Option<PatternSpec>,
    root: Option<String>,
    client: Option<Arc<dyn Client>>,
    page_size: Option<usize>,
    page_param: Option<String>,
    page_size_param: Option<String>,
    fields: Vec<(String, Arc<dyn Field>)>,
    removed: Vec<String>,
    parent: Option<ResourceType>,
    registry: Option<Registry>,
}

impl ResourceBuilder {
    /// Starts a definition named `resource_name`.
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            app_label: None,
            verbose_name: None,
            verbose_name_plural: None,
            list: None,
            item: None,
            root: None,
            client: None,
            page_size: None,
            page_param: None,
            page_size_param: None,
            fields: Vec::new(),
            removed: Vec::new(),
            parent: None,
            registry: None,
        }
    }

    pub fn app_label(mut self, app_label: impl Into<String>) -> Self {
        self.app_label = Some(app_label.into());
        self
    }

    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = Some(name.into());
        self
    }

    pub fn verbose_name_plural(mut self, name: impl Into<String>) -> Self {
        self.verbose_name_plural = Some(name.into());
        self
    }

    /// Sets the list address pattern.
    pub fn list(mut self, pattern: impl Into<PatternSpec>) -> Self {
        self.list = Some(pattern.into());
        self
    }

    /// Sets the item address pattern.
    pub fn item(mut self, pattern: impl Into<PatternSpec>) -> Self {
        self.item = Some(pattern.into());
        self
    }

    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn Client>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn page_param(mut self, name: impl Into<String>) -> Self {
        self.page_param = Some(name.into());
        self
    }

    pub fn page_size_param(mut self, name: impl Into<String>) -> Self {
        self.page_size_param = Some(name.into());
        self
    }

    /// Declares a field.
    pub fn field(mut self, name: impl Into<String>, field: impl Field + 'static) -> Self {
        let name = name.into();
        self.removed.retain(|removed| *removed != name);
        self.fields.push((name, Arc::new(field)));
        self
    }

    /// Drops an inherited field.
    pub fn remove_field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.fields.retain(|(n, _)| *n != name);
        self.removed.push(name);
        self
    }

    /// Inherits fields and unset settings from `parent`.
    pub fn extend(mut self, parent: &ResourceType) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Registers the built type in `registry`.
    pub fn register_in(mut self, registry: &Registry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    /// Builds the resource type.
    pub fn build(self) -> Result<ResourceType> {
        let parent = self.parent.as_ref().map(ResourceType::options);

        let mut local = self.fields;
        local.sort_by_key(|(_, field)| field.options().creation_counter());

        let mut fields = parent.map(|p| p.fields.clone()).unwrap_or_default();
        for (name, field) in local {
            match fields.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = field,
                None => fields.push((name, field)),
            }
        }
        fields.retain(|(name, _)| !self.removed.contains(name));

        let mut pk_name = None;
        for (name, field) in &fields {
            if field.options().primary_key {
                if pk_name.is_some() {
                    return Err(ResourceError::Configuration(format!(
                        "multiple primary keys on {}",
                        self.resource_name
                    )));
                }
                pk_name = Some(name.clone());
            }
        }

        let list = match self.list {
            Some(spec) => Some(ResourcePattern::parse(spec)?),
            None => parent.and_then(|p| p.list.clone()),
        };
        let item = match self.item {
            Some(spec) => Some(ResourcePattern::parse(spec)?),
            None => parent.and_then(|p| p.item.clone()),
        };

        let client = self
            .client
            .or_else(|| parent.map(|p| Arc::clone(&p.client)))
            .or_else(default_client)
            .ok_or_else(|| {
                ResourceError::Configuration(format!(
                    "no client configured for {} and no default client set",
                    self.resource_name
                ))
            })?;

        let verbose_name = self
            .verbose_name
            .unwrap_or_else(|| self.resource_name.clone());
        let verbose_name_plural = self
            .verbose_name_plural
            .unwrap_or_else(|| format!("{verbose_name}s"));

        let options = ResourceOptions {
            app_label: self
                .app_label
                .or_else(|| parent.and_then(|p| p.app_label.clone())),
            verbose_name,
            verbose_name_plural,
            list,
            item,
            root: self.root.or_else(|| parent.and_then(|p| p.root.clone())),
            client,
            page_size: self
                .page_size
                .or_else(|| parent.and_then(|p| p.page_size))
                .filter(|size| *size > 0),
            page_param: self
                .page_param
                .or_else(|| parent.map(|p| p.page_param.clone()))
                .unwrap_or_else(|| DEFAULT_PAGE_PARAM.to_string()),
            page_size_param: self
                .page_size_param
                .or_else(|| parent.map(|p| p.page_size_param.clone()))
                .unwrap_or_else(|| DEFAULT_PAGE_SIZE_PARAM.to_string()),
            fields,
            pk_name,
            resource_name: self.resource_name,
        };
        let ty = ResourceType(Arc::new(options));

        if let Some(registry) = &self.registry {
            registry.register(&ty)?;
        }
        Ok(ty)
    }
}

impl fmt::Debug for ResourceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBuilder")
            .field("resource_name", &self.resource_name)
            .field("fields", &self.fields.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
