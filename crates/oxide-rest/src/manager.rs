//! Manager for resource access.
//!
//! The Manager is the entry point for queries on a resource type, similar to
//! Django's Manager class. It is only reachable from the type, through
//! [`ResourceType::objects`], never from an instance.

use std::sync::Arc;

use oxide_rest_client::Client;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::options::ResourceType;
use crate::queryset::QuerySet;
use crate::resource::Resource;

/// A Manager provides query and creation methods for a resource type.
///
/// Managers are lightweight and can be created freely. A custom manager
/// wraps the default one and is obtained with [`ResourceType::manager`]:
///
/// ```
/// use std::sync::Arc;
/// use oxide_rest::{Manager, QuerySet, ResourceBuilder};
/// use oxide_rest_client::MockClient;
///
/// struct Published(Manager);
///
/// impl From<Manager> for Published {
///     fn from(manager: Manager) -> Self {
///         Self(manager)
///     }
/// }
///
/// impl Published {
///     fn all(&self) -> QuerySet {
///         self.0.filter([("status", "published")])
///     }
/// }
///
/// let post = ResourceBuilder::new("post")
///     .list("^post/$")
///     .client(Arc::new(MockClient::new()))
///     .build()
///     .unwrap();
/// let published = post.manager::<Published>().all();
/// assert_eq!(published.query().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Manager {
    resource: ResourceType,
}

impl Manager {
    pub(crate) fn new(resource: ResourceType) -> Self {
        Self { resource }
    }

    /// Returns the managed resource type.
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource
    }

    /// Returns a fresh QuerySet using the type's client.
    pub fn get_queryset(&self) -> QuerySet {
        QuerySet::new(self.resource.clone(), Arc::clone(self.resource.client()))
    }

    /// Returns a QuerySet for all objects.
    pub fn all(&self) -> QuerySet {
        self.get_queryset()
    }

    /// Returns a QuerySet filtered by the given parameters.
    pub fn filter<I, K, V>(&self, filters: I) -> QuerySet
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.get_queryset().filter(filters)
    }

    /// Retrieves a single object by lookup parameters.
    pub fn get<I, K, V>(&self, params: I) -> Result<Resource>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.get_queryset().get(params)
    }

    /// Retrieves a single object by URI.
    pub fn get_by_uri(&self, uri: &str) -> Result<Resource> {
        self.get_queryset().get_by_uri(uri)
    }

    /// Returns a QuerySet sending its requests through `client`.
    pub fn using(&self, client: Arc<dyn Client>) -> QuerySet {
        self.get_queryset().using(client)
    }

    /// Returns an empty QuerySet.
    pub fn none(&self) -> QuerySet {
        self.get_queryset().none()
    }

    /// Creates a new object on the server and returns it.
    pub fn create(&self, data: Map<String, Value>) -> Result<Resource> {
        let mut instance = self.resource.new_instance(data);
        instance.save()?;
        Ok(instance)
    }
}
