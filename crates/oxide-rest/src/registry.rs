//! Registry of resource types, keyed by application label and resource name.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use once_cell::sync::Lazy;

use crate::error::{ResourceError, Result};
use crate::options::ResourceType;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

type Apps = BTreeMap<String, Vec<ResourceType>>;

/// A shared registry of resource types.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    apps: Arc<RwLock<Apps>>,
}

/// A non-owning registry handle. Relations resolved by name hold one, since
/// the registry in turn holds the types owning those relations.
#[derive(Debug, Clone, Default)]
pub(crate) struct WeakRegistry {
    apps: Weak<RwLock<Apps>>,
}

impl WeakRegistry {
    pub(crate) fn upgrade(&self) -> Option<Registry> {
        self.apps.upgrade().map(|apps| Registry { apps })
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle that does not keep the registry alive.
    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            apps: Arc::downgrade(&self.apps),
        }
    }

    /// Returns the process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Registers a resource type under its application label.
    ///
    /// Registering the same type twice only logs a warning. A different type
    /// under an already taken name is an error.
    pub fn register(&self, ty: &ResourceType) -> Result<()> {
        let app = ty.app_label().ok_or_else(|| {
            ResourceError::Configuration(format!(
                "resource {} has no app label and cannot be registered",
                ty.name()
            ))
        })?;

        let mut apps = self.apps.write().unwrap_or_else(PoisonError::into_inner);
        let resources = apps.entry(app.to_string()).or_default();
        match resources.iter().find(|existing| existing.name() == ty.name()) {
            Some(existing) if existing == ty => {
                tracing::warn!(app, resource = ty.name(), "resource was already registered");
            }
            Some(_) => {
                return Err(ResourceError::Configuration(format!(
                    "Conflicting '{}' resources in application '{app}'",
                    ty.name()
                )));
            }
            None => {
                tracing::debug!(app, resource = ty.name(), "registered resource");
                resources.push(ty.clone());
            }
        }
        Ok(())
    }

    /// Returns the type registered as `app.name`.
    pub fn get(&self, app: &str, name: &str) -> Option<ResourceType> {
        let apps = self.apps.read().unwrap_or_else(PoisonError::into_inner);
        apps.get(app)?
            .iter()
            .find(|ty| ty.name() == name)
            .cloned()
    }

    /// Resolves `"app.name"`, or a bare name that is unique across
    /// applications.
    pub fn lookup(&self, path: &str) -> Result<ResourceType> {
        if let Some((app, name)) = path.split_once('.') {
            return self.get(app, name).ok_or_else(|| {
                ResourceError::Configuration(format!("no resource registered as {path}"))
            });
        }

        let apps = self.apps.read().unwrap_or_else(PoisonError::into_inner);
        let mut matches = apps.values().flatten().filter(|ty| ty.name() == path);
        match (matches.next(), matches.next()) {
            (Some(ty), None) => Ok(ty.clone()),
            (None, _) => Err(ResourceError::Configuration(format!(
                "no resource registered as {path}"
            ))),
            (Some(_), Some(_)) => Err(ResourceError::Configuration(format!(
                "resource name {path} is ambiguous, qualify it with an app label"
            ))),
        }
    }

    /// Returns the types of one application in registration order.
    pub fn resources(&self, app: &str) -> Vec<ResourceType> {
        let apps = self.apps.read().unwrap_or_else(PoisonError::into_inner);
        apps.get(app).cloned().unwrap_or_default()
    }

    /// Returns the registered application labels.
    pub fn app_labels(&self) -> Vec<String> {
        let apps = self.apps.read().unwrap_or_else(PoisonError::into_inner);
        apps.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ResourceBuilder;
    use oxide_rest_client::MockClient;

    fn build(app: &str, name: &str) -> ResourceType {
        ResourceBuilder::new(name)
            .app_label(app)
            .client(Arc::new(MockClient::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        let book = build("library", "book");
        registry.register(&book).unwrap();

        assert_eq!(registry.get("library", "book"), Some(book.clone()));
        assert_eq!(registry.lookup("library.book").unwrap(), book);
        assert_eq!(registry.lookup("book").unwrap(), book);
        assert!(registry.lookup("library.author").is_err());
        assert_eq!(registry.app_labels(), ["library"]);
    }

    #[test]
    fn test_register_twice_is_a_warning() {
        let registry = Registry::new();
        let book = build("library", "book");
        registry.register(&book).unwrap();
        registry.register(&book).unwrap();
        assert_eq!(registry.resources("library").len(), 1);
    }

    #[test]
    fn test_conflicting_registration() {
        let registry = Registry::new();
        registry.register(&build("library", "book")).unwrap();
        let err = registry.register(&build("library", "book")).unwrap_err();
        assert!(err.to_string().contains("Conflicting"));
    }

    #[test]
    fn test_ambiguous_bare_name() {
        let registry = Registry::new();
        registry.register(&build("library", "item")).unwrap();
        registry.register(&build("shop", "item")).unwrap();
        assert!(registry.lookup("item").is_err());
        assert!(registry.lookup("shop.item").is_ok());
    }

    #[test]
    fn test_missing_app_label() {
        let registry = Registry::new();
        let ty = ResourceBuilder::new("orphan")
            .client(Arc::new(MockClient::new()))
            .build()
            .unwrap();
        assert!(matches!(registry.register(&ty), Err(ResourceError::Configuration(_))));
    }
}
