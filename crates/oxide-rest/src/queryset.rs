//! Lazy, paginated queries over a resource's list address.
//!
//! A `QuerySet` performs no I/O until it is counted, indexed, sliced or
//! iterated. Pages are fetched on demand and cached, so repeated access to
//! the same rows is free:
//!
//! ```text
//! count()        -> page 0, unless a fetched page already announced the total
//! get_index(57)  -> page 57 / page_size
//! slice(5..10)   -> only the pages covering 5..10
//! iter()         -> every missing page, in ascending order
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use oxide_rest_client::{Client, Response};
use serde_json::{Map, Value};

use crate::error::{ResourceError, Result};
use crate::options::ResourceType;
use crate::pattern::{value_to_param, Params, Query, ResourcePattern};
use crate::resource::Resource;

/// Statuses accepted for reads.
pub(crate) const READ_STATUSES: [u16; 2] = [200, 304];

/// A lazy query over a resource's list address.
pub struct QuerySet {
    resource: ResourceType,
    query: Query,
    client: Arc<dyn Client>,
    empty: bool,
    pages_fetched: BTreeMap<usize, Map<String, Value>>,
    result_cache: BTreeMap<usize, Resource>,
}

impl QuerySet {
    pub(crate) fn new(resource: ResourceType, client: Arc<dyn Client>) -> Self {
        Self::with_query(resource, client, Query::new())
    }

    fn with_query(resource: ResourceType, client: Arc<dyn Client>, query: Query) -> Self {
        Self {
            resource,
            query,
            client,
            empty: false,
            pages_fetched: BTreeMap::new(),
            result_cache: BTreeMap::new(),
        }
    }

    /// Returns the queried resource type.
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource
    }

    /// Returns the accumulated filters.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Returns a fresh copy of this query with an empty cache.
    #[must_use]
    pub fn all(&self) -> QuerySet {
        let mut qs = Self::with_query(
            self.resource.clone(),
            Arc::clone(&self.client),
            self.query.clone(),
        );
        qs.empty = self.empty;
        qs
    }

    /// Returns a new query with additional filters. The key `pk` is
    /// rewritten to the primary key name.
    #[must_use]
    pub fn filter<I, K, V>(&self, filters: I) -> QuerySet
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut qs = self.all();
        for (key, value) in filters {
            qs.query.insert(self.lookup_key(key.into()), value.into());
        }
        qs
    }

    /// Returns a copy of this query sending its requests through `client`.
    #[must_use]
    pub fn using(&self, client: Arc<dyn Client>) -> QuerySet {
        let mut qs = self.all();
        qs.client = client;
        qs
    }

    /// Returns a query that matches nothing and never performs I/O.
    #[must_use]
    pub fn none(&self) -> QuerySet {
        let mut qs = self.all();
        qs.empty = true;
        qs
    }

    /// Returns the number of items, fetching the first page if no fetched
    /// page announced it yet.
    pub fn count(&mut self) -> Result<usize> {
        if let Some(count) = self.known_count() {
            return Ok(count);
        }
        self.fetch_page(0)?;
        self.known_count()
            .ok_or_else(|| ResourceError::UnexpectedContent {
                uri: self.list_uri_hint(),
                reason: "paginated response has no count".to_string(),
            })
    }

    /// Returns true when the query matches at least one item.
    pub fn exists(&mut self) -> Result<bool> {
        Ok(self.count()? > 0)
    }

    /// Returns the item at `index`, fetching its page if needed.
    pub fn get_index(&mut self, index: usize) -> Result<&Resource> {
        let count = self.count_via(self.page_for_index(index))?;
        if index >= count {
            return Err(ResourceError::IndexOutOfRange { index, count });
        }
        self.fetch_page(self.page_for_index(index))?;
        self.cached(index)
    }

    /// Returns the items in `range`.
    pub fn slice(&mut self, range: Range<usize>) -> Result<Vec<&Resource>> {
        self.slice_step(range, 1)
    }

    /// Returns every `step`-th item in `range`, fetching only the pages the
    /// range covers.
    pub fn slice_step(&mut self, range: Range<usize>, step: usize) -> Result<Vec<&Resource>> {
        let Range { start, end: stop } = range;
        if step == 0 || start >= stop {
            return Err(ResourceError::InvalidSlice {
                start,
                stop,
                step,
                count: self.known_count().unwrap_or(0),
            });
        }
        let count = self.count_via(self.page_for_index(start))?;
        if stop > count {
            return Err(ResourceError::InvalidSlice {
                start,
                stop,
                step,
                count,
            });
        }

        for page in self.page_for_index(start)..=self.page_for_index(stop - 1) {
            self.fetch_page(page)?;
        }

        for index in (start..stop).step_by(step) {
            self.cached(index)?;
        }
        Ok((start..stop)
            .step_by(step)
            .filter_map(|index| self.result_cache.get(&index))
            .collect())
    }

    /// Fetches every page, then iterates the items in index order.
    pub fn iter(&mut self) -> Result<impl Iterator<Item = &Resource>> {
        self.fetch_all()?;
        Ok(self.result_cache.values())
    }

    /// Fetches every page that is not cached yet.
    pub fn fetch_all(&mut self) -> Result<()> {
        if self.empty {
            return Ok(());
        }
        let Some(page_size) = self.resource.page_size() else {
            return self.fetch_page(0);
        };
        let pages = self.count()?.div_ceil(page_size.max(1));
        for page in 0..pages {
            self.fetch_page(page)?;
        }
        Ok(())
    }

    /// Returns the envelope metadata of a fetched page, without `results`.
    pub fn page_metadata(&self, page: usize) -> Option<&Map<String, Value>> {
        self.pages_fetched.get(&page)
    }

    /// Retrieves one item by lookup parameters through the item address.
    pub fn get<I, K, V>(&self, params: I) -> Result<Resource>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let item = self.item_pattern()?;
        let lookup: Map<String, Value> = params
            .into_iter()
            .map(|(key, value)| (self.lookup_key(key.into()), value.into()))
            .collect();
        let url = item.get_absolute_url(
            self.resource.root(),
            &Query::new(),
            &Params::from_values(&lookup),
        )?;
        self.request_item(item, &url)
    }

    /// Retrieves one item by URI. The parameters are re-derived through the
    /// item address, so relative and absolute URIs both work.
    pub fn get_by_uri(&self, uri: &str) -> Result<Resource> {
        let item = self.item_pattern()?;
        let params = item.params_from_uri(uri)?;
        let url = item.get_absolute_url(self.resource.root(), &Query::new(), &params)?;
        self.request_item(item, &url)
    }

    fn request_item(&self, item: &ResourcePattern, url: &str) -> Result<Resource> {
        let response = self.client.get(url)?;
        check_status("get", &response, &READ_STATUSES)?;
        let uri = response.request.uri;
        match item.clean(response.content)? {
            Value::Object(data) => Ok(Resource::new(
                self.resource.clone(),
                data,
                Some(uri),
                Arc::clone(&self.client),
            )),
            other => Err(ResourceError::UnexpectedContent {
                uri,
                reason: format!("expected an object, got {}", json_kind(&other)),
            }),
        }
    }

    fn fetch_page(&mut self, page: usize) -> Result<()> {
        if self.empty || self.pages_fetched.contains_key(&page) {
            return Ok(());
        }
        let ty = self.resource.clone();
        let list = ty.list_pattern().ok_or_else(|| {
            ResourceError::Configuration(format!("{} has no list address", ty.name()))
        })?;

        // Filters naming a list parameter fill the address, the rest go to
        // the query string.
        let mut params = Params::new();
        let mut query = Query::new();
        for (key, value) in &self.query {
            if list.param_names().contains(key) {
                params.insert(key.clone(), value_to_param(value));
            } else {
                query.insert(key.clone(), value.clone());
            }
        }
        if let Some(page_size) = ty.page_size() {
            query.insert(ty.page_size_param().to_string(), Value::from(page_size));
            query.insert(ty.page_param().to_string(), Value::from(page + 1));
        }

        let url = list.get_absolute_url(ty.root(), &query, &params)?;
        tracing::debug!(resource = ty.name(), page, url = %url, "fetching page");

        let response = self.client.get(&url)?;
        check_status("get", &response, &READ_STATUSES)?;
        let uri = response.request.uri;
        let content = list.clean(response.content)?;

        let (rows, offset, metadata) = match ty.page_size() {
            Some(page_size) => {
                let mut envelope = match content {
                    Value::Object(envelope) => envelope,
                    other => {
                        return Err(ResourceError::UnexpectedContent {
                            uri,
                            reason: format!(
                                "expected a paginated object, got {}",
                                json_kind(&other)
                            ),
                        })
                    }
                };
                let Some(rows) = envelope.remove("results") else {
                    return Err(ResourceError::UnexpectedContent {
                        uri,
                        reason: "paginated response has no results".to_string(),
                    });
                };
                (rows, page * page_size, envelope)
            }
            None => (content, 0, Map::new()),
        };
        let rows = match rows {
            Value::Array(rows) => rows,
            other => {
                return Err(ResourceError::UnexpectedContent {
                    uri,
                    reason: format!("expected a list of objects, got {}", json_kind(&other)),
                })
            }
        };

        tracing::debug!(resource = ty.name(), page, rows = rows.len(), "fetched page");
        for (idx, row) in rows.into_iter().enumerate() {
            let data = match row {
                Value::Object(data) => data,
                other => {
                    return Err(ResourceError::UnexpectedContent {
                        uri,
                        reason: format!("expected an object row, got {}", json_kind(&other)),
                    })
                }
            };
            let absolute_url = match ty.pk_name().and_then(|pk| data.get(pk)) {
                Some(pk) => ty.item_url(pk)?,
                None => None,
            };
            self.result_cache.insert(
                offset + idx,
                Resource::new(ty.clone(), data, absolute_url, Arc::clone(&self.client)),
            );
        }
        self.pages_fetched.insert(if ty.page_size().is_some() { page } else { 0 }, metadata);
        Ok(())
    }

    /// The total announced by any fetched page, or the row count of an
    /// unpaginated list.
    fn known_count(&self) -> Option<usize> {
        if self.empty {
            return Some(0);
        }
        match self.resource.page_size() {
            None => self
                .pages_fetched
                .contains_key(&0)
                .then(|| self.result_cache.len()),
            Some(_) => self
                .pages_fetched
                .values()
                .find_map(|envelope| envelope.get("count").and_then(Value::as_u64))
                .map(|count| usize::try_from(count).unwrap_or(usize::MAX)),
        }
    }

    /// Like `count`, but learns the total from `page` when nothing is known
    /// yet, so that page is not fetched twice.
    ///
    /// Servers may reject a page past the end, or answer it without rows or
    /// a count. The first page then supplies the total instead.
    fn count_via(&mut self, page: usize) -> Result<usize> {
        if page == 0 || self.known_count().is_some() {
            return self.count();
        }
        match self.fetch_page(page) {
            Ok(()) => {}
            Err(ResourceError::Server { uri, status, .. }) => {
                tracing::debug!(
                    resource = self.resource.name(),
                    page,
                    status,
                    uri = %uri,
                    "page rejected, counting from the first page"
                );
            }
            Err(err) => return Err(err),
        }
        self.count()
    }

    fn page_for_index(&self, index: usize) -> usize {
        match self.resource.page_size() {
            Some(page_size) if page_size > 0 => index / page_size,
            _ => 0,
        }
    }

    fn cached(&self, index: usize) -> Result<&Resource> {
        self.result_cache
            .get(&index)
            .ok_or_else(|| ResourceError::UnexpectedContent {
                uri: self.list_uri_hint(),
                reason: format!("page holds fewer rows than announced, index {index} is missing"),
            })
    }

    fn lookup_key(&self, key: String) -> String {
        match (key.as_str(), self.resource.pk_name()) {
            ("pk", Some(pk)) => pk.to_string(),
            _ => key,
        }
    }

    fn item_pattern(&self) -> Result<&ResourcePattern> {
        self.resource.item_pattern().ok_or_else(|| {
            ResourceError::Configuration(format!("{} has no item address", self.resource.name()))
        })
    }

    fn list_uri_hint(&self) -> String {
        self.resource
            .list_pattern()
            .map(|list| list.pattern().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Debug for QuerySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("resource", &self.resource)
            .field("query", &self.query)
            .field("empty", &self.empty)
            .field("pages_fetched", &self.pages_fetched.keys().collect::<Vec<_>>())
            .field("cached", &self.result_cache.len())
            .finish()
    }
}

/// Maps a status outside `accepted` to a validation (400) or server error.
pub(crate) fn check_status(
    operation: &'static str,
    response: &Response,
    accepted: &[u16],
) -> Result<()> {
    if accepted.contains(&response.status_code) {
        return Ok(());
    }
    let uri = response.request.uri.clone();
    let status = response.status_code;
    let body = response.content.clone();
    tracing::debug!(operation, uri = %uri, status, "request rejected");
    if status == 400 && operation != "get" {
        Err(ResourceError::Validation {
            operation,
            uri,
            status,
            body,
        })
    } else {
        Err(ResourceError::Server {
            operation,
            uri,
            status,
            body,
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
