//! Field types for resource definitions.
//!
//! Fields describe the keys of a resource's data mapping: how raw values are
//! cleaned on assignment, what to return when a key is absent, and, for
//! relation fields, how to reach the related resource.

mod boolean;
mod char;
mod numeric;
mod relations;
mod temporal;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{ResourceError, Result};

pub use boolean::BooleanField;
pub use char::{CharField, TextField, UrlField};
pub use numeric::IntegerField;
pub use relations::{
    default_lookup, LookupFn, NamedTarget, RelatedTarget, Relation, ToManyField, ToOneField,
};
pub use temporal::{DateField, DateTimeField};

/// Tracks each time a field is created. Used to retain declaration order.
static CREATION_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Errors raised by a field's clean rule.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The value cannot be converted to the field's type.
    #[error("cannot convert {value} to {expected}")]
    TypeConversion { expected: &'static str, value: Value },

    /// The value has the right type but is not acceptable.
    #[error("{0}")]
    Invalid(String),
}

/// The type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Boolean,
    Integer,
    Char,
    Text,
    Url,
    Date,
    DateTime,
    ToOne,
    ToMany,
}

impl FieldKind {
    /// Returns the kind as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Char => "char",
            Self::Text => "text",
            Self::Url => "url",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::ToOne => "to_one",
            Self::ToMany => "to_many",
        }
    }

    /// Returns true for relation kinds.
    pub fn is_relation(self) -> bool {
        matches!(self, Self::ToOne | Self::ToMany)
    }
}

/// Common field options.
#[derive(Debug, Clone)]
pub struct FieldOptions {
    /// Whether the field can be null.
    pub null: bool,
    /// Whether the field may be blank.
    pub blank: bool,
    /// Value returned when the data mapping lacks the key.
    pub default: Option<Value>,
    /// Whether the API requires the field.
    pub required: bool,
    /// Whether the field may be assigned.
    pub editable: bool,
    /// Whether this is the primary key.
    pub primary_key: bool,
    /// Human-readable name for the field.
    pub verbose_name: Option<String>,
    /// Help text.
    pub help_text: Option<String>,
    creation_counter: usize,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldOptions {
    /// Creates new field options with defaults.
    pub fn new() -> Self {
        Self {
            null: false,
            blank: false,
            default: None,
            required: true,
            editable: true,
            primary_key: false,
            verbose_name: None,
            help_text: None,
            creation_counter: CREATION_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Sets the null option.
    #[must_use]
    pub fn null(mut self, value: bool) -> Self {
        self.null = value;
        self
    }

    /// Sets the blank option.
    #[must_use]
    pub fn blank(mut self, value: bool) -> Self {
        self.blank = value;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the required option.
    #[must_use]
    pub fn required(mut self, value: bool) -> Self {
        self.required = value;
        self
    }

    /// Sets the editable option.
    #[must_use]
    pub fn editable(mut self, value: bool) -> Self {
        self.editable = value;
        self
    }

    /// Sets the primary_key option.
    #[must_use]
    pub fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Sets the verbose_name option.
    #[must_use]
    pub fn verbose_name(mut self, value: impl Into<String>) -> Self {
        self.verbose_name = Some(value.into());
        self
    }

    /// Sets the help_text option.
    #[must_use]
    pub fn help_text(mut self, value: impl Into<String>) -> Self {
        self.help_text = Some(value.into());
        self
    }

    /// Position of this field in declaration order.
    pub fn creation_counter(&self) -> usize {
        self.creation_counter
    }

    /// Replaces everything except the creation counter.
    pub(crate) fn replace(&mut self, other: Self) {
        let counter = self.creation_counter;
        *self = Self {
            creation_counter: counter,
            ..other
        };
    }

    /// Whether null-like values are acceptable.
    pub(crate) fn allows_empty(&self) -> bool {
        self.null || self.blank
    }
}

/// A field of a resource.
///
/// Resources dispatch reads and writes by field name to the registered
/// `dyn Field`, so a field never needs to know which resource it belongs to.
pub trait Field: fmt::Debug + Send + Sync {
    /// Returns the field type.
    fn kind(&self) -> FieldKind;

    /// Returns the field options.
    fn options(&self) -> &FieldOptions;

    /// Coerces an assigned value into the stored representation.
    fn clean(&self, value: Value) -> std::result::Result<Value, FieldError>;

    /// Reads the stored value, falling back to the declared default.
    fn get(&self, data: &Map<String, Value>, name: &str) -> Value {
        data.get(name)
            .cloned()
            .or_else(|| self.options().default.clone())
            .unwrap_or(Value::Null)
    }

    /// Cleans `value` and stores it.
    fn set(&self, data: &mut Map<String, Value>, name: &str, value: Value) -> Result<()> {
        if !self.options().editable {
            return Err(ResourceError::NotEditable {
                field: name.to_string(),
            });
        }
        let cleaned = self.clean(value).map_err(|source| ResourceError::Field {
            field: name.to_string(),
            source,
        })?;
        data.insert(name.to_string(), cleaned);
        Ok(())
    }

    /// Returns the relation for relation fields.
    fn relation(&self) -> Option<&Relation> {
        None
    }
}

/// Whether a JSON value counts as set: null, false, zero and empty
/// containers do not.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_creation_counter_is_monotonic() {
        let first = FieldOptions::new();
        let second = FieldOptions::new();
        assert!(first.creation_counter() < second.creation_counter());
    }

    #[test]
    fn test_replace_keeps_counter() {
        let mut options = FieldOptions::new();
        let counter = options.creation_counter();
        options.replace(FieldOptions::new().primary_key(true));
        assert_eq!(options.creation_counter(), counter);
        assert!(options.primary_key);
    }

    #[test]
    fn test_get_falls_back_to_default() {
        let field = CharField::new().options(FieldOptions::new().default("n/a"));
        let data = Map::new();
        assert_eq!(field.get(&data, "title"), json!("n/a"));

        let plain = CharField::new();
        assert_eq!(plain.get(&data, "title"), Value::Null);
    }

    #[test]
    fn test_set_rejects_non_editable() {
        let field = IntegerField::new().options(FieldOptions::new().editable(false));
        let mut data = Map::new();
        let err = field.set(&mut data, "id", json!(1)).unwrap_err();
        assert!(matches!(err, ResourceError::NotEditable { .. }));
        assert!(data.is_empty());
    }

    #[test]
    fn test_set_stores_cleaned_value() {
        let field = IntegerField::new();
        let mut data = Map::new();
        field.set(&mut data, "pages", json!("320")).unwrap();
        assert_eq!(data["pages"], json!(320));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!([1])));
    }
}
