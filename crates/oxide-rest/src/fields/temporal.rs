//! Date and time field types.
//!
//! Values are stored in their wire form: `YYYY-MM-DD` for dates and RFC 3339
//! for date-times. Use `Resource::get_as::<chrono::NaiveDate>` to read them
//! back as chrono types.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::{Field, FieldError, FieldKind, FieldOptions};

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A date field.
#[derive(Debug, Clone)]
pub struct DateField {
    /// Field options.
    pub options: FieldOptions,
}

impl DateField {
    /// Creates a new DateField.
    pub fn new() -> Self {
        Self {
            options: FieldOptions::new(),
        }
    }

    /// Sets field options.
    #[must_use]
    pub fn options(mut self, options: FieldOptions) -> Self {
        self.options.replace(options);
        self
    }
}

impl Default for DateField {
    fn default() -> Self {
        Self::new()
    }
}

impl Field for DateField {
    fn kind(&self) -> FieldKind {
        FieldKind::Date
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn clean(&self, value: Value) -> Result<Value, FieldError> {
        let text = match &value {
            Value::Null if self.options.null => return Ok(Value::Null),
            Value::String(s) if s.is_empty() && self.options.allows_empty() => {
                return Ok(Value::Null)
            }
            Value::String(s) => s.trim(),
            _ => {
                return Err(FieldError::TypeConversion {
                    expected: "date",
                    value: value.clone(),
                })
            }
        };
        let date = NaiveDate::parse_from_str(text, DATE_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.date_naive()))
            .map_err(|_| FieldError::TypeConversion {
                expected: "date",
                value: value.clone(),
            })?;
        Ok(Value::String(date.format(DATE_FORMAT).to_string()))
    }
}

/// A date-time field.
#[derive(Debug, Clone)]
pub struct DateTimeField {
    /// Field options.
    pub options: FieldOptions,
}

impl DateTimeField {
    /// Creates a new DateTimeField.
    pub fn new() -> Self {
        Self {
            options: FieldOptions::new(),
        }
    }

    /// Sets field options.
    #[must_use]
    pub fn options(mut self, options: FieldOptions) -> Self {
        self.options.replace(options);
        self
    }
}

impl Default for DateTimeField {
    fn default() -> Self {
        Self::new()
    }
}

impl Field for DateTimeField {
    fn kind(&self) -> FieldKind {
        FieldKind::DateTime
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn clean(&self, value: Value) -> Result<Value, FieldError> {
        let text = match &value {
            Value::Null if self.options.null => return Ok(Value::Null),
            Value::String(s) if s.is_empty() && self.options.allows_empty() => {
                return Ok(Value::Null)
            }
            Value::String(s) => s.trim(),
            _ => {
                return Err(FieldError::TypeConversion {
                    expected: "datetime",
                    value: value.clone(),
                })
            }
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Value::String(dt.to_rfc3339()));
        }
        // Servers that omit the offset.
        let naive = NaiveDateTime::parse_from_str(text, NAIVE_DATETIME_FORMAT)
            .map_err(|_| FieldError::TypeConversion {
                expected: "datetime",
                value: value.clone(),
            })?;
        Ok(Value::String(naive.format(NAIVE_DATETIME_FORMAT).to_string()))
    }
}
