//! Numeric field types.

use serde_json::Value;

use super::{Field, FieldError, FieldKind, FieldOptions};

/// An integer field (64-bit).
#[derive(Debug, Clone)]
pub struct IntegerField {
    /// Field options.
    pub options: FieldOptions,
}

impl IntegerField {
    /// Creates a new IntegerField.
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

impl Default for IntegerField {
    fn default() -> Self {
        Self::new()
    }
}

impl Field for IntegerField {
    fn kind(&self) -> FieldKind {
        FieldKind::Integer
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn clean(&self, value: Value) -> Result<Value, FieldError> {
        let parsed = match &value {
            Value::Null if self.options.null => return Ok(Value::Null),
            Value::Bool(b) => Some(Value::from(i64::from(*b))),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Value::Number(n.clone())),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.is_finite() && f.abs() < 9.2e18)
                .map(|f| Value::from(f.trunc() as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Value::from)
                    .or_else(|_| s.parse::<u64>().map(Value::from))
                    .ok()
            }
            _ => None,
        };
        parsed.ok_or(FieldError::TypeConversion {
            expected: "integer",
            value,
        })
    }
}
