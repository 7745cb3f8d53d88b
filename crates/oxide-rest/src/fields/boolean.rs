//! Boolean field type.

use serde_json::Value;

use super::{Field, FieldError, FieldKind, FieldOptions};

/// A boolean field.
#[derive(Debug, Clone)]
pub struct BooleanField {
    /// Field options.
    pub options: FieldOptions,
}

impl BooleanField {
    /// Creates a new BooleanField.
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

impl Default for BooleanField {
    fn default() -> Self {
        Self::new()
    }
}

impl Field for BooleanField {
    fn kind(&self) -> FieldKind {
        FieldKind::Boolean
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn clean(&self, value: Value) -> Result<Value, FieldError> {
        let b = match &value {
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" | "t" | "y" => true,
                "false" | "0" | "no" | "off" | "f" | "n" | "" => false,
                _ => {
                    return Err(FieldError::TypeConversion {
                        expected: "boolean",
                        value: value.clone(),
                    })
                }
            },
            other => super::is_truthy(other),
        };
        Ok(Value::Bool(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_field_clean() {
        let field = BooleanField::new();
        assert_eq!(field.clean(json!(true)).unwrap(), json!(true));
        assert_eq!(field.clean(json!("True")).unwrap(), json!(true));
        assert_eq!(field.clean(json!("FALSE")).unwrap(), json!(false));
        assert_eq!(field.clean(json!("yes")).unwrap(), json!(true));
        assert_eq!(field.clean(json!("off")).unwrap(), json!(false));
        assert_eq!(field.clean(json!(0)).unwrap(), json!(false));
        assert_eq!(field.clean(json!(2)).unwrap(), json!(true));
        assert_eq!(field.clean(Value::Null).unwrap(), json!(false));
        assert!(field.clean(json!("maybe")).is_err());
    }
}
