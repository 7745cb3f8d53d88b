//! Character/string field types.

use serde_json::Value;

use super::{Field, FieldError, FieldKind, FieldOptions};

/// A character field with an optional maximum length.
///
/// Values longer than `max_length` are truncated, counting characters.
#[derive(Debug, Clone)]
pub struct CharField {
    /// Maximum length of the field.
    pub max_length: Option<usize>,
    /// Allowed values, when restricted.
    pub choices: Vec<String>,
    /// Field options.
    pub options: FieldOptions,
}

impl CharField {
    /// Creates a new CharField without a length limit.
    pub fn new() -> Self {
        Self {
            max_length: None,
            choices: Vec::new(),
            options: FieldOptions::new(),
        }
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Restricts the field to the given values.
    #[must_use]
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Sets field options.
    #[must_use]
    pub fn options(mut self, options: FieldOptions) -> Self {
        self.options.replace(options);
        self
    }

    fn to_text(&self, value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

impl Default for CharField {
    fn default() -> Self {
        Self::new()
    }
}

impl Field for CharField {
    fn kind(&self) -> FieldKind {
        FieldKind::Char
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn clean(&self, value: Value) -> Result<Value, FieldError> {
        let Some(mut text) = self.to_text(value) else {
            return Ok(if self.options.null {
                Value::Null
            } else {
                Value::String(String::new())
            });
        };
        if let Some(max) = self.max_length {
            if let Some((idx, _)) = text.char_indices().nth(max) {
                text.truncate(idx);
            }
        }
        if !self.choices.is_empty()
            && !self.choices.contains(&text)
            && !(text.is_empty() && self.options.allows_empty())
        {
            return Err(FieldError::Invalid(format!(
                "{text:?} is not one of {:?}",
                self.choices
            )));
        }
        Ok(Value::String(text))
    }
}

/// A text field without length limit.
#[derive(Debug, Clone)]
pub struct TextField {
    /// Field options.
    pub options: FieldOptions,
}

impl TextField {
    /// Creates a new TextField.
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

impl Default for TextField {
    fn default() -> Self {
        Self::new()
    }
}

impl Field for TextField {
    fn kind(&self) -> FieldKind {
        FieldKind::Text
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn clean(&self, value: Value) -> Result<Value, FieldError> {
        Ok(match value {
            Value::Null if self.options.null => Value::Null,
            Value::Null => Value::String(String::new()),
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        })
    }
}

/// A URL field.
#[derive(Debug, Clone)]
pub struct UrlField {
    /// Maximum length of the field.
    pub max_length: Option<usize>,
    /// Field options.
    pub options: FieldOptions,
}

impl UrlField {
    /// Creates a new UrlField.
    pub fn new() -> Self {
        Self {
            max_length: None,
            options: FieldOptions::new(),
        }
    }

    /// Sets the maximum length. Longer URLs are rejected, not truncated.
    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Sets field options.
    #[must_use]
    pub fn options(mut self, options: FieldOptions) -> Self {
        self.options.replace(options);
        self
    }
}

impl Default for UrlField {
    fn default() -> Self {
        Self::new()
    }
}

impl Field for UrlField {
    fn kind(&self) -> FieldKind {
        FieldKind::Url
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn clean(&self, value: Value) -> Result<Value, FieldError> {
        let text = match value {
            Value::Null if self.options.null => return Ok(Value::Null),
            Value::Null => String::new(),
            Value::String(s) => s,
            other => {
                return Err(FieldError::TypeConversion {
                    expected: "url",
                    value: other,
                })
            }
        };
        if text.is_empty() && self.options.allows_empty() {
            return Ok(Value::String(text));
        }
        if let Some(max) = self.max_length {
            if text.chars().count() > max {
                return Err(FieldError::Invalid(format!(
                    "URL exceeds maximum length of {max} characters"
                )));
            }
        }
        url::Url::parse(&text)
            .map_err(|e| FieldError::Invalid(format!("invalid URL {text:?}: {e}")))?;
        Ok(Value::String(text))
    }
}
