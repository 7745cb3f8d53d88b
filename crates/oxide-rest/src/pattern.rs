//! URL patterns for addressing resources.
//!
//! A [`ResourcePattern`] is a regular expression with named groups, such as
//! `^book/(?P<isbn>[\d-]+)$`. The same template both matches incoming URLs
//! (URL → parameters) and generates outgoing ones (parameters → URL).

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Addressing errors.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The pattern is not a valid regular expression.
    #[error("invalid pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    /// A URI does not match the pattern.
    #[error("{uri} does not match pattern {pattern}")]
    NoMatch { pattern: String, uri: String },

    /// A named parameter of the pattern was not supplied.
    #[error("the URL pattern {pattern} requires {param} as named argument")]
    MissingParam { pattern: String, param: String },

    /// A supplied parameter is not named by the pattern.
    #[error("the URL pattern {pattern} has no parameter named {param}")]
    UnexpectedParam { pattern: String, param: String },

    /// The response envelope lacks the configured sub-path key.
    #[error("response has no {key} key")]
    MissingEnvelopeKey { key: String },
}

/// Query-string parameters. Values are JSON so filters keep their types
/// until they are encoded.
pub type Query = BTreeMap<String, Value>;

/// URL parameters, as extracted from or substituted into a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    params: BTreeMap<String, String>,
}

impl Params {
    /// Creates new empty params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts JSON lookup values into URL parameters.
    pub fn from_values(values: &Map<String, Value>) -> Self {
        values
            .iter()
            .map(|(k, v)| (k.clone(), value_to_param(v)))
            .collect()
    }

    /// Inserts a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Gets a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parses a parameter as a specific type.
    pub fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Renders a JSON value the way it appears in a URL.
pub fn value_to_param(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Encodes query parameters as `application/x-www-form-urlencoded`.
///
/// Arrays repeat their key once per element.
pub fn encode_query(query: &Query) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        match value {
            Value::Array(items) => {
                for item in items {
                    serializer.append_pair(key, &value_to_param(item));
                }
            }
            other => {
                serializer.append_pair(key, &value_to_param(other));
            }
        }
    }
    serializer.finish()
}

/// A segment of a reversible pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Literal text.
    Literal(String),
    /// A named group.
    Param(String),
}

/// How a pattern is declared: a bare pattern, or a pattern plus the key the
/// API nests the object under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSpec {
    pub pattern: String,
    pub obj_path: Option<String>,
}

impl From<&str> for PatternSpec {
    fn from(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            obj_path: None,
        }
    }
}

impl From<String> for PatternSpec {
    fn from(pattern: String) -> Self {
        Self {
            pattern,
            obj_path: None,
        }
    }
}

impl From<(&str, &str)> for PatternSpec {
    fn from((pattern, obj_path): (&str, &str)) -> Self {
        Self {
            pattern: pattern.to_string(),
            obj_path: Some(obj_path.to_string()),
        }
    }
}

/// A compiled, reversible addressing pattern.
#[derive(Debug, Clone)]
pub struct ResourcePattern {
    /// The original pattern string.
    pattern: String,
    /// Key the object is nested under in responses.
    obj_path: Option<String>,
    /// Compiled regex, anchors stripped.
    regex: Regex,
    /// Template for reversing.
    segments: Vec<Segment>,
    /// Named groups in order.
    param_names: Vec<String>,
}

impl PartialEq for ResourcePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.obj_path == other.obj_path
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl ResourcePattern {
    /// Compiles a pattern.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_rest::{Params, Query, ResourcePattern};
    ///
    /// let pattern = ResourcePattern::parse(r"^book/(?P<isbn>[\d-]+)$").unwrap();
    /// let url = pattern.get_url(&Query::new(), &Params::from([("isbn", "978-1441413024")])).unwrap();
    /// assert_eq!(url, "book/978-1441413024");
    ///
    /// let params = pattern.params_from_uri("http://localhost/api/book/978-1441413024").unwrap();
    /// assert_eq!(params.get("isbn"), Some("978-1441413024"));
    /// ```
    pub fn parse(spec: impl Into<PatternSpec>) -> Result<Self, PatternError> {
        let PatternSpec { pattern, obj_path } = spec.into();
        let stripped = pattern.trim_start_matches('^').trim_end_matches('$');

        let regex = Regex::new(stripped).map_err(|source| PatternError::InvalidPattern {
            pattern: pattern.clone(),
            source: Box::new(source),
        })?;
        let segments = parse_template(stripped);
        let param_names = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) => Some(name.clone()),
                Segment::Literal(_) => None,
            })
            .collect();

        Ok(Self {
            pattern,
            obj_path,
            regex,
            segments,
            param_names,
        })
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the key objects are nested under, if any.
    pub fn obj_path(&self) -> Option<&str> {
        self.obj_path.as_deref()
    }

    /// Returns the parameter names in template order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Extracts the named groups from a full URI.
    pub fn params_from_uri(&self, uri: &str) -> Result<Params, PatternError> {
        let caps = self.regex.captures(uri).ok_or_else(|| PatternError::NoMatch {
            pattern: self.pattern.clone(),
            uri: uri.to_string(),
        })?;

        Ok(self
            .param_names
            .iter()
            .filter_map(|name| caps.name(name).map(|m| (name.clone(), m.as_str().to_string())))
            .collect())
    }

    /// Generates a URL from parameters, with an optional query string.
    pub fn get_url(&self, query: &Query, params: &Params) -> Result<String, PatternError> {
        if let Some((unexpected, _)) = params
            .iter()
            .find(|(name, _)| !self.param_names.iter().any(|p| p == name))
        {
            return Err(PatternError::UnexpectedParam {
                pattern: self.pattern.clone(),
                param: unexpected.to_string(),
            });
        }

        let mut url = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => url.push_str(s),
                Segment::Param(name) => {
                    let value = params.get(name).ok_or_else(|| PatternError::MissingParam {
                        pattern: self.pattern.clone(),
                        param: name.clone(),
                    })?;
                    url.push_str(value);
                }
            }
        }

        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(query));
        }
        Ok(url)
    }

    /// Generates a URL prefixed with `root`.
    pub fn get_absolute_url(
        &self,
        root: Option<&str>,
        query: &Query,
        params: &Params,
    ) -> Result<String, PatternError> {
        let url = self.get_url(query, params)?;
        Ok(format!("{}{url}", root.unwrap_or_default()))
    }

    /// Unwraps the object from its envelope key, if one is configured.
    pub fn clean(&self, content: Value) -> Result<Value, PatternError> {
        let Some(key) = &self.obj_path else {
            return Ok(content);
        };
        match content {
            Value::Object(mut map) => map
                .remove(key)
                .ok_or_else(|| PatternError::MissingEnvelopeKey { key: key.clone() }),
            _ => Err(PatternError::MissingEnvelopeKey { key: key.clone() }),
        }
    }
}

/// Splits an anchor-less pattern into literal text and named groups.
fn parse_template(pattern: &str) -> Vec<Segment> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                let escaped = chars[i + 1];
                if escaped.is_ascii_punctuation() {
                    literal.push(escaped);
                } else {
                    literal.push('\\');
                    literal.push(escaped);
                }
                i += 2;
            }
            '(' => {
                if let Some((name, end)) = named_group(&chars, i) {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Param(name));
                    i = end + 1;
                } else {
                    literal.push('(');
                    i += 1;
                }
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Recognizes `(?P<name>...)` or `(?<name>...)` starting at `start`.
///
/// Returns the group name and the index of its closing parenthesis.
fn named_group(chars: &[char], start: usize) -> Option<(String, usize)> {
    let rest = &chars[start + 1..];
    let name_start = if rest.starts_with(&['?', 'P', '<']) {
        start + 4
    } else if rest.starts_with(&['?', '<']) && !matches!(rest.get(2).copied(), Some('=' | '!')) {
        start + 3
    } else {
        return None;
    };

    let name_len = chars[name_start..].iter().position(|c| *c == '>')?;
    let name: String = chars[name_start..name_start + name_len].iter().collect();

    let mut depth = 1;
    let mut in_class = false;
    let mut i = name_start + name_len + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth -= 1;
                if depth == 0 {
                    return Some((name, i));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
