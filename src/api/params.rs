//! Query string construction for weather API requests

/// A single query parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Omitted from the query string
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Joined with `,`
    List(Vec<String>),
}

impl ParamValue {
    /// Serialize to the string placed in the query, or `None` when omitted
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::List(items) => Some(items.join(",")),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<&[String]> for ParamValue {
    fn from(value: &[String]) -> Self {
        Self::List(value.to_vec())
    }
}

impl From<&[&str]> for ParamValue {
    fn from(value: &[&str]) -> Self {
        Self::List(value.iter().map(|s| s.to_string()).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Insertion-ordered query parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    pairs: Vec<(&'static str, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, keeping insertion order
    pub fn set(mut self, name: &'static str, value: impl Into<ParamValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a parameter in place
    pub fn push(&mut self, name: &'static str, value: impl Into<ParamValue>) {
        self.pairs.push((name, value.into()));
    }

    /// Rendered `(name, value)` pairs with absent values dropped
    pub fn rendered(&self) -> Vec<(&'static str, String)> {
        self.pairs
            .iter()
            .filter_map(|(name, value)| value.render().map(|v| (*name, v)))
            .collect()
    }

    /// Encode as `application/x-www-form-urlencoded`
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.rendered())
            .finish()
    }
}

/// Build a request URL from a base endpoint and parameters
pub fn build_url(base: &str, params: &Params) -> String {
    let query = params.encode();
    if query.is_empty() {
        return base.to_string();
    }
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}
