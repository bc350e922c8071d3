//! Endpoint and schema identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One testable API operation.
///
/// Supplied by the schema loader; events only carry it through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// HTTP method, upper-cased.
    pub method: String,

    /// Path template, e.g. `/users/{id}`.
    pub path: String,

    /// Pointer into the schema that defines this operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_ref: Option<String>,
}

impl Endpoint {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            path: path.into(),
            schema_ref: None,
        }
    }

    /// Attach the schema pointer for this operation.
    pub fn with_schema_ref(mut self, schema_ref: impl Into<String>) -> Self {
        self.schema_ref = Some(schema_ref.into());
        self
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Parses `"METHOD /path"`.
impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (method, path) = match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(path), None) => (method, path),
            _ => {
                return Err(Error::InvalidEndpoint(format!(
                    "expected `METHOD /path`, got `{}`",
                    s
                )))
            }
        };

        if !method.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidEndpoint(format!("bad method `{}`", method)));
        }
        if !path.starts_with('/') {
            return Err(Error::InvalidEndpoint(format!(
                "path must start with `/`, got `{}`",
                path
            )));
        }

        Ok(Endpoint::new(method, path))
    }
}

/// Opaque handle for the schema under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaHandle {
    /// Where the schema was loaded from (URL or file path).
    pub location: String,
}

impl SchemaHandle {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}
