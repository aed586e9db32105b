//! Relative resource path construction.
//!
//! Caller-controlled segments (wallet and keyset names, addresses, txids,
//! block features) go through [`escape_segment`]; query parameters are
//! collected in insertion order by [`QueryParams`].

use std::fmt::Display;

use url::form_urlencoded;

use crate::error::ClientError;

/// Escape one path segment.
///
/// A segment carrying `/` or `?` would address a different resource once
/// the server decodes it, so it is rejected instead of escaped.
pub fn escape_segment(segment: &str) -> Result<String, ClientError> {
    if segment.contains('/') || segment.contains('?') {
        return Err(ClientError::InvalidArgument(format!(
            "invalid character found in the path of the request ('?' or '/'): `{segment}`"
        )));
    }
    Ok(form_urlencoded::byte_serialize(segment.as_bytes()).collect())
}

/// Ordered `key=value` query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: &'static str, value: impl Display) -> Self {
        self.pairs.push((key, value.to_string()));
        self
    }

    /// Append `colored=<flag>` when the preference is set.
    pub fn colored(self, colored: Option<bool>) -> Self {
        match colored {
            Some(flag) => self.push("colored", flag),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Display for QueryParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

/// Builder for a relative API path such as `wallets/{name}/keysets`.
#[derive(Debug, Clone, Default)]
pub struct ResourcePath {
    path: String,
    query: QueryParams,
}

impl ResourcePath {
    pub fn new(resource: &'static str) -> Self {
        Self {
            path: resource.to_owned(),
            query: QueryParams::new(),
        }
    }

    /// Append a fixed (trusted) path component.
    pub fn literal(mut self, component: &'static str) -> Self {
        self.path.push('/');
        self.path.push_str(component);
        self
    }

    /// Append an escaped caller-controlled segment.
    pub fn segment(mut self, value: &str) -> Result<Self, ClientError> {
        let escaped = escape_segment(value)?;
        self.path.push('/');
        self.path.push_str(&escaped);
        Ok(self)
    }

    pub fn query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn build(self) -> String {
        format!("{}{}", self.path, self.query)
    }
}

/// `wallets/{wallet}/keysets/{keyset}`
pub(crate) fn keyset_path(wallet: &str, keyset: &str) -> Result<ResourcePath, ClientError> {
    ResourcePath::new("wallets")
        .segment(wallet)?
        .literal("keysets")
        .segment(keyset)
}
