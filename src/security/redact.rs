//! Scrubbing of sensitive URL components before they are recorded.

use std::collections::HashSet;
use url::Url;

/// Replacement for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Query parameters redacted when nothing else is configured.
pub const DEFAULT_SENSITIVE_PARAMS: &[&str] = &[
    "access_token",
    "api_key",
    "apikey",
    "auth",
    "client_secret",
    "key",
    "password",
    "secret",
    "signature",
    "token",
];

/// Redacts configured query parameters and userinfo from URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRedactor {
    params: HashSet<String>,
}

impl UrlRedactor {
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            params: params
                .into_iter()
                .map(|p| p.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Redactor that never touches query parameters (userinfo is still stripped).
    pub fn disabled() -> Self {
        Self {
            params: HashSet::new(),
        }
    }

    pub fn is_sensitive(&self, param: &str) -> bool {
        self.params.contains(&param.to_ascii_lowercase())
    }

    /// Scrub `raw`. Unparsable input is returned unchanged.
    pub fn redact(&self, raw: &str) -> String {
        let Ok(mut url) = Url::parse(raw) else {
            return raw.to_string();
        };

        let has_userinfo = !url.username().is_empty() || url.password().is_some();
        if has_userinfo {
            let _ = url.set_username("");
            let _ = url.set_password(None);
        }

        let sensitive_query = url.query_pairs().any(|(k, _)| self.is_sensitive(&k));
        if !sensitive_query {
            return if has_userinfo { url.to_string() } else { raw.to_string() };
        }

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let value = if self.is_sensitive(&k) {
                    REDACTED.to_string()
                } else {
                    v.into_owned()
                };
                (k.into_owned(), value)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
        url.to_string()
    }
}

impl Default for UrlRedactor {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVE_PARAMS)
    }
}
