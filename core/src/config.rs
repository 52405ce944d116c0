//! Application configuration consumed by the client.
//!
//! Two keys matter: `BASE_URL`, the default host for every client, and
//! `PROVIDER_URLS`, a map from provider name to host that takes precedence
//! for clients naming a provider.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "BASE_URL", default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(rename = "PROVIDER_URLS", default)]
    pub provider_urls: HashMap<String, String>,
}

impl ClientConfig {
    /// Read `BASE_URL` and `PROVIDER_URLS` (a JSON object) from the process
    /// environment. Unset variables leave the field empty.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let base_url = lookup("BASE_URL").filter(|v| !v.is_empty());
        let provider_urls = match lookup("PROVIDER_URLS") {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).map_err(|e| {
                ClientError::Configuration(format!("PROVIDER_URLS is not a JSON object of strings: {e}"))
            })?,
            _ => HashMap::new(),
        };
        Ok(Self {
            base_url,
            provider_urls,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_provider_url(mut self, provider: impl Into<String>, url: impl Into<String>) -> Self {
        self.provider_urls.insert(provider.into(), url.into());
        self
    }

    /// Host for `provider` if configured, else `BASE_URL`.
    pub fn resolve(&self, provider: Option<&str>) -> Option<&str> {
        provider
            .and_then(|p| self.provider_urls.get(p))
            .map(String::as_str)
            .filter(|url| !url.is_empty())
            .or(self.base_url.as_deref().filter(|url| !url.is_empty()))
    }
}
