//! Client configuration
//!
//! The API key carries the routing information: everything after the first
//! `-` is the datacenter the account lives in, and the target host is derived
//! from it. The key format itself is owned by the service; this module only
//! extracts the suffix.

use crate::errors::{ExportError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for an [`ExportClient`](crate::ExportClient)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// API key of the form `<id>-<datacenter>`
    pub api_key: String,

    /// Use HTTPS instead of HTTP
    #[serde(default)]
    pub secure: bool,

    /// Optional user-agent fragment prepended to the crate's own token
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Base URL override (testing, proxies). When set, datacenter routing
    /// is skipped entirely.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ExportConfig {
    /// Create a configuration with default options for the given API key
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            secure: false,
            user_agent: None,
            endpoint: None,
        }
    }

    /// Datacenter code embedded in the API key (the part after the first `-`)
    pub fn datacenter(&self) -> Result<&str> {
        match self.api_key.split_once('-') {
            Some((_, dc)) if !dc.is_empty() => Ok(dc),
            _ => Err(ExportError::InvalidKey(self.api_key.clone())),
        }
    }

    /// Base URL for this configuration, either the explicit override or the
    /// host derived from the datacenter code
    pub fn base_url(&self) -> Result<String> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }

        let scheme = if self.secure { "https" } else { "http" };
        let dc = self.datacenter()?;
        Ok(format!("{}://{}.api.mailchimp.com", scheme, dc))
    }

    /// Full user-agent header value
    pub fn user_agent_header(&self) -> String {
        let prefix = match &self.user_agent {
            Some(fragment) => format!("{} ", fragment),
            None => String::new(),
        };
        format!(
            "{}mailchimp-export-rs/{}",
            prefix,
            env!("CARGO_PKG_VERSION")
        )
    }
}
