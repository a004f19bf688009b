//! Client configuration.
//!
//! The agent loads its settings elsewhere and hands the client a
//! `ClientConfig`; field names match the agent's configuration keys so the
//! struct can be deserialized directly from them.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default read timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 300;

/// Default number of redirect hops a verb call may follow.
pub const DEFAULT_REDIRECT_LIMIT: u32 = 10;

/// Configuration for `RestClient`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Read timeout applied to every connection.
    pub request_timeout_seconds: u64,
    /// Verify server certificates on https connections.
    pub verify_tls: bool,
    /// Redirect budget used by the verb methods.
    pub redirect_limit: u32,
    /// Directory for raw-mode temporary files; the system temp dir if unset.
    pub raw_sink_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            verify_tls: true,
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            raw_sink_dir: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    request_timeout_seconds: Option<u64>,
    verify_tls: Option<bool>,
    redirect_limit: Option<u32>,
    raw_sink_dir: Option<PathBuf>,
}

impl ClientConfigBuilder {
    #[must_use]
    pub const fn request_timeout_seconds(mut self, seconds: u64) -> Self {
        self.request_timeout_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub const fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = Some(verify);
        self
    }

    /// Zero is accepted here and rejected when a request is made.
    #[must_use]
    pub const fn redirect_limit(mut self, limit: u32) -> Self {
        self.redirect_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn raw_sink_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw_sink_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            request_timeout_seconds: self
                .request_timeout_seconds
                .unwrap_or(defaults.request_timeout_seconds),
            verify_tls: self.verify_tls.unwrap_or(defaults.verify_tls),
            redirect_limit: self.redirect_limit.unwrap_or(defaults.redirect_limit),
            raw_sink_dir: self.raw_sink_dir.or(defaults.raw_sink_dir),
        }
    }
}
