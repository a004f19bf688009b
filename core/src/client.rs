//! Blocking REST client anchored to a base URL.
//!
//! # Design
//! `RestClient` holds the base URL, a read-only config and a transport, and
//! carries no mutable state between calls. Each verb resolves its path against
//! the base URL and runs the pipeline: build the request, send it, follow
//! redirects, then classify the failure or decode the success.

use serde::Serialize;
use tracing::info;
use url::Url;

use crate::classify::classify;
use crate::config::ClientConfig;
use crate::decode::{self, Decoded, RawSink};
use crate::error::{RestError, Result};
use crate::http::{HttpMethod, HttpResponse, StatusClass};
use crate::redirect::{self, RedirectBudget};
use crate::request::RequestSpec;
use crate::transport::{Transport, UreqTransport};

/// Synchronous client for the agent's REST server.
#[derive(Debug, Clone)]
pub struct RestClient<T = UreqTransport> {
    base_url: String,
    config: ClientConfig,
    transport: T,
}

impl RestClient<UreqTransport> {
    /// Client with default settings.
    ///
    /// # Errors
    /// `InvalidUrl` when `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, ClientConfig::default())
    }

    pub fn with_config(base_url: &str, config: ClientConfig) -> Result<Self> {
        let transport = UreqTransport::new(&config);
        Self::with_transport(base_url, config, transport)
    }
}

impl<T: Transport> RestClient<T> {
    pub fn with_transport(base_url: &str, config: ClientConfig, transport: T) -> Result<Self> {
        Url::parse(base_url)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve `path` against the base URL.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.base_url,
            path.trim_start_matches('/')
        ))?)
    }

    pub fn get(&self, path: &str) -> Result<Decoded> {
        let url = self.url_for(path)?;
        self.request(HttpMethod::Get, url, None::<&()>, self.config.redirect_limit, false)
    }

    /// GET `path` and spool the body to a temporary file without decoding it.
    pub fn get_raw(&self, path: &str) -> Result<RawSink> {
        let budget = RedirectBudget::new(self.config.redirect_limit)?;
        let spec = RequestSpec::build::<()>(HttpMethod::Get, self.url_for(path)?, None, true)?;
        info!(method = %spec.method(), url = %spec.url(), raw = true, "request");
        let response = self.execute(&spec, budget)?;
        decode::spool(response, self.config.raw_sink_dir.as_deref())
    }

    pub fn delete(&self, path: &str) -> Result<Decoded> {
        let url = self.url_for(path)?;
        self.request(HttpMethod::Delete, url, None::<&()>, self.config.redirect_limit, false)
    }

    pub fn post<D: Serialize + ?Sized>(&self, path: &str, data: &D) -> Result<Decoded> {
        let url = self.url_for(path)?;
        self.request(HttpMethod::Post, url, Some(data), self.config.redirect_limit, false)
    }

    pub fn put<D: Serialize + ?Sized>(&self, path: &str, data: &D) -> Result<Decoded> {
        let url = self.url_for(path)?;
        self.request(HttpMethod::Put, url, Some(data), self.config.redirect_limit, false)
    }

    /// Perform one logical request, following at most `redirect_limit`
    /// redirects.
    ///
    /// `method` may be an `HttpMethod` or a method name. Bad arguments (an
    /// unknown method, a zero redirect limit) fail before any network I/O.
    ///
    /// # Errors
    /// Any `RestError`; see the variants for when each is raised.
    pub fn request<M, D>(
        &self,
        method: M,
        url: Url,
        payload: Option<&D>,
        redirect_limit: u32,
        raw: bool,
    ) -> Result<Decoded>
    where
        M: TryInto<HttpMethod>,
        RestError: From<M::Error>,
        D: Serialize + ?Sized,
    {
        let method = method.try_into()?;
        let budget = RedirectBudget::new(redirect_limit)?;
        let spec = RequestSpec::build(method, url, payload, raw)?;
        info!(method = %method, url = %spec.url(), raw, "request");

        let response = self.execute(&spec, budget)?;
        decode::decode(response, raw, self.config.raw_sink_dir.as_deref())
    }

    /// Send, follow redirects, and fail on a non-success terminal status.
    fn execute(&self, spec: &RequestSpec, budget: RedirectBudget) -> Result<HttpResponse> {
        let response = redirect::follow(&self.transport, spec, budget)?;
        match response.status_class() {
            StatusClass::Success => Ok(response),
            StatusClass::Redirect | StatusClass::Error => Err(classify(response)),
        }
    }
}
