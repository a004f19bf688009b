//! Network execution of a single request hop.
//!
//! # Design
//! `Transport` is the only stage that touches the network. `UreqTransport`
//! builds a fresh agent per hop so no connection outlives the hop that opened
//! it, and switches off ureq's own redirect following and status-as-error
//! handling: the redirect loop and the error classifier own those decisions.
//!
//! The configured timeout bounds every socket read, not the whole exchange.
//! ureq only offers per-phase deadlines, so the connector chain puts a
//! `ReadTimeout` layer between the TCP socket and TLS that caps each wait for
//! input. A download may take any amount of time as long as data keeps coming.

use std::io::{self, Read};
use std::time::Duration;

use tracing::debug;
use ureq::tls::TlsConfig;
use ureq::unversioned::resolver::DefaultResolver;
use ureq::unversioned::transport::{
    time, Buffers, ConnectProxyConnector, ConnectionDetails, Connector, NextTimeout,
    RustlsConnector, TcpConnector, Transport as WireTransport,
};
use ureq::RequestBuilder;

use crate::config::ClientConfig;
use crate::error::{RestError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP exchange and returns the response uninterpreted.
pub trait Transport {
    /// # Errors
    /// `RestError::Transport` when no response could be obtained.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

/// Blocking transport backed by `ureq`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    read_timeout: Duration,
    verify_tls: bool,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            read_timeout: config.request_timeout(),
            verify_tls: config.verify_tls,
        }
    }

    fn agent(&self) -> ureq::Agent {
        let mut builder = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false);
        if !self.verify_tls {
            builder = builder.tls_config(TlsConfig::builder().disable_verification(true).build());
        }
        let connector = ()
            .chain(ConnectProxyConnector::default())
            .chain(TcpConnector::default())
            .chain(ReadTimeoutConnector(self.read_timeout))
            .chain(RustlsConnector::default());
        ureq::Agent::with_parts(builder.build(), connector, DefaultResolver::default())
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let secure = request.url.scheme() == "https";
        debug!(
            method = %request.method,
            url = %request.url,
            secure,
            timeout_secs = self.read_timeout.as_secs(),
            "opening connection"
        );

        let agent = self.agent();
        let uri = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(agent.get(uri), &request.headers).call(),
            (HttpMethod::Delete, _) => with_headers(agent.delete(uri), &request.headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(agent.post(uri), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(agent.post(uri), &request.headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(agent.put(uri), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(agent.put(uri), &request.headers).send_empty(),
        };

        let response = result.map_err(|source| RestError::Transport {
            url: request.url.to_string(),
            source: Box::new(source),
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        debug!(status, url = %request.url, "response received");

        let body = ResponseBody {
            url: request.url.to_string(),
            inner: response.into_body().into_reader(),
        };
        Ok(HttpResponse::new(status, headers, body))
    }
}

/// Body reader that tags network failures with the URL they came from.
///
/// The failure travels as an `io::Error` wrapping `RestError::Transport`, which
/// `From<io::Error> for RestError` unwraps again.
struct ResponseBody<R> {
    url: String,
    inner: R,
}

impl<R: Read> Read for ResponseBody<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(|source| {
            let kind = source.kind();
            let err = RestError::Transport {
                url: self.url.clone(),
                source: Box::new(source),
            };
            io::Error::new(kind, err)
        })
    }
}

/// Connector that wraps the socket in a `ReadTimeout`.
#[derive(Debug, Clone, Copy)]
struct ReadTimeoutConnector(Duration);

impl<In: WireTransport> Connector<In> for ReadTimeoutConnector {
    type Out = ReadTimeout<In>;

    fn connect(
        &self,
        _: &ConnectionDetails,
        chained: Option<In>,
    ) -> std::result::Result<Option<Self::Out>, ureq::Error> {
        Ok(chained.map(|inner| ReadTimeout {
            inner,
            limit: self.0,
        }))
    }
}

/// Caps every wait for input at `limit`, whatever deadline ureq passes down.
#[derive(Debug)]
struct ReadTimeout<T> {
    inner: T,
    limit: Duration,
}

impl<T: WireTransport> WireTransport for ReadTimeout<T> {
    fn buffers(&mut self) -> &mut dyn Buffers {
        self.inner.buffers()
    }

    fn transmit_output(
        &mut self,
        amount: usize,
        timeout: NextTimeout,
    ) -> std::result::Result<(), ureq::Error> {
        self.inner.transmit_output(amount, timeout)
    }

    fn await_input(&mut self, timeout: NextTimeout) -> std::result::Result<bool, ureq::Error> {
        self.inner.await_input(capped(timeout, self.limit))
    }

    fn is_open(&mut self) -> bool {
        self.inner.is_open()
    }

    fn is_tls(&self) -> bool {
        self.inner.is_tls()
    }
}

fn capped(timeout: NextTimeout, limit: Duration) -> NextTimeout {
    NextTimeout {
        after: timeout.after.min(time::Duration::from(limit)),
        reason: timeout.reason,
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
