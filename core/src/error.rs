//! Error types for the REST transport core.
//!
//! # Design
//! Argument problems (`InvalidMethod`, `ZeroRedirectLimit`) are detected
//! before any network I/O and are grouped by `is_invalid_argument`. A
//! terminal non-2xx, non-3xx response lands in `Protocol` with the raw status
//! code and body for debugging. Nothing here is retried.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::io;

/// Boxed source error carried by transport and decode failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors returned by `RestClient` and the pipeline stages behind it.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The verb is not one of GET, PUT, POST, DELETE.
    #[error("invalid HTTP method {method:?}: expected GET, PUT, POST or DELETE")]
    InvalidMethod { method: String },

    /// A redirect limit of zero was supplied.
    #[error("redirect limit must be at least 1")]
    ZeroRedirectLimit,

    /// The server kept redirecting after the budget was spent.
    #[error("exceeded redirect limit of {limit}")]
    RedirectLimitExceeded { limit: u32 },

    /// No response could be obtained from the server.
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The body did not match the advertised content type.
    #[error("failed to decode {content_type:?} response body: {source}")]
    Decode {
        content_type: String,
        #[source]
        source: BoxError,
    },

    /// The server returned a terminal non-success status.
    #[error("HTTP {status}: {body}")]
    Protocol { status: u16, body: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local I/O failure, such as writing the raw sink.
    #[error(transparent)]
    Io(io::Error),
}

impl RestError {
    /// True for errors raised on bad caller input before any I/O.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, RestError::InvalidMethod { .. } | RestError::ZeroRedirectLimit)
    }

    /// Status code of a `Protocol` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body snippet of a `Protocol` error.
    pub fn body(&self) -> Option<&str> {
        match self {
            RestError::Protocol { body, .. } => Some(body),
            _ => None,
        }
    }
}

// Lets `RestClient::request` take an `HttpMethod` where a fallible
// conversion is expected.
impl From<Infallible> for RestError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

// Network failures surfacing through a body reader arrive as `io::Error`
// wrapping a `RestError`; those are unwrapped, everything else is `Io`.
impl From<io::Error> for RestError {
    fn from(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<RestError>()) {
            return RestError::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<RestError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => RestError::Io(io::Error::new(kind, other)),
            None => RestError::Io(kind.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RestError>;
