//! Method-specific request construction.
//!
//! GET and DELETE never carry a body. PUT and POST carry the JSON-serialized
//! payload and announce it with `Content-Type`. Raw requests skip the
//! `Accept` header since their responses are not content-negotiated.

use serde::Serialize;
use url::Url;

use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest};

pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A fully-resolved request for one logical call.
///
/// Immutable once built. Following a redirect produces a new `RequestSpec` aimed at the
/// new target with the same method, body and raw flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    method: HttpMethod,
    url: Url,
    headers: Vec<(String, String)>,
    body: Option<String>,
    raw: bool,
}

impl RequestSpec {
    pub fn build<T: Serialize + ?Sized>(
        method: HttpMethod,
        url: Url,
        payload: Option<&T>,
        raw: bool,
    ) -> Result<Self> {
        let body = match payload {
            Some(data) if method.has_body() => Some(serde_json::to_string(data)?),
            _ => None,
        };

        let mut headers = Vec::new();
        if !raw {
            headers.push(("Accept".to_string(), JSON_MEDIA_TYPE.to_string()));
        }
        if body.is_some() {
            headers.push(("Content-Type".to_string(), JSON_MEDIA_TYPE.to_string()));
        }

        Ok(Self {
            method,
            url,
            headers,
            body,
            raw,
        })
    }

    /// Same request, new target.
    pub fn redirected(&self, url: Url) -> Self {
        Self { url, ..self.clone() }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// The plain-data request handed to a `Transport`.
    pub fn to_http(&self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}
