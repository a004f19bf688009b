//! Success-response decoding.
//!
//! # Design
//! The shape of the result is decided once per response and reported as a
//! tagged `Decoded` value: raw mode always wins and never looks at the content
//! type; otherwise a JSON media type selects structured parsing and anything
//! else comes back as text.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::TempPath;
use tracing::debug;

use crate::error::{RestError, Result};
use crate::http::HttpResponse;

const RAW_SINK_PREFIX: &str = "rest-raw-";

/// Result of a successful request.
#[derive(Debug)]
pub enum Decoded {
    /// Body of a JSON response, parsed.
    Json(Value),
    /// Raw-mode body, spooled to a temporary file.
    Raw(RawSink),
    /// Body of any other response, as received.
    Text(String),
}

impl Decoded {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Decoded::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Decoded::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_raw(self) -> Option<RawSink> {
        match self {
            Decoded::Raw(sink) => Some(sink),
            _ => None,
        }
    }

    /// Deserialize a JSON result into `T`.
    ///
    /// # Errors
    /// `Decode` when the result is not JSON or does not fit `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Decoded::Json(value) => serde_json::from_value(value).map_err(|e| decode_error("application/json", e)),
            Decoded::Text(_) => Err(decode_error("text", "response was not JSON")),
            Decoded::Raw(_) => Err(decode_error("raw", "raw response was not decoded")),
        }
    }
}

/// A closed temporary file holding a raw response body.
///
/// The file is removed when the sink is dropped unless `keep` is called.
#[derive(Debug)]
pub struct RawSink {
    path: TempPath,
    len: u64,
}

impl RawSink {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of body bytes written.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reopen the file for reading.
    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    pub fn read_to_vec(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Stop tracking the file so it survives the sink, returning its path.
    pub fn keep(self) -> Result<PathBuf> {
        Ok(self.path.keep().map_err(io::Error::from)?)
    }
}

/// Decode a terminal success response.
///
/// # Errors
/// `Decode` for a malformed JSON body or non-UTF-8 text, `Transport` when the
/// body stops arriving, `Io` when the raw sink cannot be written.
pub fn decode(response: HttpResponse, raw: bool, sink_dir: Option<&Path>) -> Result<Decoded> {
    if raw {
        return spool(response, sink_dir).map(Decoded::Raw);
    }

    let content_type = response.content_type().map(str::to_string);
    let body = response.read_body()?;
    match content_type {
        Some(content_type) if is_json(&content_type) => serde_json::from_slice(&body)
            .map(Decoded::Json)
            .map_err(|e| decode_error(&content_type, e)),
        content_type => String::from_utf8(body).map(Decoded::Text).map_err(|e| {
            decode_error(content_type.as_deref().unwrap_or("text/plain"), e)
        }),
    }
}

/// Whether a `content-type` value names a JSON media type.
pub fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
        .contains("json")
}

/// Stream a response body into a closed temporary file.
pub(crate) fn spool(mut response: HttpResponse, sink_dir: Option<&Path>) -> Result<RawSink> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(RAW_SINK_PREFIX);
    let mut file = match sink_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };

    // An early return drops `file`, which deletes the partial download.
    let len = io::copy(response.body_mut(), &mut file)?;
    file.flush()?;
    // Dropping the handle here closes the file; only the path is kept.
    let path = file.into_temp_path();
    debug!(path = %path.display(), bytes = len, "raw response spooled");

    Ok(RawSink { path, len })
}

fn decode_error(content_type: &str, source: impl Into<crate::error::BoxError>) -> RestError {
    RestError::Decode {
        content_type: content_type.to_string(),
        source: source.into(),
    }
}
