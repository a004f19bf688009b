//! Terminal error responses.

use std::io::Read;

use tracing::{debug, warn};

use crate::error::RestError;
use crate::http::HttpResponse;

/// Upper bound on how much of an error body is kept for diagnostics.
pub const BODY_SNIPPET_LIMIT: u64 = 64 * 1024;

/// Turn a non-success, non-redirect response into a `Protocol` error.
///
/// The body is read up to `BODY_SNIPPET_LIMIT` bytes. A body that fails to
/// read mid-way still yields the error with whatever was received.
pub fn classify(mut response: HttpResponse) -> RestError {
    let status = response.status;
    let mut snippet = Vec::new();
    if let Err(err) = response
        .body_mut()
        .take(BODY_SNIPPET_LIMIT)
        .read_to_end(&mut snippet)
    {
        debug!(status, error = %err, "error body truncated by read failure");
    }
    let body = String::from_utf8_lossy(&snippet).into_owned();
    warn!(status, "request failed");
    RestError::Protocol { status, body }
}
