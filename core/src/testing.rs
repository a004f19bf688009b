//! In-memory transport for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::{RestError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Replays canned responses in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    sent: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = HttpResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().collect()),
            sent: RefCell::default(),
        }
    }

    pub fn sends(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.sent.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| RestError::Transport {
                url: request.url.to_string(),
                source: "script exhausted".into(),
            })
    }
}

pub fn json(status: u16, body: &str) -> HttpResponse {
    HttpResponse::from_bytes(
        status,
        vec![("Content-Type".to_string(), "application/json".to_string())],
        body,
    )
}

pub fn text(status: u16, body: &str) -> HttpResponse {
    HttpResponse::from_bytes(
        status,
        vec![("Content-Type".to_string(), "text/plain".to_string())],
        body,
    )
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::from_bytes(302, vec![("Location".to_string(), location.to_string())], "")
}

/// `count` redirects hopping `/hop/{n}` down to `/hop/0`, then a JSON 200.
pub fn redirect_chain(count: usize) -> Vec<HttpResponse> {
    let mut responses: Vec<HttpResponse> = (0..count)
        .map(|n| redirect(&format!("http://h/hop/{}", count - n - 1)))
        .collect();
    responses.push(json(200, r#"{"done":true}"#));
    responses
}
