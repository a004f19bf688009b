//! Bounded redirect following.
//!
//! # Design
//! Redirects are chased in a plain loop. The budget is the only thing that
//! ends a redirect chain, so a zero budget is rejected up front instead of
//! meaning "do not follow". Each hop goes through the transport again with a
//! fresh connection; hops are strictly sequential.

use tracing::{debug, warn};

use crate::classify::classify;
use crate::error::{RestError, Result};
use crate::http::{HttpResponse, StatusClass};
use crate::request::RequestSpec;
use crate::transport::Transport;

/// Remaining redirect hops for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectBudget {
    limit: u32,
    remaining: u32,
}

impl RedirectBudget {
    /// # Errors
    /// `ZeroRedirectLimit` when `limit` is 0.
    pub fn new(limit: u32) -> Result<Self> {
        if limit == 0 {
            return Err(RestError::ZeroRedirectLimit);
        }
        Ok(Self {
            limit,
            remaining: limit,
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Account for one followed redirect.
    ///
    /// # Errors
    /// `RedirectLimitExceeded` when nothing is left to spend.
    pub fn spend(&mut self) -> Result<()> {
        if self.remaining == 0 {
            return Err(RestError::RedirectLimitExceeded { limit: self.limit });
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// Send `spec` and chase redirects until a terminal response arrives.
///
/// Returns the first non-3xx response, success or not. A 3xx without a
/// `location` header cannot be followed and is classified as a protocol
/// error.
pub fn follow<T: Transport + ?Sized>(
    transport: &T,
    spec: &RequestSpec,
    mut budget: RedirectBudget,
) -> Result<HttpResponse> {
    let mut current = spec.clone();
    loop {
        let response = transport.send(&current.to_http())?;
        if response.status_class() != StatusClass::Redirect {
            return Ok(response);
        }

        if let Err(err) = budget.spend() {
            warn!(limit = budget.limit(), url = %current.url(), "redirect limit exceeded");
            return Err(err);
        }

        let next = match response.location().map(|location| current.url().join(location)) {
            Some(next) => next?,
            None => return Err(classify(response)),
        };
        debug!(
            status = response.status,
            from = %current.url(),
            to = %next,
            remaining = budget.remaining(),
            "following redirect"
        );
        current = current.redirected(next);
    }
}
