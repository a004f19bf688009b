//! Blocking REST transport core for the configuration agent.
//!
//! # Overview
//! Exchanges JSON resource representations with the agent's server:
//! GET/PUT/POST/DELETE against a base URL, bounded redirect following, JSON
//! vs. raw payload handling, and distinct errors for transport failures,
//! protocol failures and bad arguments.
//!
//! # Design
//! - Each call runs a fixed pipeline: `RequestSpec` builder, `Transport`,
//!   redirect loop, then `classify` or `decode`.
//! - Requests and responses are plain data (`http` module) so every stage is
//!   testable without a network; only `Transport` does I/O.
//! - `RestClient` holds no mutable state; one connection per hop, no retries.
//! - Raw-mode bodies are spooled to a closed temporary file owned by the
//!   caller.

pub mod classify;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod redirect;
pub mod request;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::RestClient;
pub use config::ClientConfig;
pub use decode::{Decoded, RawSink};
pub use error::{RestError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, StatusClass};
pub use redirect::RedirectBudget;
pub use request::RequestSpec;
pub use transport::{Transport, UreqTransport};
