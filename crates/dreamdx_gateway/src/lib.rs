//! Client side of the DreamDX narrative endpoint.
//!
//! [`GatewayClient`] posts dream commands and retries transient failures with
//! the backoff schedule of [`RetryPolicy`].

mod client;
mod retry;

pub use client::GatewayClient;
pub use retry::{AttemptError, RetryPolicy, parse_retry_after, retry_with_backoff};
