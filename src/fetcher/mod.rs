//! Fetcher module for retrieving the JSON resource
//!
//! This module contains:
//! - The `JsonSource` seam and its reqwest-backed `HttpSource`
//! - The bounded, fixed-delay retry loop around one attempt

mod retry;
mod source;

pub use retry::{fetch_with_retry, FetchError, Fetched, RetryPolicy};
pub use source::{build_http_client, AttemptError, HttpSource, JsonSource, Payload};
