//! Release downloads over HTTP.

mod client;
mod status;

pub use client::{HttpClient, RetryPolicy};
pub use status::{HttpStatusError, check_status};
