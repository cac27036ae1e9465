//! HTTP client for the zone-management API.
//!
//! This crate provides the [`ZoneClient`], which wraps every call in a shared
//! token-bucket [`RateLimiter`] and an exponential-backoff [`RetryPolicy`], plus
//! the [`ZoneApi`] trait the reconcilers program against.

mod client;
mod config;
mod limiter;
mod retry;
pub mod api;

pub use api::ZoneApi;
pub use client::{ZoneClient, ZoneClientBuilder, CONTEXT_HEADER};
pub use config::*;
pub use limiter::RateLimiter;
pub use mailguard_core::{GuardError, Result};
