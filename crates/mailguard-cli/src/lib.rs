//! # mailguard-cli
//!
//! Command-line front end for the mail-authentication audit.
//!
//! ## Commands
//!
//! - **run**: reconcile SPF, DMARC and DKIM on every domain, then write a JSON report
//! - **flatten**: expand the includes of an SPF record
//! - **check**: delegation pre-check and health checks for one domain
//!
//! Configuration lives in `mailguard.toml`; the API password may also come
//! from `MAILGUARD_API_PASSWORD`.

pub mod cli;
pub mod config;
pub mod output;
pub mod report;

pub use cli::run;
