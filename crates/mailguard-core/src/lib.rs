//! Core types and error taxonomy for mailguard.
//!
//! This crate provides the foundational types shared across the workspace:
//!
//! - **Zone model**: [`Zone`] and [`ResourceRecord`] as exchanged with the zone-management API
//! - **SPF terms**: [`SpfTerm`] and the [`FlattenedSpf`] accumulator
//! - **Outcomes**: [`ReconcileOutcome`], [`DkimReport`], [`CheckResult`], [`HealthSummary`]
//! - **Reports**: [`DomainReport`] and [`RunReport`] handed to the reporting collaborator
//! - **Errors**: [`GuardError`] with retry classification
//!
//! # Example
//!
//! ```rust,ignore
//! use mailguard_core::{Zone, RecordType};
//!
//! fn apex_spf(zone: &Zone) -> Option<&str> {
//!     zone.find_txt("", |v| v.starts_with("v=spf1")).map(|r| r.value.as_str())
//! }
//! ```

mod error;
pub mod types;

pub use error::{GuardError, Result};
pub use types::*;
