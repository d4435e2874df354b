//! `authgate-core`: value types shared by every layer of the login pipeline.
//!
//! This crate contains **pure** types (no I/O, no async runtime).

pub mod credential;
pub mod domain;
pub mod error;
pub mod role;

pub use credential::Credential;
pub use domain::{Domain, HostCandidate};
pub use error::{ValidationError, ValidationResult};
pub use role::Role;
