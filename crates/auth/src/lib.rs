//! `authgate-auth`: identity token issuance and verification.
//!
//! This crate is intentionally decoupled from HTTP and from the directory.

pub mod claims;
pub mod issuer;

pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use issuer::{Hs256TokenIssuer, TokenDecodeError, TokenError, TokenIssuer, TokenIssuerConfig};
