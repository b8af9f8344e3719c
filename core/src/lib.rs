//! Validation engine for PassKit (`.pkpass`) archives.
//!
//! [`PassValidator::validate`] takes the raw zip bytes and returns a flat
//! [`ValidationResult`]. Failed checks are recorded on the result; only
//! input that cannot be evaluated at all surfaces as a [`CoreError`].

pub mod archive;
pub mod ber;
pub mod certificate;
pub mod config;
pub mod content;
pub mod result;
pub mod signature;
pub mod validator;

pub mod error;

pub use config::TrustAnchorConfig;
pub use error::{CoreError, CoreResult};
pub use result::{SignatureVerification, ValidationResult};
pub use validator::PassValidator;
