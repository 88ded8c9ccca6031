//! Canonical wire contract for the consent ledger API.
//!
//! Zero dependencies on other consent-ledger crates, mirroring the
//! foundation-layer role `openibank-types` plays for OpeniBank.

pub mod contract;
pub mod error_code;
pub mod envelope;

pub use contract::*;
pub use envelope::*;
pub use error_code::ErrorCode;
