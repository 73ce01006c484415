//! # Caller identity
//!
//! Resolution of the acting principal from an inbound request. The broker
//! never validates credentials itself; it trusts the identity the fronting
//! layer established and only needs a stable identifier for attribution and
//! audit.

pub mod identity;

pub use identity::{HeaderIdentity, IdentityExtractor};
