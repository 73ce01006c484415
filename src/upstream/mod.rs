//! # Upstream Admin API
//!
//! Everything that talks to the upstream identity provider's admin service:
//! admin token acquisition and caching, the authenticated HTTP channel, and
//! the client-registration proxy.

pub mod http;
pub mod registry;
pub mod token;

pub use http::AdminChannel;
pub use registry::{
    ClientRegistration, ClientRegistry, ATTR_CREATED_BY, ATTR_CREATED_BY_TAG, ATTR_INHERITED_AT,
    ATTR_INHERITED_BY,
};
pub use token::TokenCache;
