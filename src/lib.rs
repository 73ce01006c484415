//! # Keybridge
//!
//! Keybridge brokers OAuth2/OIDC client registrations held in an upstream
//! identity provider's admin service, layering two things the upstream does
//! not provide natively: ownership attribution for every registration and an
//! append-only audit trail of secret lifecycle events.
//!
//! ## Architecture
//!
//! ```text
//! Routing Layer (external) → OwnershipResolver / ClientRegistry / SecretLifecycle
//!                                   ↓                    ↓
//!                              TokenCache          Secret-event Ledger
//!                                   ↓                    ↓
//!                            Upstream IdP            SQLite
//! ```
//!
//! ## Core Components
//!
//! - **TokenCache**: caches the administrative bearer token with
//!   single-flight refresh
//! - **ClientRegistry**: CRUD proxy for upstream client registrations with
//!   creator attribution
//! - **OwnershipResolver**: claim/adopt protocol for pre-existing,
//!   unattributed registrations
//! - **SecretLifecycle / SecretLedger**: secret operations coordinated with
//!   the append-only audit ledger
//! - **IdentityExtractor**: resolves the acting principal from a trusted
//!   request header
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keybridge::config;
//! use keybridge::ledger::SecretLifecycle;
//! use keybridge::storage::{create_pool, SqlxSecretLedger};
//! use keybridge::upstream::{AdminChannel, ClientRegistry, TokenCache};
//!
//! #[tokio::main]
//! async fn main() -> keybridge::Result<()> {
//!     let config = config::load()?;
//!     keybridge::observability::init_tracing(&config.observability)?;
//!
//!     let pool = create_pool(&config.database).await?;
//!     let tokens = Arc::new(TokenCache::new(reqwest::Client::new(), config.upstream.clone()));
//!     let channel = AdminChannel::new(&config.upstream, tokens)?;
//!     let registry = Arc::new(ClientRegistry::new(channel));
//!     let _secrets = SecretLifecycle::new(registry, Arc::new(SqlxSecretLedger::new(pool)));
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod observability;
pub mod ownership;
pub mod storage;
pub mod upstream;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{ClaimCandidate, KeybridgeError, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
