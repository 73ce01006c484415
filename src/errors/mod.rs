//! # Error Handling
//!
//! Typed errors for the keybridge broker using `thiserror`. Every upstream
//! HTTP failure is translated into one of these variants at the upstream
//! client boundary; raw transport errors never cross it.

/// Custom result type for keybridge operations
pub type Result<T> = std::result::Result<T, KeybridgeError>;

/// One registration in the candidate set of an ambiguous claim.
///
/// Carried by [`KeybridgeError::Ambiguous`] so the caller can re-issue the
/// claim with an unambiguous `clientId` selector.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ClaimCandidate {
    /// Upstream-assigned stable id.
    pub id: String,
    /// Human-chosen OAuth client_id.
    pub client_id: String,
    /// Display name, when the registration has one.
    pub name: Option<String>,
}

/// Main error type for the keybridge broker
#[derive(thiserror::Error, Debug)]
pub enum KeybridgeError {
    /// Admin token could not be obtained/refreshed, or upstream rejected it
    #[error("Authentication failure against upstream: {message}")]
    AuthFailure { message: String },

    /// No valid caller identity could be established for the request
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    /// No matching client/registration
    #[error("Resource not found: {resource_type} '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Duplicate clientId within a realm on create
    #[error("Resource conflict: {message}")]
    AlreadyExists { message: String },

    /// A claim-by-name matched more than one registration
    #[error("Claim matched {} registrations; re-issue with a clientId selector", .candidates.len())]
    Ambiguous { candidates: Vec<ClaimCandidate> },

    /// Network failure or 5xx from the upstream identity provider
    #[error("Upstream identity provider unavailable: {message}")]
    UpstreamUnavailable { message: String },

    /// An audit row could not be persisted
    #[error("Ledger write failed: {context}")]
    LedgerWriteFailure {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Database and storage errors outside the append path
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl KeybridgeError {
    /// Create an upstream authentication failure
    pub fn auth_failure<S: Into<String>>(message: S) -> Self {
        Self::AuthFailure { message: message.into() }
    }

    /// Create an unauthenticated-caller error
    pub fn unauthenticated<S: Into<String>>(message: S) -> Self {
        Self::Unauthenticated { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create a conflict error
    pub fn already_exists<S: Into<String>>(message: S) -> Self {
        Self::AlreadyExists { message: message.into() }
    }

    /// Create an ambiguous-claim error carrying the full candidate set
    pub fn ambiguous(candidates: Vec<ClaimCandidate>) -> Self {
        Self::Ambiguous { candidates }
    }

    /// Create an upstream-unavailable error
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::UpstreamUnavailable { message: message.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create a ledger write failure with context
    pub fn ledger<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::LedgerWriteFailure { source, context: context.into() }
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            KeybridgeError::AuthFailure { .. } => 502,
            KeybridgeError::Unauthenticated { .. } => 401,
            KeybridgeError::NotFound { .. } => 404,
            KeybridgeError::AlreadyExists { .. } => 409,
            KeybridgeError::Ambiguous { .. } => 422,
            KeybridgeError::UpstreamUnavailable { .. } => 502,
            KeybridgeError::LedgerWriteFailure { .. } => 500,
            KeybridgeError::Database { .. } => 500,
            KeybridgeError::Serialization { .. } => 400,
            KeybridgeError::Validation { .. } => 400,
            KeybridgeError::Config { .. } => 500,
            KeybridgeError::Internal { .. } => 500,
        }
    }

    /// Check if the caller can recover by re-issuing the operation
    /// with different input (as opposed to waiting or escalating)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KeybridgeError::Ambiguous { .. }
                | KeybridgeError::AlreadyExists { .. }
                | KeybridgeError::Validation { .. }
        )
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for KeybridgeError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<serde_json::Error> for KeybridgeError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

// reqwest errors are deliberately not convertible here: the upstream channel
// and the token cache classify each transport failure at the call site, and
// a token-endpoint failure must become AuthFailure, not UpstreamUnavailable.

impl From<validator::ValidationErrors> for KeybridgeError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(KeybridgeError::auth_failure("token endpoint down").status_code(), 502);
        assert_eq!(KeybridgeError::unauthenticated("no header").status_code(), 401);
        assert_eq!(KeybridgeError::not_found("client", "svc-a").status_code(), 404);
        assert_eq!(KeybridgeError::already_exists("duplicate clientId").status_code(), 409);
        assert_eq!(KeybridgeError::ambiguous(vec![]).status_code(), 422);
        assert_eq!(KeybridgeError::upstream("503 from IdP").status_code(), 502);
        assert_eq!(KeybridgeError::validation("bad input").status_code(), 400);
    }

    #[test]
    fn test_ambiguous_carries_candidates() {
        let error = KeybridgeError::ambiguous(vec![
            ClaimCandidate {
                id: "a".into(),
                client_id: "svc-a".into(),
                name: Some("shared".into()),
            },
            ClaimCandidate {
                id: "b".into(),
                client_id: "svc-b".into(),
                name: Some("shared".into()),
            },
        ]);

        assert!(error.is_recoverable());
        if let KeybridgeError::Ambiguous { candidates } = &error {
            assert_eq!(candidates.len(), 2);
        } else {
            panic!("expected Ambiguous");
        }
        assert!(error.to_string().contains("2 registrations"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(KeybridgeError::already_exists("dup").is_recoverable());
        assert!(!KeybridgeError::upstream("down").is_recoverable());
        assert!(!KeybridgeError::auth_failure("rejected").is_recoverable());
    }

    #[test]
    fn test_error_conversions() {
        let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let error: KeybridgeError = json_error.into();
        assert!(matches!(error, KeybridgeError::Serialization { .. }));
    }
}
