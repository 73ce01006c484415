//! Repositories owning persisted state. The secret-event ledger is the only
//! table this crate owns.

pub mod secret_event;

pub use secret_event::{
    SecretAction, SecretEvent, SecretLedger, SqlxSecretLedger, SECRET_LAST4_LEN,
};
