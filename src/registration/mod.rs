//! Driver registration approval, passenger accounts and login sessions

pub mod approval_store;
pub mod auth;
pub mod config;
pub mod error;
pub mod passenger_directory;
pub mod registration_record;
pub mod registry;
pub mod storage;

pub use approval_store::{RegistrationApprovalStore, RegistrationStats};
pub use auth::{Role, Session, SessionStore};
pub use config::RegistryConfig;
pub use error::{AuthError, RegistrationError, StorageError};
pub use passenger_directory::{PassengerAccount, PassengerAccountStore};
pub use registration_record::{
    ApprovedDriver, PhotoReference, RegistrationInput, RegistrationRecord, RegistrationStatus,
};
pub use registry::Registry;
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
