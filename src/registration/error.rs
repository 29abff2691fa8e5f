//! Error types for driver and passenger registration

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Registration not found: {0}")]
    NotFound(u64),

    #[error("Phone already registered: {0}")]
    DuplicatePhone(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("No active {0} session")]
    NotLoggedIn(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Reasons a login attempt is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not registered or not approved")]
    NotRegistered,

    #[error("Registration is still under review")]
    PendingApproval,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Registration has not been approved")]
    NotApproved,

    #[error("Account is inactive")]
    Inactive,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt data under key '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported schema version {found} under key '{key}' (expected {expected})")]
    UnsupportedSchema { key: String, found: u64, expected: u32 },

    #[error("Failed to encode data for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RegistrationError {
    /// Short machine-readable code used by the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            RegistrationError::ValidationError(_) => "VALIDATION_ERROR",
            RegistrationError::NotFound(_) => "NOT_FOUND",
            RegistrationError::DuplicatePhone(_) => "DUPLICATE_PHONE",
            RegistrationError::Auth(AuthError::NotRegistered) => "NOT_REGISTERED",
            RegistrationError::Auth(AuthError::PendingApproval) => "PENDING_APPROVAL",
            RegistrationError::Auth(AuthError::WrongPassword) => "WRONG_PASSWORD",
            RegistrationError::Auth(AuthError::NotApproved) => "NOT_APPROVED",
            RegistrationError::Auth(AuthError::Inactive) => "INACTIVE",
            RegistrationError::NotLoggedIn(_) => "NOT_LOGGED_IN",
            RegistrationError::Storage(_) => "STORAGE_ERROR",
            RegistrationError::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}
