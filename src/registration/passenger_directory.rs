//! Passenger accounts keyed by phone number (digits only)

use crate::registration::auth::digits_only;
use crate::registration::error::{AuthError, RegistrationError, StorageError};
use crate::registration::storage::{self, KeyValueStore};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const PASSENGERS_KEY: &str = "passengers";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassengerAccount {
    pub phone: String,
    pub password: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PassengerAccountStore {
    accounts: Vec<PassengerAccount>,
}

impl PassengerAccountStore {
    /// `Ok(None)` when nothing has been stored yet.
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StorageError> {
        storage::load_document(store, PASSENGERS_KEY)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        storage::save_document(store, PASSENGERS_KEY, self)
    }

    pub fn with_demo_passengers() -> Self {
        let demo = |phone: &str, password: &str, name: &str| PassengerAccount {
            phone: phone.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            active: true,
        };
        Self {
            accounts: vec![
                demo("11999999999", "123456", "João Silva"),
                demo("11888888888", "senha123", "Maria Santos"),
            ],
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        phone: &str,
        password: &str,
        active: bool,
    ) -> Result<PassengerAccount, RegistrationError> {
        let (name, phone, password) = (name.trim(), phone.trim(), password.trim());
        if name.is_empty() || phone.is_empty() || password.is_empty() {
            return Err(RegistrationError::ValidationError(
                "All fields are required".to_string(),
            ));
        }

        let phone = digits_only(phone);
        if phone.is_empty() {
            return Err(RegistrationError::ValidationError(
                "Phone number must contain digits".to_string(),
            ));
        }
        if self.find(&phone).is_some() {
            return Err(RegistrationError::DuplicatePhone(phone));
        }

        let account = PassengerAccount {
            phone,
            password: password.to_string(),
            name: name.to_string(),
            active,
        };
        self.accounts.push(account.clone());

        info!("Registered passenger '{}' ({})", account.name, account.phone);
        Ok(account)
    }

    pub fn authenticate(&self, phone: &str, password: &str) -> Result<PassengerAccount, AuthError> {
        let account = self
            .find(&digits_only(phone))
            .ok_or(AuthError::NotRegistered)?;

        if account.password != password {
            return Err(AuthError::WrongPassword);
        }
        if !account.active {
            return Err(AuthError::Inactive);
        }
        Ok(account.clone())
    }

    pub fn find(&self, phone: &str) -> Option<&PassengerAccount> {
        self.accounts.iter().find(|a| a.phone == phone)
    }

    pub fn accounts(&self) -> &[PassengerAccount] {
        &self.accounts
    }
}
