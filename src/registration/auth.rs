//! Login sessions ("currently logged in" record)

use crate::registration::error::{RegistrationError, StorageError};
use crate::registration::passenger_directory::PassengerAccount;
use crate::registration::registration_record::ApprovedDriver;
use crate::registration::storage::{self, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_KEY: &str = "session";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Passenger,
    Driver,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub session_id: Uuid,
    pub role: Role,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rides: Option<u32>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SessionStore {
    session: Option<Session>,
}

/// Strips everything but ASCII digits, so `(11) 99999-9999` becomes `11999999999`.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

impl Session {
    pub fn for_driver(driver: &ApprovedDriver) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            role: Role::Driver,
            name: driver.display_name.clone(),
            phone: driver.login_identifier.clone(),
            license_number: Some(driver.license_number.clone()),
            rating: Some(driver.rating),
            total_rides: Some(driver.total_rides),
            started_at: Utc::now(),
        }
    }

    pub fn for_passenger(account: &PassengerAccount) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            role: Role::Passenger,
            name: account.name.clone(),
            phone: account.phone.clone(),
            license_number: None,
            rating: None,
            total_rides: None,
            started_at: Utc::now(),
        }
    }
}

impl SessionStore {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, StorageError> {
        Ok(storage::load_document(store, SESSION_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        storage::save_document(store, SESSION_KEY, self)
    }

    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Replaces whatever session was active.
    pub fn start(&mut self, session: Session) -> &Session {
        self.session.insert(session)
    }

    /// Returns the active session only if it belongs to `role`.
    pub fn require(&self, role: Role) -> Result<&Session, RegistrationError> {
        match &self.session {
            Some(session) if session.role == role => Ok(session),
            _ => Err(RegistrationError::NotLoggedIn(role.to_string())),
        }
    }

    pub fn clear(&mut self) -> Option<Session> {
        self.session.take()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Passenger => write!(f, "passenger"),
            Role::Driver => write!(f, "driver"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::storage::MemoryKeyValueStore;

    fn passenger() -> PassengerAccount {
        PassengerAccount {
            phone: "11999999999".to_string(),
            password: "123456".to_string(),
            name: "João Silva".to_string(),
            active: true,
        }
    }

    #[test]
    fn digits_only_strips_formatting() {
        assert_eq!(digits_only("(11) 99999-9999"), "11999999999");
        assert_eq!(digits_only("abc"), "");
    }

    #[test]
    fn require_checks_the_role() {
        let mut sessions = SessionStore::default();
        assert!(sessions.require(Role::Passenger).is_err());

        sessions.start(Session::for_passenger(&passenger()));
        assert!(sessions.require(Role::Passenger).is_ok());
        assert!(matches!(
            sessions.require(Role::Driver),
            Err(RegistrationError::NotLoggedIn(_))
        ));
    }

    #[test]
    fn session_survives_save_and_load() {
        let mut backend = MemoryKeyValueStore::default();
        let mut sessions = SessionStore::default();
        let started = sessions.start(Session::for_passenger(&passenger())).clone();
        sessions.save(&mut backend).unwrap();

        let reloaded = SessionStore::load(&backend).unwrap();
        assert_eq!(reloaded.current(), Some(&started));
    }

    #[test]
    fn logout_clears_the_session() {
        let mut sessions = SessionStore::default();
        sessions.start(Session::for_passenger(&passenger()));
        assert!(sessions.clear().is_some());
        assert!(sessions.current().is_none());
        assert!(sessions.clear().is_none());
    }
}
