//! Registry handle: one key-value backend plus the stores loaded from it.
//! Every mutation runs on a copy of the affected store. The copy replaces the
//! live store only once it has been written back, so a failed save changes nothing.

use crate::registration::approval_store::{RegistrationApprovalStore, RegistrationStats};
use crate::registration::auth::{Role, Session, SessionStore};
use crate::registration::config::RegistryConfig;
use crate::registration::error::RegistrationError;
use crate::registration::passenger_directory::{PassengerAccount, PassengerAccountStore};
use crate::registration::registration_record::{
    ApprovedDriver, RegistrationInput, RegistrationRecord,
};
use crate::registration::storage::{FileKeyValueStore, KeyValueStore};
use tracing::{info, warn};

pub struct Registry {
    backend: Box<dyn KeyValueStore>,
    config: RegistryConfig,
    registrations: RegistrationApprovalStore,
    passengers: PassengerAccountStore,
    sessions: SessionStore,
}

impl Registry {
    pub fn open(
        mut backend: Box<dyn KeyValueStore>,
        config: RegistryConfig,
    ) -> Result<Self, RegistrationError> {
        let seed = config.seed_demo_accounts;

        let registrations = match RegistrationApprovalStore::load(backend.as_ref())? {
            Some(store) => store,
            None if seed => {
                let store = RegistrationApprovalStore::with_demo_drivers();
                store.save(backend.as_mut())?;
                info!("Seeded demo drivers");
                store
            }
            None => RegistrationApprovalStore::default(),
        };

        let passengers = match PassengerAccountStore::load(backend.as_ref())? {
            Some(store) => store,
            None if seed => {
                let store = PassengerAccountStore::with_demo_passengers();
                store.save(backend.as_mut())?;
                info!("Seeded demo passengers");
                store
            }
            None => PassengerAccountStore::default(),
        };

        let sessions = SessionStore::load(backend.as_ref())?;

        Ok(Self {
            backend,
            config,
            registrations,
            passengers,
            sessions,
        })
    }

    /// Opens the JSON file named by `config.data_path`.
    pub fn open_file(config: RegistryConfig) -> Result<Self, RegistrationError> {
        let backend = FileKeyValueStore::open(&config.data_path)?;
        Self::open(Box::new(backend), config)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn submit_registration(
        &mut self,
        input: RegistrationInput,
    ) -> Result<RegistrationRecord, RegistrationError> {
        self.update_registrations(|store, config| store.submit(input, config))
    }

    /// Adds the canned test registration used to demo the approval queue.
    pub fn add_sample_registration(&mut self) -> Result<RegistrationRecord, RegistrationError> {
        self.submit_registration(RegistrationInput::sample())
    }

    pub fn pending_registrations(&self) -> &[RegistrationRecord] {
        self.registrations.list_pending()
    }

    pub fn approved_registrations(&self) -> &[RegistrationRecord] {
        self.registrations.list_approved()
    }

    pub fn rejected_registrations(&self) -> &[RegistrationRecord] {
        self.registrations.list_rejected()
    }

    pub fn stats(&self) -> RegistrationStats {
        self.registrations.stats()
    }

    pub fn approve(&mut self, id: u64) -> Result<ApprovedDriver, RegistrationError> {
        self.update_registrations(|store, config| store.approve(id, config))
    }

    pub fn reject(&mut self, id: u64) -> Result<RegistrationRecord, RegistrationError> {
        self.update_registrations(|store, _| store.reject(id))
    }

    pub fn register_passenger(
        &mut self,
        name: &str,
        phone: &str,
        password: &str,
    ) -> Result<PassengerAccount, RegistrationError> {
        let mut passengers = self.passengers.clone();
        let account = passengers.register(
            name,
            phone,
            password,
            self.config.passenger_active_by_default,
        )?;
        passengers.save(self.backend.as_mut())?;
        self.passengers = passengers;
        Ok(account)
    }

    pub fn login_driver(
        &mut self,
        login_identifier: &str,
        password: &str,
    ) -> Result<Session, RegistrationError> {
        let (login_identifier, password) = required_credentials(login_identifier, password)?;
        let driver = self
            .registrations
            .authenticate_driver(login_identifier, password)
            .inspect_err(|e| warn!("Driver login refused for '{}': {}", login_identifier, e))?;

        self.start_session(Session::for_driver(&driver))
    }

    pub fn login_passenger(
        &mut self,
        phone: &str,
        password: &str,
    ) -> Result<Session, RegistrationError> {
        let (phone, password) = required_credentials(phone, password)?;
        let account = self
            .passengers
            .authenticate(phone, password)
            .inspect_err(|e| warn!("Passenger login refused for '{}': {}", phone, e))?;

        self.start_session(Session::for_passenger(&account))
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.sessions.current()
    }

    pub fn require_session(&self, role: Role) -> Result<&Session, RegistrationError> {
        self.sessions.require(role)
    }

    pub fn logout(&mut self) -> Result<Option<Session>, RegistrationError> {
        let mut sessions = self.sessions.clone();
        let ended = sessions.clear();
        if let Some(session) = &ended {
            sessions.save(self.backend.as_mut())?;
            self.sessions = sessions;
            info!("{} '{}' logged out", session.role, session.name);
        }
        Ok(ended)
    }

    fn start_session(&mut self, session: Session) -> Result<Session, RegistrationError> {
        let mut sessions = self.sessions.clone();
        let session = sessions.start(session).clone();
        sessions.save(self.backend.as_mut())?;
        self.sessions = sessions;
        info!("{} '{}' logged in", session.role, session.name);
        Ok(session)
    }

    fn update_registrations<T, F>(&mut self, change: F) -> Result<T, RegistrationError>
    where
        F: FnOnce(&mut RegistrationApprovalStore, &RegistryConfig) -> Result<T, RegistrationError>,
    {
        let mut registrations = self.registrations.clone();
        let outcome = change(&mut registrations, &self.config)?;
        registrations.save(self.backend.as_mut())?;
        self.registrations = registrations;
        Ok(outcome)
    }
}

fn required_credentials<'a>(
    login: &'a str,
    password: &'a str,
) -> Result<(&'a str, &'a str), RegistrationError> {
    let (login, password) = (login.trim(), password.trim());
    if login.is_empty() || password.is_empty() {
        return Err(RegistrationError::ValidationError(
            "All fields are required".to_string(),
        ));
    }
    Ok((login, password))
}
