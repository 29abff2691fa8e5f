//! Driver registration approval queue
//! pending --approve--> approved, pending --reject--> rejected. Both end states are final.

use crate::registration::auth::digits_only;
use crate::registration::config::RegistryConfig;
use crate::registration::error::{AuthError, RegistrationError, StorageError};
use crate::registration::registration_record::{
    ApprovedDriver, RegistrationInput, RegistrationRecord, RegistrationStatus,
};
use crate::registration::storage::{self, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const REGISTRATIONS_KEY: &str = "registrations";

/// Owns the three disjoint registration collections and the drivers allowed to log in.
/// Approval updates both in one call, and they are persisted as one document.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegistrationApprovalStore {
    pending: Vec<RegistrationRecord>,
    approved: Vec<RegistrationRecord>,
    rejected: Vec<RegistrationRecord>,
    drivers: Vec<ApprovedDriver>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationStats {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl RegistrationApprovalStore {
    /// `Ok(None)` when nothing has been stored yet.
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StorageError> {
        storage::load_document(store, REGISTRATIONS_KEY)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        storage::save_document(store, REGISTRATIONS_KEY, self)
    }

    /// Store pre-filled with the two demo drivers.
    pub fn with_demo_drivers() -> Self {
        let demo = |phone: &str, password: &str, name: &str, cnh: &str, rating: f32, rides: u32| {
            ApprovedDriver {
                login_identifier: phone.to_string(),
                password: password.to_string(),
                display_name: name.to_string(),
                license_number: cnh.to_string(),
                status: RegistrationStatus::Approved,
                rating,
                total_rides: rides,
            }
        };
        Self {
            drivers: vec![
                demo("11999999999", "123456", "João Silva", "12345678901", 4.8, 150),
                demo("11888888888", "senha123", "Maria Santos", "98765432109", 4.9, 200),
            ],
            ..Self::default()
        }
    }

    pub fn submit(
        &mut self,
        input: RegistrationInput,
        config: &RegistryConfig,
    ) -> Result<RegistrationRecord, RegistrationError> {
        self.submit_at(input, config, Utc::now())
    }

    pub fn submit_at(
        &mut self,
        input: RegistrationInput,
        config: &RegistryConfig,
        now: DateTime<Utc>,
    ) -> Result<RegistrationRecord, RegistrationError> {
        input
            .validate(config.max_photo_bytes)
            .map_err(RegistrationError::ValidationError)?;
        let photo = input
            .photo
            .ok_or_else(|| RegistrationError::ValidationError("All fields are required".into()))?;

        let id = self.next_id(now);
        let record = RegistrationRecord::pending(
            id,
            &input.license_number,
            &input.vehicle_document,
            photo,
            now,
        );
        self.pending.push(record.clone());

        info!(
            "Registration {} submitted for license {}",
            record.id, record.license_number
        );
        Ok(record)
    }

    pub fn list_pending(&self) -> &[RegistrationRecord] {
        &self.pending
    }

    pub fn list_approved(&self) -> &[RegistrationRecord] {
        &self.approved
    }

    pub fn list_rejected(&self) -> &[RegistrationRecord] {
        &self.rejected
    }

    pub fn approved_drivers(&self) -> &[ApprovedDriver] {
        &self.drivers
    }

    pub fn find(&self, id: u64) -> Option<&RegistrationRecord> {
        self.pending
            .iter()
            .chain(&self.approved)
            .chain(&self.rejected)
            .find(|r| r.id == id)
    }

    pub fn stats(&self) -> RegistrationStats {
        RegistrationStats {
            pending: self.pending.len(),
            approved: self.approved.len(),
            rejected: self.rejected.len(),
        }
    }

    /// Moves a pending registration to approved and derives its login credential.
    pub fn approve(
        &mut self,
        id: u64,
        config: &RegistryConfig,
    ) -> Result<ApprovedDriver, RegistrationError> {
        let mut record = self.take_pending(id)?;
        record.status = RegistrationStatus::Approved;
        record.processed_at = Some(Utc::now());

        let driver = ApprovedDriver::from_registration(
            &record,
            &config.default_driver_password,
            config.default_driver_rating,
        );
        self.approved.push(record);
        self.drivers.push(driver.clone());

        info!("Registration {} approved, driver '{}' can log in", id, driver.login_identifier);
        Ok(driver)
    }

    pub fn reject(&mut self, id: u64) -> Result<RegistrationRecord, RegistrationError> {
        let mut record = self.take_pending(id)?;
        record.status = RegistrationStatus::Rejected;
        record.processed_at = Some(Utc::now());
        self.rejected.push(record.clone());

        info!("Registration {} rejected", id);
        Ok(record)
    }

    pub fn authenticate_driver(
        &self,
        login_identifier: &str,
        password: &str,
    ) -> Result<ApprovedDriver, AuthError> {
        let login = digits_only(login_identifier);

        let Some(driver) = self.drivers.iter().find(|d| d.login_identifier == login) else {
            if self.pending.iter().any(|r| r.license_number == login) {
                return Err(AuthError::PendingApproval);
            }
            return Err(AuthError::NotRegistered);
        };

        if driver.password != password {
            return Err(AuthError::WrongPassword);
        }
        if driver.status != RegistrationStatus::Approved {
            return Err(AuthError::NotApproved);
        }
        Ok(driver.clone())
    }

    fn take_pending(&mut self, id: u64) -> Result<RegistrationRecord, RegistrationError> {
        let index = self
            .pending
            .iter()
            .position(|r| r.id == id)
            .ok_or(RegistrationError::NotFound(id))?;
        Ok(self.pending.remove(index))
    }

    /// Millisecond timestamp, bumped past the largest id already in use.
    fn next_id(&self, now: DateTime<Utc>) -> u64 {
        let candidate = now.timestamp_millis().max(0) as u64;
        let highest = self
            .pending
            .iter()
            .chain(&self.approved)
            .chain(&self.rejected)
            .map(|r| r.id)
            .max();
        match highest {
            Some(highest) if candidate <= highest => highest + 1,
            _ => candidate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::registration_record::PhotoReference;
    use crate::registration::storage::MemoryKeyValueStore;
    use std::collections::HashSet;

    fn input(license: &str) -> RegistrationInput {
        RegistrationInput::new(
            license,
            "CRLV-2024-001234",
            Some(PhotoReference::new("foto.jpg", 4 * 1024 * 1024, "image/jpeg")),
        )
    }

    #[test]
    fn submissions_are_pending_with_unique_ids() {
        let config = RegistryConfig::default();
        let mut store = RegistrationApprovalStore::default();
        let now = Utc::now();

        let mut ids = HashSet::new();
        for _ in 0..5 {
            // Same instant on purpose, ids must still differ.
            let record = store.submit_at(input("12345678901"), &config, now).unwrap();
            assert_eq!(record.status, RegistrationStatus::Pending);
            assert!(ids.insert(record.id));
        }
        assert_eq!(store.list_pending().len(), 5);
    }

    #[test]
    fn ids_stay_unique_after_records_leave_pending() {
        let config = RegistryConfig::default();
        let mut store = RegistrationApprovalStore::default();
        let now = Utc::now();

        let first = store.submit_at(input("12345678901"), &config, now).unwrap();
        store.approve(first.id, &config).unwrap();
        let second = store.submit_at(input("12345678901"), &config, now).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn invalid_submission_leaves_store_untouched() {
        let config = RegistryConfig::default();
        let mut store = RegistrationApprovalStore::default();

        let err = store.submit(input("1234567890"), &config).unwrap_err();
        assert!(matches!(err, RegistrationError::ValidationError(_)));
        assert!(store.list_pending().is_empty());

        assert!(store.submit(input("12345678901"), &config).is_ok());
    }

    #[test]
    fn approve_moves_record_and_enables_login() {
        let config = RegistryConfig::default();
        let mut store = RegistrationApprovalStore::default();
        let record = store.submit(input("12345678901"), &config).unwrap();

        assert_eq!(
            store.authenticate_driver("12345678901", "123456"),
            Err(AuthError::PendingApproval)
        );

        let driver = store.approve(record.id, &config).unwrap();
        assert_eq!(driver.rating, 4.5);

        assert!(store.list_pending().iter().all(|r| r.id != record.id));
        let approved = store.find(record.id).unwrap();
        assert_eq!(approved.status, RegistrationStatus::Approved);
        assert!(approved.processed_at.is_some());
        assert_eq!(store.list_approved().len(), 1);

        let logged_in = store.authenticate_driver("12345678901", "123456").unwrap();
        assert_eq!(logged_in.license_number, "12345678901");
    }

    #[test]
    fn punctuated_license_logs_in_after_approval() {
        let config = RegistryConfig::default();
        let mut store = RegistrationApprovalStore::default();
        let record = store.submit(input("123.456.789-01"), &config).unwrap();
        assert_eq!(record.license_number, "12345678901");

        assert_eq!(
            store.authenticate_driver("123.456.789-01", "123456"),
            Err(AuthError::PendingApproval)
        );

        let driver = store.approve(record.id, &config).unwrap();
        assert_eq!(driver.login_identifier, "12345678901");
        assert!(store.authenticate_driver("123.456.789-01", "123456").is_ok());
        assert!(store.authenticate_driver("12345678901", "123456").is_ok());
    }

    #[test]
    fn license_with_letters_is_not_accepted() {
        let config = RegistryConfig::default();
        let mut store = RegistrationApprovalStore::default();

        let err = store.submit(input("ABC12345678"), &config).unwrap_err();
        assert!(matches!(err, RegistrationError::ValidationError(_)));
        assert!(store.list_pending().is_empty());
    }

    #[test]
    fn approving_twice_does_not_duplicate_the_driver() {
        let config = RegistryConfig::default();
        let mut store = RegistrationApprovalStore::default();
        let record = store.submit(input("12345678901"), &config).unwrap();

        store.approve(record.id, &config).unwrap();
        let err = store.approve(record.id, &config).unwrap_err();

        assert!(matches!(err, RegistrationError::NotFound(id) if id == record.id));
        assert_eq!(store.approved_drivers().len(), 1);
        assert_eq!(store.list_approved().len(), 1);
    }

    #[test]
    fn reject_moves_record_without_deriving_a_driver() {
        let config = RegistryConfig::default();
        let mut store = RegistrationApprovalStore::default();
        let record = store.submit(input("12345678901"), &config).unwrap();

        let rejected = store.reject(record.id).unwrap();
        assert_eq!(rejected.status, RegistrationStatus::Rejected);
        assert!(store.list_pending().is_empty());
        assert_eq!(store.list_rejected(), &[rejected]);
        assert!(store.approved_drivers().is_empty());

        assert!(store.approve(record.id, &config).is_err());
        assert_eq!(
            store.authenticate_driver("12345678901", "123456"),
            Err(AuthError::NotRegistered)
        );
    }

    #[test]
    fn unknown_id_is_not_found() {
        let mut store = RegistrationApprovalStore::default();
        assert!(matches!(store.reject(42), Err(RegistrationError::NotFound(42))));
    }

    #[test]
    fn driver_login_errors_are_distinct() {
        let store = RegistrationApprovalStore::with_demo_drivers();

        assert_eq!(
            store.authenticate_driver("00000000000", "x"),
            Err(AuthError::NotRegistered)
        );
        assert_eq!(
            store.authenticate_driver("11999999999", "wrong"),
            Err(AuthError::WrongPassword)
        );
        let driver = store
            .authenticate_driver("(11) 99999-9999", "123456")
            .unwrap();
        assert_eq!(driver.display_name, "João Silva");
    }

    #[test]
    fn non_approved_driver_cannot_log_in() {
        let mut store = RegistrationApprovalStore::with_demo_drivers();
        store.drivers[0].status = RegistrationStatus::Pending;

        assert_eq!(
            store.authenticate_driver("11999999999", "123456"),
            Err(AuthError::NotApproved)
        );
    }

    #[test]
    fn duplicate_license_submissions_are_kept() {
        let config = RegistryConfig::default();
        let mut store = RegistrationApprovalStore::default();
        store.submit(input("12345678901"), &config).unwrap();
        store.submit(input("12345678901"), &config).unwrap();

        assert_eq!(store.stats().pending, 2);
    }

    #[test]
    fn stats_count_each_collection() {
        let config = RegistryConfig::default();
        let mut store = RegistrationApprovalStore::default();
        let a = store.submit(input("11111111111"), &config).unwrap();
        let b = store.submit(input("22222222222"), &config).unwrap();
        store.submit(input("33333333333"), &config).unwrap();
        store.approve(a.id, &config).unwrap();
        store.reject(b.id).unwrap();

        assert_eq!(
            store.stats(),
            RegistrationStats {
                pending: 1,
                approved: 1,
                rejected: 1
            }
        );
    }

    #[test]
    fn approval_is_saved_as_one_document() {
        let config = RegistryConfig::default();
        let mut backend = MemoryKeyValueStore::default();
        let mut store = RegistrationApprovalStore::default();
        let record = store.submit(input("12345678901"), &config).unwrap();
        store.approve(record.id, &config).unwrap();
        store.save(&mut backend).unwrap();

        let reloaded = RegistrationApprovalStore::load(&backend).unwrap().unwrap();
        assert!(reloaded.list_pending().is_empty());
        assert_eq!(reloaded.list_approved().len(), 1);
        assert_eq!(reloaded.approved_drivers().len(), 1);
    }
}
