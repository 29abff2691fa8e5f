//! Driver registration records and the drivers derived from them

use crate::registration::auth::digits_only;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_LICENSE_LEN: usize = 11;
pub const MIN_VEHICLE_DOCUMENT_LEN: usize = 5;
pub const ALLOWED_PHOTO_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

/// Metadata of the photo attached to a registration. The image itself is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoReference {
    pub name: String,
    pub size_bytes: u64,
    pub content_type: String,
}

/// What a driver fills in on the registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationInput {
    #[serde(default)]
    pub license_number: String,
    #[serde(default)]
    pub vehicle_document: String,
    #[serde(default)]
    pub photo: Option<PhotoReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationRecord {
    pub id: u64,
    pub license_number: String,
    pub vehicle_document: String,
    pub photo: PhotoReference,
    pub submitted_at: DateTime<Utc>,
    pub status: RegistrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

/// Login-eligible driver credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovedDriver {
    pub login_identifier: String,
    pub password: String,
    pub display_name: String,
    pub license_number: String,
    pub status: RegistrationStatus,
    pub rating: f32,
    pub total_rides: u32,
}

impl PhotoReference {
    pub fn new(name: impl Into<String>, size_bytes: u64, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            content_type: content_type.into(),
        }
    }

    /// Human readable size, e.g. `1.95 MB`.
    pub fn formatted_size(&self) -> String {
        const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
        if self.size_bytes == 0 {
            return "0 Bytes".to_string();
        }
        let mut size = self.size_bytes as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        let rounded = (size * 100.0).round() / 100.0;
        format!("{} {}", rounded, UNITS[unit])
    }
}

impl RegistrationInput {
    pub fn new(
        license_number: impl Into<String>,
        vehicle_document: impl Into<String>,
        photo: Option<PhotoReference>,
    ) -> Self {
        Self {
            license_number: license_number.into(),
            vehicle_document: vehicle_document.into(),
            photo,
        }
    }

    /// The administrator's canned test registration.
    pub fn sample() -> Self {
        Self::new(
            "12345678901",
            "CRLV-2024-001234",
            Some(PhotoReference::new("foto_mototaxista.jpg", 2_048_576, "image/jpeg")),
        )
    }

    pub fn validate(&self, max_photo_bytes: u64) -> Result<(), String> {
        let license = digits_only(&self.license_number);
        let document = self.vehicle_document.trim();
        let photo = self.photo.as_ref().filter(|p| !p.name.trim().is_empty());

        let Some(photo) = photo else {
            return Err("All fields are required".to_string());
        };
        if license.is_empty() || document.is_empty() {
            return Err("All fields are required".to_string());
        }
        if license.len() < MIN_LICENSE_LEN {
            return Err(format!(
                "License number must have at least {} digits",
                MIN_LICENSE_LEN
            ));
        }
        if document.chars().count() < MIN_VEHICLE_DOCUMENT_LEN {
            return Err(format!(
                "Vehicle document must have at least {} characters",
                MIN_VEHICLE_DOCUMENT_LEN
            ));
        }
        if photo.size_bytes > max_photo_bytes {
            return Err(format!(
                "Photo is too large: {} (max {} bytes)",
                photo.formatted_size(),
                max_photo_bytes
            ));
        }
        if !ALLOWED_PHOTO_TYPES.contains(&photo.content_type.to_ascii_lowercase().as_str()) {
            return Err(format!(
                "Unsupported photo type '{}' (expected JPG, PNG or GIF)",
                photo.content_type
            ));
        }
        Ok(())
    }
}

impl RegistrationRecord {
    pub(crate) fn pending(
        id: u64,
        license_number: &str,
        vehicle_document: &str,
        photo: PhotoReference,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            // Stored as digits only, the same form driver login compares against.
            license_number: digits_only(license_number),
            vehicle_document: vehicle_document.trim().to_string(),
            photo,
            submitted_at: now,
            status: RegistrationStatus::Pending,
            processed_at: None,
        }
    }
}

impl ApprovedDriver {
    pub fn from_registration(record: &RegistrationRecord, password: &str, rating: f32) -> Self {
        let chars: Vec<char> = record.license_number.chars().collect();
        let last_four: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        Self {
            login_identifier: record.license_number.clone(),
            password: password.to_string(),
            display_name: format!("Driver {}", last_four),
            license_number: record.license_number.clone(),
            status: RegistrationStatus::Approved,
            rating,
            total_rides: 0,
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationStatus::Pending => write!(f, "pending"),
            RegistrationStatus::Approved => write!(f, "approved"),
            RegistrationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::config::FIVE_MIB;

    fn jpeg(size: u64) -> Option<PhotoReference> {
        Some(PhotoReference::new("me.jpg", size, "image/jpeg"))
    }

    #[test]
    fn license_needs_eleven_digits() {
        let short = RegistrationInput::new("1234567890", "CRLV-1", jpeg(1024));
        assert!(short.validate(FIVE_MIB).is_err());

        let ok = RegistrationInput::new("12345678901", "CRLV-1", jpeg(1024));
        assert!(ok.validate(FIVE_MIB).is_ok());

        let punctuated = RegistrationInput::new("123.456.789-01", "CRLV-1", jpeg(1024));
        assert!(punctuated.validate(FIVE_MIB).is_ok());
    }

    #[test]
    fn letters_do_not_count_toward_the_license_length() {
        let input = RegistrationInput::new("ABC12345678", "CRLV-1", jpeg(1024));
        let err = input.validate(FIVE_MIB).unwrap_err();
        assert!(err.contains("11 digits"), "{err}");
    }

    #[test]
    fn pending_record_keeps_license_digits_only() {
        let photo = PhotoReference::new("foto.jpg", 10, "image/jpeg");
        let record = RegistrationRecord::pending(1, "123.456.789-01", "CRLV-1", photo, Utc::now());
        assert_eq!(record.license_number, "12345678901");
    }

    #[test]
    fn vehicle_document_needs_five_characters() {
        let input = RegistrationInput::new("12345678901", "CRLV", jpeg(1024));
        assert!(input.validate(FIVE_MIB).is_err());
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(RegistrationInput::new("", "CRLV-1", jpeg(1)).validate(FIVE_MIB).is_err());
        assert!(RegistrationInput::new("12345678901", "  ", jpeg(1)).validate(FIVE_MIB).is_err());
        assert!(RegistrationInput::new("12345678901", "CRLV-1", None).validate(FIVE_MIB).is_err());
    }

    #[test]
    fn photo_size_limit_applies_regardless_of_type() {
        let six_mib = 6 * 1024 * 1024;
        for kind in ["image/jpeg", "image/png", "application/pdf"] {
            let photo = Some(PhotoReference::new("p", six_mib, kind));
            let input = RegistrationInput::new("12345678901", "CRLV-1", photo);
            assert!(input.validate(FIVE_MIB).is_err(), "{kind} should fail");
        }

        let four_mib = RegistrationInput::new("12345678901", "CRLV-1", jpeg(4 * 1024 * 1024));
        assert!(four_mib.validate(FIVE_MIB).is_ok());

        let exactly_five = RegistrationInput::new("12345678901", "CRLV-1", jpeg(FIVE_MIB));
        assert!(exactly_five.validate(FIVE_MIB).is_ok());
    }

    #[test]
    fn photo_type_must_be_an_image() {
        let photo = Some(PhotoReference::new("doc.pdf", 100, "application/pdf"));
        let input = RegistrationInput::new("12345678901", "CRLV-1", photo);
        assert!(input.validate(FIVE_MIB).is_err());
    }

    #[test]
    fn derived_driver_uses_license_as_login() {
        let photo = PhotoReference::new("foto.jpg", 10, "image/jpeg");
        let record =
            RegistrationRecord::pending(1, " 12345678901 ", "CRLV-1", photo, Utc::now());
        let driver = ApprovedDriver::from_registration(&record, "123456", 4.5);

        assert_eq!(driver.login_identifier, "12345678901");
        assert_eq!(driver.display_name, "Driver 8901");
        assert_eq!(driver.status, RegistrationStatus::Approved);
        assert_eq!(driver.total_rides, 0);
    }

    #[test]
    fn formats_photo_sizes() {
        assert_eq!(PhotoReference::new("a", 0, "image/png").formatted_size(), "0 Bytes");
        assert_eq!(PhotoReference::new("a", 2048, "image/png").formatted_size(), "2 KB");
        assert_eq!(
            PhotoReference::new("a", 2_048_576, "image/png").formatted_size(),
            "1.95 MB"
        );
    }
}
