//! Represents a pet listed for adoption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

pub const NAME_MAX_LEN: usize = 100;
pub const BREED_MAX_LEN: usize = 100;
pub const AGE_MAX: i64 = 30;

/// A single adoptable animal.
///
/// Rows are ordered newest first everywhere they are listed; `id` breaks ties
/// between rows created within the same instant.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Pet {
    /// Store-assigned identifier, never reused.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Free-text breed, e.g. "Golden Retriever".
    pub breed: String,

    /// Age in whole years.
    pub age: u32,

    pub description: String,

    /// Whether the pet has already found a home.
    pub adopted: bool,

    /// Path of the uploaded photo relative to the media root.
    pub image: Option<String>,

    /// Set once on insert.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation.
    pub updated_at: DateTime<Utc>,
}

impl Pet {
    pub fn is_available(&self) -> bool {
        !self.adopted
    }

    /// Human readable adoption status, as shown next to the toggle.
    pub fn status_text(&self) -> &'static str {
        if self.is_available() { "Available" } else { "Adopted" }
    }
}

impl fmt::Display for Pet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.breed)
    }
}

/// Validated, storable pet fields (everything except identity and timestamps).
#[derive(Clone, Debug, PartialEq)]
pub struct PetFields {
    pub name: String,
    pub breed: String,
    pub age: u32,
    pub description: String,
    pub adopted: bool,
}

impl PetFields {
    pub fn new(name: &str, breed: &str, age: u32, description: &str) -> Self {
        Self {
            name: name.to_string(),
            breed: breed.to_string(),
            age,
            description: description.to_string(),
            adopted: false,
        }
    }
}

/// Raw create/edit payload as submitted by staff.
///
/// `age` is signed so a negative value reaches validation instead of failing
/// deserialization.
#[derive(Deserialize, Debug, Clone)]
pub struct PetForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub breed: String,
    pub age: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub adopted: bool,
}

impl PetForm {
    /// Check field constraints, collecting every violation.
    pub fn validate(self) -> Result<PetFields, Vec<String>> {
        let mut errors = Vec::new();
        let name = self.name.trim().to_string();
        let breed = self.breed.trim().to_string();
        let description = self.description.trim().to_string();

        if name.is_empty() {
            errors.push("name: this field is required".to_string());
        } else if name.chars().count() > NAME_MAX_LEN {
            errors.push(format!("name: at most {NAME_MAX_LEN} characters"));
        }

        if breed.is_empty() {
            errors.push("breed: this field is required".to_string());
        } else if breed.chars().count() > BREED_MAX_LEN {
            errors.push(format!("breed: at most {BREED_MAX_LEN} characters"));
        }

        if !(0..=AGE_MAX).contains(&self.age) {
            errors.push(format!("age: must be between 0 and {AGE_MAX}"));
        }

        if description.is_empty() {
            errors.push("description: this field is required".to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(PetFields {
            name,
            breed,
            age: self.age as u32,
            description,
            adopted: self.adopted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, breed: &str, age: i64, description: &str) -> PetForm {
        PetForm {
            name: name.into(),
            breed: breed.into(),
            age,
            description: description.into(),
            adopted: false,
        }
    }

    #[test]
    fn valid_form_is_trimmed() {
        let fields = form("  Buddy ", "Beagle", 3, " Loves walks. ")
            .validate()
            .unwrap();
        assert_eq!(fields.name, "Buddy");
        assert_eq!(fields.description, "Loves walks.");
        assert_eq!(fields.age, 3);
        assert!(!fields.adopted);
    }

    #[test]
    fn negative_age_and_empty_name_are_rejected_together() {
        let errors = form("   ", "Beagle", -1, "desc").validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.starts_with("name")));
        assert!(errors.iter().any(|e| e.starts_with("age")));
    }

    #[test]
    fn overlong_breed_is_rejected() {
        let errors = form("Rex", &"x".repeat(101), 2, "desc")
            .validate()
            .unwrap_err();
        assert_eq!(errors, vec!["breed: at most 100 characters".to_string()]);
    }

    #[test]
    fn display_and_status() {
        let now = Utc::now();
        let mut pet = Pet {
            id: 1,
            name: "Luna".into(),
            breed: "Siamese Cat".into(),
            age: 2,
            description: String::new(),
            adopted: false,
            image: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(pet.to_string(), "Luna (Siamese Cat)");
        assert!(pet.is_available());
        assert_eq!(pet.status_text(), "Available");
        pet.adopted = true;
        assert_eq!(pet.status_text(), "Adopted");
    }
}
