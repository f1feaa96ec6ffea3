//! Contact form submissions.

use super::user::is_plausible_email;
use serde::Deserialize;

/// `POST /contact` payload.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        check_text(&mut errors, "name", &self.name, Some(100));
        if !is_plausible_email(&self.email) {
            errors.push("email: please enter a valid email address".to_string());
        }
        if let Some(phone) = &self.phone {
            if phone.trim().chars().count() > 20 {
                errors.push("phone: at most 20 characters".to_string());
            }
        }
        check_text(&mut errors, "subject", &self.subject, Some(200));
        check_text(&mut errors, "message", &self.message, None);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn check_text(errors: &mut Vec<String>, field: &str, value: &str, max_len: Option<usize>) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(format!("{field}: this field is required"));
    } else if let Some(max) = max_len {
        if value.chars().count() > max {
            errors.push(format!("{field}: at most {max} characters"));
        }
    }
}
