//! Identity-field validation for the collecting-info phase.
//!
//! Invalid input never advances the session; the same field is re-prompted
//! with the reason attached.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A candidate identity field that may be missing after resume extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileField {
    Name,
    Email,
    Phone,
}

impl ProfileField {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Email => "email",
            ProfileField::Phone => "phone",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]{2,}$").unwrap());

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z .'\-]{1,59}$").unwrap());

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[\d \-().]{7,19}$").unwrap());

/// Validates one identity field. Returns the trimmed value on success,
/// or a human-readable reason on failure.
pub fn validate_field(field: ProfileField, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    match field {
        ProfileField::Name => {
            if NAME_RE.is_match(value) {
                Ok(value.to_string())
            } else {
                Err("name must be 2-60 letters, spaces, or hyphens".to_string())
            }
        }
        ProfileField::Email => {
            if EMAIL_RE.is_match(value) {
                Ok(value.to_string())
            } else {
                Err("email must look like name@example.com".to_string())
            }
        }
        ProfileField::Phone => {
            let digits = value.chars().filter(char::is_ascii_digit).count();
            if PHONE_RE.is_match(value) && (10..=15).contains(&digits) {
                Ok(value.to_string())
            } else {
                Err("phone must contain 10-15 digits".to_string())
            }
        }
    }
}
