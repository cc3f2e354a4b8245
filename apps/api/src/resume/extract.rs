//! Resume text extraction and contact scraping.
//!
//! PDFs go through `pdf-extract`; plain text is taken as-is. Email and
//! phone come from unanchored regex scans; the name is a first-plausible-
//! line heuristic. Whatever cannot be extracted is collected during the
//! session's collecting-info phase instead.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::AppError;
use crate::interview::validation::ProfileField;

pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

static EMAIL_FIND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap());

static PHONE_FIND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\d[\d \-().]{8,18}\d").unwrap());

#[derive(Debug, Clone)]
pub struct ExtractedResume {
    pub text: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ExtractedResume {
    pub fn missing_fields(&self) -> Vec<ProfileField> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push(ProfileField::Name);
        }
        if self.email.is_none() {
            missing.push(ProfileField::Email);
        }
        if self.phone.is_none() {
            missing.push(ProfileField::Phone);
        }
        missing
    }
}

/// Extracts text and contact fields from an uploaded resume.
pub fn extract_resume(filename: &str, bytes: &[u8]) -> Result<ExtractedResume, AppError> {
    let text = extract_text(filename, bytes)?;
    Ok(scrape_contacts(text))
}

fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, AppError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
            tracing::warn!("PDF extraction failed for '{filename}': {e}");
            AppError::Validation(
                "Could not read the uploaded PDF. Please upload a text-based PDF.".to_string(),
            )
        }),
        "txt" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        other => Err(AppError::Validation(format!(
            "Unsupported resume format '.{other}'. Upload a PDF or plain-text file."
        ))),
    }
}

fn scrape_contacts(text: String) -> ExtractedResume {
    let email = EMAIL_FIND_RE.find(&text).map(|m| m.as_str().to_string());
    let phone = PHONE_FIND_RE
        .find_iter(&text)
        .map(|m| m.as_str().trim().to_string())
        .find(|candidate| {
            let digits = candidate.chars().filter(char::is_ascii_digit).count();
            (10..=15).contains(&digits)
        });
    let name = guess_name(&text);
    ExtractedResume {
        text,
        name,
        email,
        phone,
    }
}

/// First plausible line: 2–4 capitalized-ish words, no digits or '@',
/// within the top of the document.
fn guess_name(text: &str) -> Option<String> {
    text.lines()
        .take(10)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| {
            let words: Vec<&str> = line.split_whitespace().collect();
            (2..=4).contains(&words.len())
                && line.len() <= 60
                && !line.contains('@')
                && !line.chars().any(|c| c.is_ascii_digit())
                && words
                    .iter()
                    .all(|w| w.chars().next().is_some_and(|c| c.is_alphabetic()))
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME_TXT: &str = "\
Jane Doe
Senior Full-Stack Developer

Contact: jane.doe@example.com | +1 (415) 555-0100

Experience
- Built a React dashboard used by 40k users
- Designed REST APIs in Node.js
";

    #[test]
    fn test_extracts_all_contact_fields_from_plain_text() {
        let resume = extract_resume("resume.txt", RESUME_TXT.as_bytes()).unwrap();
        assert_eq!(resume.name.as_deref(), Some("Jane Doe"));
        assert_eq!(resume.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(resume.phone.as_deref(), Some("+1 (415) 555-0100"));
        assert!(resume.missing_fields().is_empty());
    }

    #[test]
    fn test_missing_contacts_are_reported() {
        let resume = extract_resume("resume.txt", b"An anonymous document with no contacts listed here")
            .unwrap();
        assert_eq!(
            resume.missing_fields(),
            vec![ProfileField::Name, ProfileField::Email, ProfileField::Phone]
        );
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let err = extract_resume("resume.docx", b"PK...").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_missing_extension_is_rejected() {
        assert!(extract_resume("resume", b"text").is_err());
    }

    #[test]
    fn test_name_heuristic_skips_headline_lines() {
        let text = "Curriculum Vitae 2024\nJohn Q Smith\njohn@example.com";
        // first line contains digits, second is the plausible name
        assert_eq!(guess_name(text).as_deref(), Some("John Q Smith"));
    }

    #[test]
    fn test_name_heuristic_rejects_single_words_and_emails() {
        assert_eq!(guess_name("Resume\njane@example.com\n"), None);
    }

    #[test]
    fn test_phone_scan_ignores_short_number_runs() {
        let text = "Jane Doe\nReferences: section 12-34, page 5\n";
        let resume = scrape_contacts(text.to_string());
        assert!(resume.phone.is_none());
    }

    #[test]
    fn test_email_scan_finds_embedded_address() {
        let resume = scrape_contacts("reach me at sam_lee+jobs@mail.example.org anytime".to_string());
        assert_eq!(resume.email.as_deref(), Some("sam_lee+jobs@mail.example.org"));
    }
}
