//! Per-step validation rules for the submission form.
//!
//! Validation is a pure function of the committed field values. It never
//! fails; it reports a message per offending field, and an empty map means
//! the step may be left.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::models::{Field, FormData};

/// Field name to human-readable message. Empty means valid.
pub type FieldErrors = BTreeMap<Field, String>;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s\-+()]+$").expect("phone regex is valid"));

/// Checks an email address for the `local@domain.tld` shape.
///
/// # Examples
///
/// ```
/// use stepform::domain::is_valid_email;
///
/// assert!(is_valid_email("john@x.com"));
/// assert!(!is_valid_email("not-an-email"));
/// assert!(!is_valid_email("john doe@x.com"));
/// ```
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Phone numbers may only contain digits, spaces, `+`, `-` and parentheses.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone)
}

/// Validates the fields belonging to `step` and returns every failure.
///
/// Steps without rules (the details step, or an index past the last step)
/// always pass.
///
/// # Examples
///
/// ```
/// use stepform::domain::{validate_step, Field, FormData};
///
/// let mut data = FormData::default();
/// data.set(Field::FirstName, "John".into());
/// data.set(Field::LastName, "Doe".into());
/// data.set(Field::Email, "john@x.com".into());
/// assert!(validate_step(0, &data).is_empty());
///
/// data.set(Field::Email, "not-an-email".into());
/// assert!(validate_step(0, &data).contains_key(&Field::Email));
/// ```
pub fn validate_step(step: usize, data: &FormData) -> FieldErrors {
    let mut errors = FieldErrors::new();
    match step {
        0 => validate_personal(data, &mut errors),
        1 => validate_type(data, &mut errors),
        3 => validate_review(data, &mut errors),
        _ => {}
    }
    errors
}

fn validate_personal(data: &FormData, errors: &mut FieldErrors) {
    if data.text(Field::FirstName).trim().is_empty() {
        errors.insert(Field::FirstName, "First name is required".to_string());
    }
    if data.text(Field::LastName).trim().is_empty() {
        errors.insert(Field::LastName, "Last name is required".to_string());
    }

    let email = data.text(Field::Email);
    if email.trim().is_empty() {
        errors.insert(Field::Email, "Email is required".to_string());
    } else if !is_valid_email(email) {
        errors.insert(Field::Email, "Please enter a valid email".to_string());
    }

    let phone = data.text(Field::Phone);
    if !phone.is_empty() && !is_valid_phone(phone) {
        errors.insert(Field::Phone, "Please enter a valid phone number".to_string());
    }
}

fn validate_type(data: &FormData, errors: &mut FieldErrors) {
    match data.submission_type() {
        None => {
            errors.insert(
                Field::SubmissionType,
                "Please select a submission type".to_string(),
            );
        }
        Some(kind) if kind.requires_company_name() => {
            if data.text(Field::CompanyName).trim().is_empty() {
                errors.insert(Field::CompanyName, "Company name is required".to_string());
            }
        }
        Some(_) => {}
    }
}

fn validate_review(data: &FormData, errors: &mut FieldErrors) {
    if !data.flag(Field::TermsAccepted) {
        errors.insert(
            Field::TermsAccepted,
            "You must accept the terms and conditions".to_string(),
        );
    }
}
