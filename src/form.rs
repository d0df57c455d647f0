use crate::deriver::{Derivation, UrlDeriver};
use crate::error::{Result, ResultError};
use crate::models::{ResultLocator, Semester};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_REGISTRATION_LENGTH: usize = 5;
pub const MAX_REGISTRATION_LENGTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    RegistrationNumber,
    Semester,
}

/// A problem with one field of the entry form, shown next to that field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormError {
    pub field: FormField,
    pub message: String,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// What the student typed into the entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultForm {
    pub registration_number: String,
    pub semester: String,
}

impl ResultForm {
    pub fn new(registration_number: impl Into<String>, semester: impl Into<String>) -> Self {
        Self {
            registration_number: registration_number.into(),
            semester: semester.into(),
        }
    }

    /// Checks every field, returning all problems at once.
    pub fn validate(&self) -> std::result::Result<(), Vec<FormError>> {
        let mut errors = Vec::new();

        let length = self.registration_number.trim().chars().count();
        if length < MIN_REGISTRATION_LENGTH {
            errors.push(FormError {
                field: FormField::RegistrationNumber,
                message: format!(
                    "Registration number must be at least {MIN_REGISTRATION_LENGTH} characters long."
                ),
            });
        } else if length > MAX_REGISTRATION_LENGTH {
            errors.push(FormError {
                field: FormField::RegistrationNumber,
                message: "Registration number too long.".to_string(),
            });
        }

        if self.semester.trim().is_empty() {
            errors.push(FormError {
                field: FormField::Semester,
                message: "Please select a semester.".to_string(),
            });
        } else if self.semester.parse::<Semester>().is_err() {
            errors.push(FormError {
                field: FormField::Semester,
                message: "Please select one of Semester I to Semester VIII.".to_string(),
            });
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Validates the form and derives the result page for it.
    ///
    /// Field problems are reported as a single [`ResultError::InvalidInput`]
    /// joining their messages; use [`ResultForm::validate`] to get them per field.
    pub fn submit(&self, deriver: &UrlDeriver) -> Result<ResultLocator> {
        self.submit_detailed(deriver).map(|derivation| derivation.locator)
    }

    /// Like [`ResultForm::submit`], keeping how the page was derived.
    pub fn submit_detailed(&self, deriver: &UrlDeriver) -> Result<Derivation> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ResultError::InvalidInput(messages.join(" "))
        })?;
        deriver.derive_detailed(&self.registration_number, &self.semester)
    }
}
