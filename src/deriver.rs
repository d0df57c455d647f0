use crate::error::{Result, ResultError};
use crate::models::{ResultLocator, Semester, SiteConfig};
use tracing::debug;

/// How a [`ResultLocator`] was guessed, for display next to the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub locator: ResultLocator,
    pub batch_start_year: i32,
    pub semester: Semester,
    pub academic_year_index: i32,
    pub exam_year: i32,
    pub file_name: String,
}

/// Guesses the result page of a student from their registration number and
/// semester.
///
/// The results site publishes one page per programme, semester, exam year and
/// batch, named like `ResultsBTech4thSem2024_B2022Pub.aspx`. The batch is taken
/// from the first two digits of the registration number. This matches the
/// common naming pattern only; cohorts published under other names will get a
/// page the site does not know.
#[derive(Debug, Clone)]
pub struct UrlDeriver {
    origin: String,
}

impl UrlDeriver {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            origin: config.origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn derive(&self, registration_number: &str, semester: &str) -> Result<ResultLocator> {
        self.derive_detailed(registration_number, semester)
            .map(|derivation| derivation.locator)
    }

    pub fn derive_detailed(&self, registration_number: &str, semester: &str) -> Result<Derivation> {
        let registration_number = registration_number.trim();
        let semester_token = semester.trim();

        if registration_number.is_empty() || semester_token.is_empty() {
            return Err(ResultError::invalid_input(
                "Registration number and semester are required.",
            ));
        }

        let batch_start_year = batch_start_year(registration_number)?;
        let semester: Semester = semester_token.parse()?;

        let academic_year_index = (semester.number() as i32 - 1) / 2;
        let exam_year = if semester.is_odd() {
            batch_start_year + academic_year_index
        } else {
            batch_start_year + academic_year_index + 1
        };

        let file_name = format!(
            "ResultsBTech{}Sem{}_B{}Pub.aspx",
            semester.ordinal(),
            exam_year,
            batch_start_year
        );
        let base_path = format!("{}/{}", self.origin, file_name);

        debug!(
            registration_number,
            semester = semester.code(),
            batch_start_year,
            exam_year,
            %base_path,
            "Derived result page"
        );

        Ok(Derivation {
            locator: ResultLocator::new(base_path, semester.code(), registration_number),
            batch_start_year,
            semester,
            academic_year_index,
            exam_year,
            file_name,
        })
    }
}

impl Default for UrlDeriver {
    fn default() -> Self {
        Self::new(&SiteConfig::default())
    }
}

/// Reads the batch year from the two-digit prefix of a registration number.
fn batch_start_year(registration_number: &str) -> Result<i32> {
    let prefix: String = registration_number.chars().take(2).collect();
    if prefix.chars().count() < 2 {
        return Err(ResultError::invalid_input(
            "Registration number is too short to determine batch year.",
        ));
    }

    if !prefix.chars().all(|c| c.is_ascii_digit()) {
        return Err(ResultError::invalid_input(
            "Invalid registration number format for batch year.",
        ));
    }

    format!("20{prefix}").parse::<i32>().map_err(|_| {
        ResultError::invalid_input("Invalid registration number format for batch year.")
    })
}

/// Decodes a Roman numeral with the usual subtractive rule: reading left to
/// right, a digit smaller than the one after it is subtracted, otherwise added.
///
/// Returns `None` on an empty string, an unknown character or overflow. No
/// canonical-form check is made (`"IIII"` gives 4).
pub fn roman_to_integer(roman: &str) -> Option<i64> {
    if roman.is_empty() {
        return None;
    }

    let digits: Vec<i64> = roman
        .chars()
        .map(|c| match c.to_ascii_uppercase() {
            'I' => Some(1),
            'V' => Some(5),
            'X' => Some(10),
            'L' => Some(50),
            'C' => Some(100),
            'D' => Some(500),
            'M' => Some(1000),
            _ => None,
        })
        .collect::<Option<_>>()?;

    let mut total: i64 = 0;
    for (i, &current) in digits.iter().enumerate() {
        let subtract = digits.get(i + 1).is_some_and(|&next| current < next);
        total = if subtract {
            total.checked_sub(current)?
        } else {
            total.checked_add(current)?
        };
    }
    Some(total)
}
