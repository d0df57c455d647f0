use crate::error::{Result, ResultError};
use crate::models::{ResultLocator, Semester};
use url::Url;
use url::form_urlencoded;

/// Query parameters that carry a [`ResultLocator`] into the viewer.
///
/// The viewer is linked to with three separate parameters, `basePath`,
/// `semester` and `regNo`, so that paging can change the registration number
/// on its own. Older links carry a single composed `url` parameter instead;
/// those are split back into the three fields.
///
/// A link whose base path is not an http(s) URL or whose semester is not one
/// of `I` to `VIII` is treated like a link with no locator at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationParams {
    pub base_path: String,
    pub semester: String,
    pub reg_no: String,
}

impl NavigationParams {
    /// Parses a query string such as `basePath=...&semester=IV&regNo=22CS007`.
    /// A leading `?` is allowed.
    pub fn from_query(query: &str) -> Result<Self> {
        let query = query.trim().trim_start_matches('?');

        let mut base_path = None;
        let mut semester = None;
        let mut reg_no = None;
        let mut url = None;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "basePath" => base_path = Some(value),
                "semester" => semester = Some(value),
                "regNo" => reg_no = Some(value),
                "url" => url = Some(value),
                _ => {}
            }
        }

        match (base_path, semester, reg_no, url) {
            (Some(base_path), Some(semester), Some(reg_no), _) => {
                Self::checked(base_path, &semester, reg_no)
            }
            (_, _, _, Some(url)) => Self::from_composed_url(&url),
            _ => Err(ResultError::MissingNavigationParameters),
        }
    }

    /// Splits a result page URL (`basePath?Sem=..&RegNo=..`) into its fields.
    pub fn from_composed_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|_| ResultError::MissingNavigationParameters)?;

        let mut semester = None;
        let mut reg_no = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "Sem" => semester = Some(value.into_owned()),
                "RegNo" => reg_no = Some(value.into_owned()),
                _ => {}
            }
        }

        let mut base = parsed;
        base.set_query(None);
        base.set_fragment(None);

        match (semester, reg_no) {
            (Some(semester), Some(reg_no)) if !reg_no.trim().is_empty() => {
                Self::checked(base.to_string(), &semester, reg_no)
            }
            _ => Err(ResultError::MissingNavigationParameters),
        }
    }

    /// Normalizes the semester to its canonical token and checks the base path.
    fn checked(base_path: String, semester: &str, reg_no: String) -> Result<Self> {
        let semester: Semester = semester
            .parse()
            .map_err(|_| ResultError::MissingNavigationParameters)?;

        let base = Url::parse(&base_path).map_err(|_| ResultError::MissingNavigationParameters)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ResultError::MissingNavigationParameters);
        }

        Ok(Self {
            base_path,
            semester: semester.code().to_string(),
            reg_no: reg_no.trim().to_string(),
        })
    }

    /// Encodes the three-parameter form, without a leading `?`.
    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("basePath", &self.base_path)
            .append_pair("semester", &self.semester)
            .append_pair("regNo", &self.reg_no)
            .finish()
    }

    pub fn into_locator(self) -> ResultLocator {
        ResultLocator::new(self.base_path, self.semester, self.reg_no)
    }
}

impl From<&ResultLocator> for NavigationParams {
    fn from(locator: &ResultLocator) -> Self {
        Self {
            base_path: locator.base_path().to_string(),
            semester: locator.semester_code().to_string(),
            reg_no: locator.registration_number().to_string(),
        }
    }
}
