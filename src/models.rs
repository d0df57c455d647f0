use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The results site the deriver targets unless configured otherwise.
pub const DEFAULT_ORIGIN: &str = "https://results.beup.ac.in";

/// An academic term of the B.Tech programme, identified on the results site
/// by its Roman numeral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Semester {
    I = 1,
    II = 2,
    III = 3,
    IV = 4,
    V = 5,
    VI = 6,
    VII = 7,
    VIII = 8,
}

impl Semester {
    /// Every semester, in order. This is also the option list of the entry form.
    pub const ALL: [Semester; 8] = [
        Semester::I,
        Semester::II,
        Semester::III,
        Semester::IV,
        Semester::V,
        Semester::VI,
        Semester::VII,
        Semester::VIII,
    ];

    /// The semester numbered `number`, or `None` outside `1..=8`.
    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            1..=8 => Some(Self::ALL[number as usize - 1]),
            _ => None,
        }
    }

    /// The semester as an integer in `1..=8`.
    pub fn number(&self) -> u32 {
        *self as u32
    }

    /// The uppercase Roman-numeral token, e.g. `"IV"`.
    pub fn code(&self) -> &'static str {
        match self {
            Semester::I => "I",
            Semester::II => "II",
            Semester::III => "III",
            Semester::IV => "IV",
            Semester::V => "V",
            Semester::VI => "VI",
            Semester::VII => "VII",
            Semester::VIII => "VIII",
        }
    }

    /// The ordinal used inside result page filenames, e.g. `"4th"`.
    pub fn ordinal(&self) -> &'static str {
        match self {
            Semester::I => "1st",
            Semester::II => "2nd",
            Semester::III => "3rd",
            Semester::IV => "4th",
            Semester::V => "5th",
            Semester::VI => "6th",
            Semester::VII => "7th",
            Semester::VIII => "8th",
        }
    }

    /// Odd semesters are examined in the calendar year the academic year starts.
    pub fn is_odd(&self) -> bool {
        self.number() % 2 == 1
    }
}

impl FromStr for Semester {
    type Err = crate::error::ResultError;

    /// Parses a Roman-numeral token, case-insensitively.
    ///
    /// Only the canonical spellings `I` through `VIII` are accepted, so `"IIII"`
    /// is rejected even though it decodes to 4.
    fn from_str(s: &str) -> crate::error::Result<Self> {
        use crate::error::ResultError;

        let token = s.trim().to_uppercase();
        let semester = crate::deriver::roman_to_integer(&token)
            .and_then(|n| u32::try_from(n).ok())
            .and_then(Semester::from_number)
            .filter(|semester| semester.code() == token);

        semester.ok_or_else(|| {
            ResultError::invalid_input("Invalid semester provided. Please use I, II, ..., VIII.")
        })
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The canonical description of one result lookup.
///
/// The three fields are the state; the URL the viewer requests is always
/// rebuilt from them by [`ResultLocator::effective_url`].
///
/// Deserialized locators go through [`ResultLocator::new`], so they are
/// normalized the same way as constructed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "LocatorFields")]
pub struct ResultLocator {
    /// Scheme, host and derived filename of the result page.
    base_path: String,
    /// Uppercase Roman-numeral semester token, e.g. `"IV"`.
    semester_code: String,
    /// The registration number as entered, trimmed. Moves when paging.
    registration_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocatorFields {
    base_path: String,
    semester_code: String,
    registration_number: String,
}

impl From<LocatorFields> for ResultLocator {
    fn from(fields: LocatorFields) -> Self {
        ResultLocator::new(
            fields.base_path,
            fields.semester_code,
            fields.registration_number,
        )
    }
}

impl ResultLocator {
    /// Creates a locator, uppercasing the semester token and trimming the
    /// registration number. No other checks are made.
    pub fn new(
        base_path: impl Into<String>,
        semester_code: impl Into<String>,
        registration_number: impl Into<String>,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            semester_code: semester_code.into().to_uppercase(),
            registration_number: registration_number.into().trim().to_string(),
        }
    }

    /// Scheme, host and derived filename, without a query string.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// The semester token sent as `Sem`.
    pub fn semester_code(&self) -> &str {
        &self.semester_code
    }

    /// The registration number sent as `RegNo`.
    pub fn registration_number(&self) -> &str {
        &self.registration_number
    }

    /// Replaces the registration number. Used by paging; the base path and
    /// semester stay fixed for the lifetime of a viewing session.
    pub(crate) fn set_registration_number(&mut self, registration_number: String) {
        self.registration_number = registration_number;
    }

    /// The URL the viewer loads: `basePath?Sem=<semester>&RegNo=<registration number>`.
    pub fn effective_url(&self) -> String {
        format!(
            "{}?Sem={}&RegNo={}",
            self.base_path, self.semester_code, self.registration_number
        )
    }
}

impl fmt::Display for ResultLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.effective_url())
    }
}

/// Settings shared by the deriver, the viewer controller and the HTTP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Scheme and host of the results site, without a trailing slash.
    pub origin: String,
    /// How long a loading or failed page waits before it is requested again.
    pub retry_interval: Duration,
    /// Pause before a viewer opened without a locator sends the user back.
    pub redirect_delay: Duration,
    /// Upper bound on a single page request made by the HTTP frame.
    pub request_timeout: Duration,
    /// User-Agent sent by the HTTP frame.
    pub user_agent: String,
}

impl Default for SiteConfig {
    /// Default configuration: the BEUP site, 30s retry interval, 50ms redirect delay.
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            retry_interval: Duration::from_secs(30),
            redirect_delay: Duration::from_millis(50),
            request_timeout: Duration::from_secs(20),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl SiteConfig {
    /// Builds a configuration from the defaults plus any of these variables:
    ///
    /// - `BEUP_ORIGIN`
    /// - `BEUP_RETRY_INTERVAL_SECS`
    /// - `BEUP_REQUEST_TIMEOUT_SECS`
    pub fn from_env() -> crate::error::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`SiteConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::error::Result<Self> {
        let mut config = Self::default();

        if let Some(origin) = lookup("BEUP_ORIGIN") {
            config = config.with_origin(origin);
        }
        if let Some(secs) = parse_secs("BEUP_RETRY_INTERVAL_SECS", lookup("BEUP_RETRY_INTERVAL_SECS"))? {
            config.retry_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_secs("BEUP_REQUEST_TIMEOUT_SECS", lookup("BEUP_REQUEST_TIMEOUT_SECS"))? {
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_redirect_delay(mut self, redirect_delay: Duration) -> Self {
        self.redirect_delay = redirect_delay;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Rejects a non-http(s) origin and zero retry interval or request timeout.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ResultError;

        if !(self.origin.starts_with("http://") || self.origin.starts_with("https://")) {
            return Err(ResultError::InvalidConfig(format!(
                "origin must be an http(s) URL, got {:?}",
                self.origin
            )));
        }
        if self.retry_interval.is_zero() {
            return Err(ResultError::InvalidConfig(
                "retry interval must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ResultError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_secs(name: &str, value: Option<String>) -> crate::error::Result<Option<u64>> {
    use crate::error::ResultError;

    match value {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ResultError::InvalidConfig(format!("{name} must be whole seconds, got {raw:?}"))),
        None => Ok(None),
    }
}
