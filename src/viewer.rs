use crate::models::ResultLocator;
use crate::paging::{Direction, step_registration_number};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Where the viewer is with the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    /// No locator yet.
    Idle,
    /// A request for the current URL is in flight.
    Loading,
    /// The frame reported a completed load. Automatic reloads stop.
    Loaded,
    /// The frame reported a failure. The retry timer keeps running.
    Errored,
}

/// State of one viewing session.
///
/// This type only tracks state; it performs no I/O and owns no timer. The
/// [`ViewerController`](crate::ViewerController) drives it and arms its retry
/// timer from [`ViewerSession::retry_armed`].
///
/// Every entry into [`LoadState::Loading`] bumps `reload_nonce`. Load and error
/// reports carry the nonce of the request they belong to, and reports for an
/// older nonce are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSession {
    locator: Option<ResultLocator>,
    load_state: LoadState,
    auto_retry_enabled: bool,
    reload_nonce: u64,
    attempts: u64,
    last_attempt_at: Option<NaiveDateTime>,
}

impl Default for ViewerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerSession {
    pub fn new() -> Self {
        Self {
            locator: None,
            load_state: LoadState::Idle,
            auto_retry_enabled: false,
            reload_nonce: 0,
            attempts: 0,
            last_attempt_at: None,
        }
    }

    pub fn locator(&self) -> Option<&ResultLocator> {
        self.locator.as_ref()
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn auto_retry_enabled(&self) -> bool {
        self.auto_retry_enabled
    }

    pub fn reload_nonce(&self) -> u64 {
        self.reload_nonce
    }

    /// Number of requests started in this session.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn last_attempt_at(&self) -> Option<NaiveDateTime> {
        self.last_attempt_at
    }

    /// The URL the frame should currently show.
    pub fn current_url(&self) -> Option<String> {
        self.locator.as_ref().map(ResultLocator::effective_url)
    }

    /// Whether the retry timer should be running.
    pub fn retry_armed(&self) -> bool {
        self.auto_retry_enabled
            && self.locator.is_some()
            && matches!(self.load_state, LoadState::Loading | LoadState::Errored)
    }

    /// Starts viewing `locator`. Returns the nonce of the first request.
    pub fn enter(&mut self, locator: ResultLocator) -> u64 {
        info!(url = %locator.effective_url(), "Opening result page");
        self.locator = Some(locator);
        self.auto_retry_enabled = true;
        self.begin_loading()
    }

    /// The frame finished loading the request tagged `nonce`.
    ///
    /// Returns `false` if the report was stale and ignored.
    pub fn frame_loaded(&mut self, nonce: u64) -> bool {
        if !self.is_current(nonce) {
            debug!(nonce, current = self.reload_nonce, "Ignoring stale load report");
            return false;
        }
        self.load_state = LoadState::Loaded;
        self.auto_retry_enabled = false;
        true
    }

    /// The frame failed to load the request tagged `nonce`.
    ///
    /// Returns `false` if the report was stale and ignored.
    pub fn frame_failed(&mut self, nonce: u64) -> bool {
        if !self.is_current(nonce) {
            debug!(nonce, current = self.reload_nonce, "Ignoring stale error report");
            return false;
        }
        self.load_state = LoadState::Errored;
        true
    }

    /// The retry timer fired. Returns the new nonce, or `None` if the timer
    /// should not have been armed.
    pub fn retry_fired(&mut self) -> Option<u64> {
        if !self.retry_armed() {
            return None;
        }
        debug!(nonce = self.reload_nonce, "Retry timer fired");
        Some(self.begin_loading())
    }

    /// Moves to the previous or next registration number.
    ///
    /// Returns the new nonce, or `None` when there is no locator or the
    /// registration number has no trailing digits. In that case nothing changes.
    pub fn step(&mut self, direction: Direction) -> Option<u64> {
        let locator = self.locator.as_mut()?;
        let stepped = step_registration_number(locator.registration_number(), direction)?;

        info!(
            from = locator.registration_number(),
            to = %stepped,
            ?direction,
            "Stepping registration number"
        );
        locator.set_registration_number(stepped);
        self.auto_retry_enabled = true;
        Some(self.begin_loading())
    }

    /// Stops automatic reloads without changing the load state.
    pub fn cancel_retry(&mut self) {
        self.auto_retry_enabled = false;
    }

    fn is_current(&self, nonce: u64) -> bool {
        nonce == self.reload_nonce && self.load_state == LoadState::Loading
    }

    fn begin_loading(&mut self) -> u64 {
        self.load_state = LoadState::Loading;
        self.reload_nonce += 1;
        self.attempts += 1;
        self.last_attempt_at = Some(Local::now().naive_local());
        self.reload_nonce
    }
}
