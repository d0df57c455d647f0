use crate::error::ResultError;
use crate::frame::ResultFrame;
use crate::models::{ResultLocator, SiteConfig};
use crate::navigation::NavigationParams;
use crate::paging::Direction;
use crate::viewer::{LoadState, ViewerSession};
use chrono::{Local, NaiveDateTime};
use std::future::{Future, pending};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Sleep, sleep};
use tracing::{debug, info, warn};

/// A user action sent to a running viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    /// Show the previous registration number.
    Prev,
    /// Show the next registration number.
    Next,
    /// Stop reloading automatically.
    CancelRetry,
    /// Leave the viewer.
    Close,
}

impl ViewerCommand {
    /// Reads a typed command: `n`/`next`, `p`/`prev`, `c`/`cancel`, `q`/`quit`.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "n" | "next" => Some(ViewerCommand::Next),
            "p" | "prev" => Some(ViewerCommand::Prev),
            "c" | "cancel" => Some(ViewerCommand::CancelRetry),
            "q" | "quit" => Some(ViewerCommand::Close),
            _ => None,
        }
    }
}

/// Feeds commands typed on `input`, one per line, to a running viewer.
///
/// The end of `input` does not close the viewer: `commands` stays open until
/// a `quit` line is read or `shutdown` completes, which sends
/// [`ViewerCommand::Close`]. Returns once the viewer has been told to close
/// or has gone away.
pub async fn forward_commands<R, S>(input: R, commands: mpsc::Sender<ViewerCommand>, shutdown: S)
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    let mut input_open = true;
    tokio::pin!(shutdown);

    loop {
        let command = tokio::select! {
            () = &mut shutdown => ViewerCommand::Close,
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) => match ViewerCommand::parse(&line) {
                    Some(command) => command,
                    None => {
                        warn!(input = %line.trim(), "Unknown command; use n, p, c or q");
                        continue;
                    }
                },
                Ok(None) | Err(_) => {
                    debug!("Command input closed, waiting for shutdown");
                    input_open = false;
                    continue;
                }
            },
        };

        let close = command == ViewerCommand::Close;
        if commands.send(command).await.is_err() || close {
            return;
        }
    }
}

/// Why [`ViewerController::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerExit {
    /// The user closed the viewer, or dropped the command channel.
    Closed,
    /// The viewer was opened without a locator; send the user back to the form.
    RedirectToEntry,
}

/// A snapshot of the session, sent after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerEvent {
    pub state: LoadState,
    pub nonce: u64,
    pub url: Option<String>,
    pub auto_retry: bool,
    pub at: NaiveDateTime,
}

/// The load currently being performed by the frame. Dropping it abandons the
/// request.
struct InFlight {
    nonce: u64,
    handle: JoinHandle<crate::Result<()>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drives a [`ViewerSession`]: loads pages through a [`ResultFrame`], retries
/// on a fixed interval until a load succeeds, and applies paging commands.
///
/// The retry timer exists only while [`ViewerSession::retry_armed`] holds. It
/// is restarted on every new request and dropped as soon as the session is
/// loaded, retrying is cancelled, or the viewer closes.
pub struct ViewerController<F: ResultFrame + 'static> {
    frame: Arc<F>,
    session: ViewerSession,
    retry_interval: Duration,
    redirect_delay: Duration,
    events: Option<mpsc::UnboundedSender<ViewerEvent>>,
}

impl<F: ResultFrame + 'static> ViewerController<F> {
    /// Creates an idle viewer. Fails with [`ResultError::InvalidConfig`] if
    /// `config` does not validate.
    pub fn new(config: &SiteConfig, frame: Arc<F>) -> crate::Result<Self> {
        config.validate()?;

        Ok(Self {
            frame,
            session: ViewerSession::new(),
            retry_interval: config.retry_interval,
            redirect_delay: config.redirect_delay,
            events: None,
        })
    }

    /// Sends a [`ViewerEvent`] to `events` after every state change.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<ViewerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn session(&self) -> &ViewerSession {
        &self.session
    }

    /// Runs the viewer for the locator carried by a navigation query string.
    pub async fn run_from_query(
        &mut self,
        query: &str,
        commands: mpsc::Receiver<ViewerCommand>,
    ) -> ViewerExit {
        let locator = match NavigationParams::from_query(query) {
            Ok(params) => Some(params.into_locator()),
            Err(e) => {
                warn!(error = %e, "Viewer opened with unusable navigation parameters");
                None
            }
        };
        self.run(locator, commands).await
    }

    /// Shows `locator` until the user closes the viewer.
    ///
    /// Without a locator there is nothing to show: after the configured
    /// redirect delay this returns [`ViewerExit::RedirectToEntry`].
    pub async fn run(
        &mut self,
        locator: Option<ResultLocator>,
        mut commands: mpsc::Receiver<ViewerCommand>,
    ) -> ViewerExit {
        let Some(locator) = locator else {
            warn!(
                delay_ms = self.redirect_delay.as_millis() as u64,
                "No result locator, returning to the entry form"
            );
            sleep(self.redirect_delay).await;
            return ViewerExit::RedirectToEntry;
        };

        let mut in_flight: Option<InFlight> = None;
        let mut timer: Option<Pin<Box<Sleep>>> = None;

        let nonce = self.session.enter(locator);
        self.start_load(nonce, &mut in_flight, &mut timer);

        loop {
            tokio::select! {
                (nonce, outcome) = settle(&mut in_flight) => {
                    let applied = match outcome {
                        Ok(()) => {
                            info!(nonce, "Result page loaded");
                            self.session.frame_loaded(nonce)
                        }
                        Err(e) => {
                            warn!(nonce, error = %e, "Result page failed to load");
                            self.session.frame_failed(nonce)
                        }
                    };
                    if applied {
                        self.emit();
                    }
                }
                () = tick(&mut timer) => {
                    timer = None;
                    if let Some(nonce) = self.session.retry_fired() {
                        self.start_load(nonce, &mut in_flight, &mut timer);
                    }
                }
                command = commands.recv() => match command {
                    Some(ViewerCommand::Next) => self.step(Direction::Next, &mut in_flight, &mut timer),
                    Some(ViewerCommand::Prev) => self.step(Direction::Prev, &mut in_flight, &mut timer),
                    Some(ViewerCommand::CancelRetry) => {
                        info!("Automatic reload cancelled");
                        self.session.cancel_retry();
                        self.emit();
                    }
                    Some(ViewerCommand::Close) | None => {
                        info!(attempts = self.session.attempts(), "Closing viewer");
                        return ViewerExit::Closed;
                    }
                },
            }

            if !self.session.retry_armed() && timer.take().is_some() {
                debug!("Retry timer disarmed");
            }
        }
    }

    fn step(
        &mut self,
        direction: Direction,
        in_flight: &mut Option<InFlight>,
        timer: &mut Option<Pin<Box<Sleep>>>,
    ) {
        match self.session.step(direction) {
            Some(nonce) => self.start_load(nonce, in_flight, timer),
            None => debug!(?direction, "Registration number cannot be stepped"),
        }
    }

    /// Replaces any in-flight load with a request for the current URL and
    /// restarts the retry timer.
    fn start_load(
        &mut self,
        nonce: u64,
        in_flight: &mut Option<InFlight>,
        timer: &mut Option<Pin<Box<Sleep>>>,
    ) {
        let Some(url) = self.session.current_url() else {
            return;
        };

        debug!(nonce, %url, "Requesting result page");
        let frame = Arc::clone(&self.frame);
        let handle = tokio::spawn(async move { frame.load(&url).await });
        *in_flight = Some(InFlight { nonce, handle });
        *timer = Some(Box::pin(sleep(self.retry_interval)));

        self.emit();
    }

    fn emit(&self) {
        let Some(events) = &self.events else {
            return;
        };
        let event = ViewerEvent {
            state: self.session.load_state(),
            nonce: self.session.reload_nonce(),
            url: self.session.current_url(),
            auto_retry: self.session.auto_retry_enabled(),
            at: Local::now().naive_local(),
        };
        // A listener that went away does not stop the viewer.
        let _ = events.send(event);
    }
}

/// Waits for the in-flight load, if any, and takes it.
async fn settle(in_flight: &mut Option<InFlight>) -> (u64, crate::Result<()>) {
    let Some(load) = in_flight.as_mut() else {
        return pending().await;
    };

    let outcome = match (&mut load.handle).await {
        Ok(outcome) => outcome,
        Err(e) => Err(ResultError::FrameLoadFailure(e.to_string())),
    };
    let nonce = load.nonce;
    *in_flight = None;
    (nonce, outcome)
}

async fn tick(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(deadline) => deadline.as_mut().await,
        None => pending().await,
    }
}
