// tests/controller_test.rs
//
// Runs the viewer against a scripted frame on tokio's paused clock, so the
// 30 second retry interval passes instantly.

use async_trait::async_trait;
use beup_result_core::{
    ErrorKind, LoadState, NavigationParams, Result, ResultError, ResultFrame, SiteConfig, UrlDeriver,
    ViewerCommand, ViewerController, ViewerEvent, ViewerExit, forward_commands,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How the frame answers one request.
#[derive(Clone, Copy)]
enum Step {
    Load(Duration),
    Fail(Duration),
}

/// A frame that answers requests from a script, then repeats `fallback`.
struct ScriptedFrame {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFrame {
    fn new(script: impl IntoIterator<Item = Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultFrame for ScriptedFrame {
    async fn load(&self, url: &str) -> Result<()> {
        self.requests.lock().unwrap().push(url.to_string());
        let step = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        match step {
            Step::Load(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Step::Fail(delay) => {
                tokio::time::sleep(delay).await;
                Err(ResultError::FrameLoadFailure("connection reset".to_string()))
            }
        }
    }
}

struct Running {
    commands: mpsc::Sender<ViewerCommand>,
    events: mpsc::UnboundedReceiver<ViewerEvent>,
    handle: JoinHandle<(ViewerExit, ViewerController<ScriptedFrame>)>,
}

fn config() -> SiteConfig {
    SiteConfig::default().with_origin("http://results.test")
}

fn start(frame: Arc<ScriptedFrame>, query: String) -> Running {
    let (event_tx, events) = mpsc::unbounded_channel();
    let (commands, command_rx) = mpsc::channel(8);
    let mut controller = ViewerController::new(&config(), frame)
        .expect("test config is valid")
        .with_events(event_tx);

    let handle = tokio::spawn(async move {
        let exit = controller.run_from_query(&query, command_rx).await;
        (exit, controller)
    });

    Running {
        commands,
        events,
        handle,
    }
}

fn query_for(reg: &str, semester: &str) -> Result<String> {
    let locator = UrlDeriver::new(&config()).derive(reg, semester)?;
    Ok(NavigationParams::from(&locator).to_query())
}

async fn next_event(running: &mut Running) -> ViewerEvent {
    running.events.recv().await.expect("viewer stopped sending events")
}

#[tokio::test(start_paused = true)]
async fn test_failed_loads_retry_every_interval() -> Result<()> {
    let frame = ScriptedFrame::new([], Step::Fail(Duration::from_millis(200)));
    let mut running = start(frame.clone(), query_for("22CS007", "IV")?);

    let first = next_event(&mut running).await;
    assert_eq!((first.state, first.nonce), (LoadState::Loading, 1));
    let started = Instant::now();

    let failed = next_event(&mut running).await;
    assert_eq!((failed.state, failed.nonce), (LoadState::Errored, 1));
    assert!(failed.auto_retry);

    let retry = next_event(&mut running).await;
    assert_eq!((retry.state, retry.nonce), (LoadState::Loading, 2));
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(started.elapsed() < Duration::from_secs(31));

    assert_eq!(next_event(&mut running).await.state, LoadState::Errored);
    let third = next_event(&mut running).await;
    assert_eq!((third.state, third.nonce), (LoadState::Loading, 3));
    assert!(started.elapsed() >= Duration::from_secs(60));

    running.commands.send(ViewerCommand::Close).await.unwrap();
    let (exit, controller) = running.handle.await.unwrap();
    assert_eq!(exit, ViewerExit::Closed);
    assert_eq!(controller.session().attempts(), 3);

    let requests = frame.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|url| url
        == "http://results.test/ResultsBTech4thSem2024_B2022Pub.aspx?Sem=IV&RegNo=22CS007"));

    println!("✅ Failed loads are retried on the fixed interval");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_closed_input_keeps_retrying() -> Result<()> {
    let frame = ScriptedFrame::new([], Step::Fail(Duration::from_millis(200)));
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(8);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut controller = ViewerController::new(&config(), frame.clone())
        .expect("test config is valid")
        .with_events(event_tx);

    // Input that is already at its end, like stdin redirected from /dev/null.
    let input: &'static [u8] = b"";
    tokio::spawn(forward_commands(input, command_tx, async move {
        stop_rx.await.ok();
    }));
    let query = query_for("22CS007", "IV")?;
    let handle = tokio::spawn(async move { controller.run_from_query(&query, command_rx).await });

    let mut states = Vec::new();
    for _ in 0..4 {
        let event = events.recv().await.expect("viewer stopped sending events");
        states.push((event.state, event.nonce));
    }
    assert_eq!(
        states,
        vec![
            (LoadState::Loading, 1),
            (LoadState::Errored, 1),
            (LoadState::Loading, 2),
            (LoadState::Errored, 2),
        ]
    );
    assert!(!handle.is_finished());

    stop_tx.send(()).unwrap();
    assert_eq!(handle.await.unwrap(), ViewerExit::Closed);
    assert_eq!(frame.requests().len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_success_stops_retrying() -> Result<()> {
    let frame = ScriptedFrame::new([], Step::Load(Duration::from_secs(2)));
    let mut running = start(frame.clone(), query_for("22CS007", "IV")?);

    assert_eq!(next_event(&mut running).await.state, LoadState::Loading);
    let loaded = next_event(&mut running).await;
    assert_eq!((loaded.state, loaded.nonce), (LoadState::Loaded, 1));
    assert!(!loaded.auto_retry);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(running.events.try_recv().is_err());
    assert_eq!(frame.requests().len(), 1);

    drop(running.commands);
    let (exit, controller) = running.handle.await.unwrap();
    assert_eq!(exit, ViewerExit::Closed);
    assert_eq!(controller.session().reload_nonce(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_hung_load_is_superseded_by_retry() -> Result<()> {
    // The first request never answers within the interval; the retry does.
    let frame = ScriptedFrame::new(
        [Step::Load(Duration::from_secs(45))],
        Step::Load(Duration::from_secs(1)),
    );
    let mut running = start(frame.clone(), query_for("22CS007", "IV")?);

    assert_eq!(next_event(&mut running).await.nonce, 1);
    let retry = next_event(&mut running).await;
    assert_eq!((retry.state, retry.nonce), (LoadState::Loading, 2));
    let loaded = next_event(&mut running).await;
    assert_eq!((loaded.state, loaded.nonce), (LoadState::Loaded, 2));

    // The abandoned first load must not produce a late event.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(running.events.try_recv().is_err());
    assert_eq!(frame.requests().len(), 2);

    running.commands.send(ViewerCommand::Close).await.unwrap();
    running.handle.await.unwrap();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_paging_reloads_neighbour() -> Result<()> {
    let frame = ScriptedFrame::new([], Step::Load(Duration::from_millis(10)));
    let mut running = start(frame.clone(), query_for("22CS099", "III")?);

    assert_eq!(next_event(&mut running).await.state, LoadState::Loading);
    assert_eq!(next_event(&mut running).await.state, LoadState::Loaded);

    running.commands.send(ViewerCommand::Next).await.unwrap();
    let stepped = next_event(&mut running).await;
    assert_eq!((stepped.state, stepped.nonce), (LoadState::Loading, 2));
    assert!(stepped.auto_retry);
    assert_eq!(
        stepped.url.as_deref(),
        Some("http://results.test/ResultsBTech3rdSem2023_B2022Pub.aspx?Sem=III&RegNo=22CS100")
    );
    assert_eq!(next_event(&mut running).await.state, LoadState::Loaded);

    running.commands.send(ViewerCommand::Prev).await.unwrap();
    let back = next_event(&mut running).await;
    assert!(back.url.unwrap().ends_with("RegNo=22CS099"));
    assert_eq!(next_event(&mut running).await.state, LoadState::Loaded);

    running.commands.send(ViewerCommand::Close).await.unwrap();
    let (_, controller) = running.handle.await.unwrap();
    let locator = controller.session().locator().unwrap();
    assert_eq!(locator.registration_number(), "22CS099");
    assert_eq!(frame.requests().len(), 3);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_retry_disarms_timer() -> Result<()> {
    let frame = ScriptedFrame::new([], Step::Fail(Duration::from_millis(10)));
    let mut running = start(frame.clone(), query_for("22CS007", "IV")?);

    assert_eq!(next_event(&mut running).await.state, LoadState::Loading);
    assert_eq!(next_event(&mut running).await.state, LoadState::Errored);

    running.commands.send(ViewerCommand::CancelRetry).await.unwrap();
    let cancelled = next_event(&mut running).await;
    assert_eq!(cancelled.state, LoadState::Errored);
    assert!(!cancelled.auto_retry);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(running.events.try_recv().is_err());
    assert_eq!(frame.requests().len(), 1);

    running.commands.send(ViewerCommand::Close).await.unwrap();
    running.handle.await.unwrap();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_locator_redirects_to_entry() -> Result<()> {
    let frame = ScriptedFrame::new([], Step::Load(Duration::ZERO));
    let started = Instant::now();

    let bad_semester = "basePath=http%3A%2F%2Fresults.test%2FP.aspx&semester=IX&regNo=22CS007";
    let bad_link = "basePath=not-a-url&semester=banana&regNo=22CS007";

    for query in ["", "semester=IV&regNo=22CS007", "url=not%20a%20url", bad_semester, bad_link] {
        let mut running = start(frame.clone(), query.to_string());
        let (exit, controller) = running.handle.await.unwrap();
        assert_eq!(exit, ViewerExit::RedirectToEntry);
        assert_eq!(controller.session().load_state(), LoadState::Idle);
        assert!(running.events.try_recv().is_err());
    }

    assert!(started.elapsed() >= Duration::from_millis(250));
    assert!(frame.requests().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_composed_url_parameter() -> Result<()> {
    let frame = ScriptedFrame::new([], Step::Load(Duration::ZERO));
    let url = "http://results.test/ResultsBTech1stSem2021_B2021Pub.aspx?Sem=I&RegNo=21AB01";
    let query = format!("url={}", url.replace('?', "%3F").replace('&', "%26").replace('=', "%3D"));
    let mut running = start(frame.clone(), query);

    let first = next_event(&mut running).await;
    assert_eq!(first.url.as_deref(), Some(url));

    running.commands.send(ViewerCommand::Next).await.unwrap();
    loop {
        let event = next_event(&mut running).await;
        if event.nonce == 2 {
            assert!(event.url.unwrap().ends_with("RegNo=21AB02"));
            break;
        }
    }

    running.commands.send(ViewerCommand::Close).await.unwrap();
    running.handle.await.unwrap();
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_is_rejected() -> Result<()> {
    let frame = ScriptedFrame::new([], Step::Load(Duration::ZERO));

    let zero_retry = config().with_retry_interval(Duration::ZERO);
    let err = ViewerController::new(&zero_retry, frame.clone()).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);

    let zero_timeout = config().with_request_timeout(Duration::ZERO);
    let err = ViewerController::new(&zero_timeout, frame.clone()).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);

    assert!(ViewerController::new(&config(), frame).is_ok());
    Ok(())
}
