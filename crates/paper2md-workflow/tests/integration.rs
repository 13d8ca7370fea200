use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use image::RgbImage;
use paper2md_camera::{CameraDevice, MediaStream, TestPatternTrack, VideoTrack};
use paper2md_core::{
    CameraError, Credential, DialogCommand, DialogStatus, NoticeBoard, RecognizedText,
    WorkflowError,
};
use paper2md_document::{Document, FileDocument, MemoryDocument};
use paper2md_engine::{MathpixEngine, RecognitionEngine};
use paper2md_workflow::{
    capture_once, CaptureDialog, CaptureSession, DialogController, DialogOutcome, DialogSlot,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ── Mock recognition service ───────────────────────────────

struct MockService {
    status: StatusCode,
    body: String,
    delay: Duration,
    requests: AtomicUsize,
    responses: AtomicUsize,
    app_keys: Mutex<Vec<String>>,
}

async fn handle_text(
    State(service): State<Arc<MockService>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    service.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(key) = headers.get("app_key").and_then(|v| v.to_str().ok()) {
        service.app_keys.lock().unwrap().push(key.to_string());
    }
    while let Ok(Some(field)) = multipart.next_field().await {
        let _ = field.bytes().await;
    }
    tokio::time::sleep(service.delay).await;
    service.responses.fetch_add(1, Ordering::SeqCst);
    (service.status, service.body.clone())
}

async fn spawn_service(status: u16, body: &str, delay: Duration) -> (String, Arc<MockService>) {
    let service = Arc::new(MockService {
        status: StatusCode::from_u16(status).unwrap(),
        body: body.to_string(),
        delay,
        requests: AtomicUsize::new(0),
        responses: AtomicUsize::new(0),
        app_keys: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/v3/text", post(handle_text))
        .with_state(Arc::clone(&service));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v3/text"), service)
}

// ── Cameras ────────────────────────────────────────────────

/// Pattern track that counts how often it is stopped.
struct CountedTrack {
    inner: TestPatternTrack,
    stops: Arc<AtomicUsize>,
}

impl VideoTrack for CountedTrack {
    fn label(&self) -> &str {
        self.inner.label()
    }

    fn resolution(&self) -> (u32, u32) {
        self.inner.resolution()
    }

    fn grab_frame(&self) -> Result<RgbImage, CameraError> {
        self.inner.grab_frame()
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.inner.stop();
    }

    fn is_live(&self) -> bool {
        self.inner.is_live()
    }
}

struct CountingCamera {
    tracks: usize,
    stops: Arc<AtomicUsize>,
}

impl CountingCamera {
    fn new(tracks: usize) -> (Self, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        (
            Self {
                tracks,
                stops: Arc::clone(&stops),
            },
            stops,
        )
    }
}

impl CameraDevice for CountingCamera {
    fn name(&self) -> &str {
        "counting"
    }

    fn open(&self) -> Result<MediaStream, CameraError> {
        let tracks: Vec<Box<dyn VideoTrack>> = (0..self.tracks)
            .map(|_| {
                Box::new(CountedTrack {
                    inner: TestPatternTrack::new(64, 48),
                    stops: Arc::clone(&self.stops),
                }) as Box<dyn VideoTrack>
            })
            .collect();
        Ok(MediaStream::new(tracks))
    }
}

struct DeniedCamera;

impl CameraDevice for DeniedCamera {
    fn name(&self) -> &str {
        "denied"
    }

    fn open(&self) -> Result<MediaStream, CameraError> {
        Err(CameraError::AccessDenied("/dev/video0".to_string()))
    }
}

// ── Helpers ────────────────────────────────────────────────

fn session(
    camera: Arc<dyn CameraDevice>,
    endpoint: &str,
    document: Arc<dyn Document>,
    board: &NoticeBoard,
) -> CaptureSession {
    let engine: Arc<dyn RecognitionEngine> =
        Arc::new(MathpixEngine::with_app_id("paper2md", endpoint));
    CaptureSession::new(camera, engine, document, Arc::new(board.clone()))
}

fn credential() -> Credential {
    Credential::new("test-key")
}

// ── Scenarios ──────────────────────────────────────────────

#[tokio::test]
async fn test_scenario_successful_capture_appends_text() {
    let (endpoint, service) = spawn_service(200, r#"{"text": "E=mc^2"}"#, Duration::ZERO).await;
    let (camera, stops) = CountingCamera::new(1);
    let document = Arc::new(MemoryDocument::new("Physics\n"));
    let board = NoticeBoard::new();
    let slot = DialogSlot::new();

    let dialog = CaptureDialog::open(
        &slot,
        session(Arc::new(camera), &endpoint, document.clone(), &board),
    )
    .unwrap();
    let outcome = capture_once(dialog, &credential()).await;

    assert_eq!(outcome, DialogOutcome::Inserted(RecognizedText::new("E=mc^2")));
    assert_eq!(document.snapshot(), "Physics\nE=mc^2");
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(service.requests.load(Ordering::SeqCst), 1);
    assert_eq!(*service.app_keys.lock().unwrap(), vec!["test-key"]);
    assert!(board.notices().is_empty());
    assert!(!slot.is_occupied());
}

#[tokio::test]
async fn test_scenario_server_error_is_noticed() {
    let (endpoint, _service) = spawn_service(500, "internal", Duration::ZERO).await;
    let (camera, stops) = CountingCamera::new(1);
    let document = Arc::new(MemoryDocument::new("unchanged"));
    let board = NoticeBoard::new();

    let dialog = CaptureDialog::open(
        &DialogSlot::new(),
        session(Arc::new(camera), &endpoint, document.clone(), &board),
    )
    .unwrap();
    let outcome = capture_once(dialog, &credential()).await;

    assert_eq!(
        outcome,
        DialogOutcome::Failed("MathPix API returned error: 500".to_string())
    );
    assert_eq!(board.notices(), vec!["MathPix API returned error: 500"]);
    assert_eq!(document.snapshot(), "unchanged");
    assert_eq!(document.replace_count(), 0);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scenario_error_body_with_ok_status_is_noticed() {
    let (endpoint, _service) =
        spawn_service(200, r#"{"error": "invalid image"}"#, Duration::ZERO).await;
    let (camera, stops) = CountingCamera::new(1);
    let document = Arc::new(MemoryDocument::new("unchanged"));
    let board = NoticeBoard::new();

    let dialog = CaptureDialog::open(
        &DialogSlot::new(),
        session(Arc::new(camera), &endpoint, document.clone(), &board),
    )
    .unwrap();
    let outcome = capture_once(dialog, &credential()).await;

    assert_eq!(
        outcome,
        DialogOutcome::Failed("MathPix API returned error: invalid image".to_string())
    );
    assert_eq!(board.notices(), vec!["MathPix API returned error: invalid image"]);
    assert_eq!(document.snapshot(), "unchanged");
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scenario_denied_device_alerts_and_sends_nothing() {
    let (endpoint, service) = spawn_service(200, r#"{"text": "x"}"#, Duration::ZERO).await;
    let document = Arc::new(MemoryDocument::new(""));
    let board = NoticeBoard::new();

    let dialog = CaptureDialog::open(
        &DialogSlot::new(),
        session(Arc::new(DeniedCamera), &endpoint, document.clone(), &board),
    )
    .unwrap();
    assert_eq!(dialog.content().status(), DialogStatus::Unavailable);
    assert!(dialog.is_open());
    let alert = board.current_alert().unwrap();
    assert!(alert.starts_with("could not connect stream: "));

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (controller, state_rx) = DialogController::new(dialog, credential(), cmd_rx);
    assert_eq!(state_rx.borrow().alert.as_deref(), Some(alert.as_str()));
    assert_eq!(state_rx.borrow().status, DialogStatus::Unavailable);

    // Take-photo is ignored; the dialog stays open until closed.
    cmd_tx.send(DialogCommand::TakePhoto).unwrap();
    cmd_tx.send(DialogCommand::Close).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(2), controller.run())
        .await
        .expect("controller did not finish");

    assert_eq!(outcome, DialogOutcome::Closed);
    assert_eq!(service.requests.load(Ordering::SeqCst), 0);
    assert_eq!(document.replace_count(), 0);
    assert!(board.notices().is_empty());
}

// ── Stream lifetime ────────────────────────────────────────

#[tokio::test]
async fn test_every_track_stopped_exactly_once_on_close() {
    let (camera, stops) = CountingCamera::new(3);
    let board = NoticeBoard::new();
    let mut dialog = CaptureDialog::open(
        &DialogSlot::new(),
        session(
            Arc::new(camera),
            "http://127.0.0.1:9/v3/text",
            Arc::new(MemoryDocument::default()),
            &board,
        ),
    )
    .unwrap();

    dialog.close();
    assert_eq!(stops.load(Ordering::SeqCst), 3);
    dialog.close();
    drop(dialog);
    assert_eq!(stops.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_close_during_request_discards_result() {
    let (endpoint, service) =
        spawn_service(200, r#"{"text": "late"}"#, Duration::from_secs(30)).await;
    let (camera, stops) = CountingCamera::new(1);
    let document = Arc::new(MemoryDocument::new("before"));
    let board = NoticeBoard::new();

    let dialog = CaptureDialog::open(
        &DialogSlot::new(),
        session(Arc::new(camera), &endpoint, document.clone(), &board),
    )
    .unwrap();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (controller, mut state_rx) = DialogController::new(dialog, credential(), cmd_rx);
    let handle = tokio::spawn(controller.run());

    cmd_tx.send(DialogCommand::TakePhoto).unwrap();
    tokio::time::timeout(
        Duration::from_secs(2),
        state_rx.wait_for(|s| s.status == DialogStatus::Recognizing),
    )
    .await
    .expect("never started recognizing")
    .expect("controller gone");

    // Wait until the request has reached the server.
    for _ in 0..200 {
        if service.requests.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(service.requests.load(Ordering::SeqCst), 1);

    cmd_tx.send(DialogCommand::Close).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("close did not interrupt the request")
        .unwrap();

    assert_eq!(outcome, DialogOutcome::Abandoned);
    assert_eq!(document.snapshot(), "before");
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert!(board.notices().is_empty());
}

#[tokio::test]
async fn test_request_keeps_running_after_close() {
    let (endpoint, service) =
        spawn_service(200, r#"{"text": "late"}"#, Duration::from_millis(300)).await;
    let (camera, stops) = CountingCamera::new(1);
    let document = Arc::new(MemoryDocument::new("before"));
    let board = NoticeBoard::new();

    let dialog = CaptureDialog::open(
        &DialogSlot::new(),
        session(Arc::new(camera), &endpoint, document.clone(), &board),
    )
    .unwrap();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (controller, _state_rx) = DialogController::new(dialog, credential(), cmd_rx);
    let handle = tokio::spawn(controller.run());

    cmd_tx.send(DialogCommand::TakePhoto).unwrap();
    for _ in 0..200 {
        if service.requests.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cmd_tx.send(DialogCommand::Close).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("close did not return promptly")
        .unwrap();
    assert_eq!(outcome, DialogOutcome::Abandoned);
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    // The server still answers the detached request.
    for _ in 0..200 {
        if service.responses.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(service.responses.load(Ordering::SeqCst), 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(document.snapshot(), "before");
    assert_eq!(document.replace_count(), 0);
    assert!(board.notices().is_empty());
}

#[tokio::test]
async fn test_second_dialog_rejected_while_first_open() {
    let board = NoticeBoard::new();
    let slot = DialogSlot::new();
    let (first_camera, first_stops) = CountingCamera::new(1);
    let (second_camera, second_stops) = CountingCamera::new(1);

    let first = CaptureDialog::open(
        &slot,
        session(
            Arc::new(first_camera),
            "http://127.0.0.1:9/v3/text",
            Arc::new(MemoryDocument::default()),
            &board,
        ),
    )
    .unwrap();

    let second = CaptureDialog::open(
        &slot,
        session(
            Arc::new(second_camera),
            "http://127.0.0.1:9/v3/text",
            Arc::new(MemoryDocument::default()),
            &board,
        ),
    );
    assert!(matches!(second, Err(WorkflowError::DialogAlreadyOpen)));
    // The rejected session never acquired its camera.
    assert_eq!(second_stops.load(Ordering::SeqCst), 0);

    drop(first);
    assert_eq!(first_stops.load(Ordering::SeqCst), 1);
    assert!(!slot.is_occupied());
}

#[tokio::test]
async fn test_controller_end_to_end_with_file_document() {
    let (endpoint, _service) =
        spawn_service(200, r#"{"text": "$\\sum_{i=1}^n i$"}"#, Duration::ZERO).await;
    let dir = std::env::temp_dir().join("paper2md_workflow_file_doc");
    let _ = std::fs::remove_dir_all(&dir);
    let path = dir.join("inbox.md");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(&path, "# Inbox\n").unwrap();

    let (camera, stops) = CountingCamera::new(1);
    let board = NoticeBoard::new();
    let dialog = CaptureDialog::open(
        &DialogSlot::new(),
        session(
            Arc::new(camera),
            &endpoint,
            Arc::new(FileDocument::new(&path)),
            &board,
        ),
    )
    .unwrap();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (controller, state_rx) = DialogController::new(dialog, credential(), cmd_rx);
    assert_eq!(state_rx.borrow().resolution, Some((64, 48)));

    cmd_tx.send(DialogCommand::TakePhoto).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), controller.run())
        .await
        .expect("controller did not finish");

    assert!(matches!(outcome, DialogOutcome::Inserted(_)));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "# Inbox\n$\\sum_{i=1}^n i$"
    );
    assert_eq!(state_rx.borrow().status, DialogStatus::Closed);
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}
