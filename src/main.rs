use anyhow::{Context, Result};
use clap::Parser;
use paper2md_camera::{CameraDevice, DeviceManager};
use paper2md_core::{AppConfig, DialogCommand, NoticeBoard};
use paper2md_document::{Document, FileDocument};
use paper2md_engine::{EngineRegistry, RecognitionEngine};
use paper2md_workflow::{
    capture_once, CaptureDialog, CaptureSession, DialogController, DialogOutcome, DialogSlot,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "paper2md.toml";

#[derive(Parser)]
#[command(
    name = "paper2md",
    about = "Photograph a page and append the recognized text to a markdown note"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Document to append to (overrides `[document] path`)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Take one photo immediately, without the terminal UI
    #[arg(long)]
    headless: bool,

    /// List the cameras the compiled-in backends can see, then exit
    #[arg(long)]
    list_cameras: bool,
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if path == Path::new(DEFAULT_CONFIG_PATH) && !path.exists() {
        return Ok(AppConfig::default());
    }
    AppConfig::load_from_file(path).with_context(|| format!("failed to load config from {:?}", path))
}

/// Drain the board's alert and notices into `out`, one per line.
fn write_notices(board: &NoticeBoard, out: &mut impl Write) -> std::io::Result<()> {
    if let Some(alert) = board.take_alert() {
        writeln!(out, "{alert}")?;
    }
    for notice in board.take_notices() {
        writeln!(out, "{notice}")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let device_manager = DeviceManager::new();
    if cli.list_cameras {
        for (backend, device) in device_manager.list_devices() {
            println!("{backend}\t{device}");
        }
        return Ok(());
    }

    let mut config = load_config(&cli.config)?;
    if let Some(path) = cli.document {
        config.document.path = path;
    }

    // TUI mode logs into the dialog's panel; headless mode logs to stderr.
    let log_buffer = paper2md_tui::new_log_buffer();
    let env_filter =
        EnvFilter::try_new(&config.general.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(cli.headless.then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
        }))
        .with((!cli.headless).then(|| {
            paper2md_tui::TuiLogLayer::new(
                Arc::clone(&log_buffer),
                paper2md_tui::DEFAULT_LOG_CAPACITY,
            )
        }));
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!(
        camera = %config.camera.backend,
        engine = %config.recognition.engine,
        document = %config.document.path.display(),
        "paper2md starting"
    );

    let camera: Arc<dyn CameraDevice> = Arc::from(
        device_manager
            .get_device(&config.camera)
            .with_context(|| format!("failed to set up camera backend '{}'", config.camera.backend))?,
    );

    let engine: Arc<dyn RecognitionEngine> = Arc::from(
        EngineRegistry::new()
            .build(
                &config.recognition.engine,
                config.recognition.engine_table(),
            )
            .await
            .with_context(|| {
                format!(
                    "failed to initialize recognition engine '{}'",
                    config.recognition.engine
                )
            })?,
    );

    let document: Arc<dyn Document> = Arc::new(FileDocument::new(&config.document.path));
    let board = NoticeBoard::new();
    let session = CaptureSession::new(camera, engine, document, Arc::new(board.clone()))
        .with_format(config.camera.format);

    let slot = DialogSlot::new();
    let dialog = CaptureDialog::open(&slot, session).context("failed to open capture dialog")?;
    let credential = config.credential();

    let outcome = if cli.headless {
        capture_once(dialog, &credential).await
    } else {
        let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();
        let (controller, state_rx) = DialogController::new(dialog, credential, cmd_rx);
        let controller_handle = tokio::spawn(controller.run());

        let ui_result = paper2md_tui::run(state_rx, cmd_tx.clone(), log_buffer).await;
        // The UI may exit on its own (terminal error); make sure the dialog closes.
        let _ = cmd_tx.send(DialogCommand::Close);
        let outcome = controller_handle
            .await
            .context("capture dialog task failed")?;
        ui_result.context("TUI error")?;
        outcome
    };

    // Notices must reach the user whatever the log level.
    write_notices(&board, &mut std::io::stderr().lock())
        .context("failed to write notices to stderr")?;

    match outcome {
        DialogOutcome::Inserted(text) => {
            if cli.headless {
                println!("{}", text.text);
            }
            tracing::info!(
                document = %config.document.path.display(),
                "appended {} characters",
                text.text.chars().count()
            );
        }
        DialogOutcome::Failed(message) => tracing::warn!("capture failed: {message}"),
        DialogOutcome::Closed | DialogOutcome::Abandoned => {
            tracing::info!("dialog closed without changes")
        }
    }

    Ok(())
}
