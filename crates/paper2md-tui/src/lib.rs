pub mod app;
pub mod log_layer;
pub mod preview;
pub mod ui;

use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use paper2md_core::{DialogCommand, DialogState};
use ratatui::DefaultTerminal;
use tokio::sync::{mpsc, watch};

pub use app::{App, AppAction};
pub use log_layer::{new_log_buffer, LogBuffer, TuiLogLayer, DEFAULT_LOG_CAPACITY};
pub use preview::PreviewWidget;

const FRAME_POLL: Duration = Duration::from_millis(33);

/// Run the capture dialog UI. Returns once the user closes the dialog or
/// the controller reports it closed.
pub async fn run(
    mut state_rx: watch::Receiver<DialogState>,
    cmd_tx: mpsc::UnboundedSender<DialogCommand>,
    log_buffer: LogBuffer,
) -> std::io::Result<()> {
    let mut terminal = ratatui::init();
    let result = run_loop(&mut terminal, &mut state_rx, &cmd_tx, log_buffer).await;
    ratatui::restore();
    result
}

async fn run_loop(
    terminal: &mut DefaultTerminal,
    state_rx: &mut watch::Receiver<DialogState>,
    cmd_tx: &mpsc::UnboundedSender<DialogCommand>,
    log_buffer: LogBuffer,
) -> std::io::Result<()> {
    let mut app = App::new(log_buffer);
    app.update_state(state_rx.borrow_and_update().clone());

    while !app.should_quit {
        match state_rx.has_changed() {
            Ok(true) => app.update_state(state_rx.borrow_and_update().clone()),
            Ok(false) => {}
            // Controller finished and dropped its sender.
            Err(_) => break,
        }

        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll briefly so the preview keeps refreshing while idle.
        if event::poll(FRAME_POLL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.handle_key(key) {
                        AppAction::Close => {
                            let _ = cmd_tx.send(DialogCommand::Close);
                        }
                        AppAction::Command(cmd) => {
                            let _ = cmd_tx.send(cmd);
                        }
                        AppAction::None => {}
                    }
                }
            }
        }
        tokio::task::yield_now().await;
    }

    Ok(())
}
