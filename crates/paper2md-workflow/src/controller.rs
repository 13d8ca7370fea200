use crate::dialog::CaptureDialog;
use crate::session::CaptureSession;
use paper2md_core::{
    Credential, DialogCommand, DialogState, DialogStatus, RecognitionError, RecognizedText,
    WorkflowError,
};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

pub const DEFAULT_PREVIEW_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_PREVIEW_SIZE: (u32, u32) = (128, 96);

/// How a dialog run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    /// Text was recognized and appended to the document.
    Inserted(RecognizedText),
    /// The request failed; the message has been sent to the notifier.
    Failed(String),
    /// Closed by the user before any photo was taken.
    Closed,
    /// Closed while a request was in flight; its result was discarded.
    Abandoned,
}

/// Drives an open capture dialog from UI commands and publishes its state.
pub struct DialogController {
    dialog: CaptureDialog<CaptureSession>,
    credential: Credential,
    state_tx: watch::Sender<DialogState>,
    cmd_rx: mpsc::UnboundedReceiver<DialogCommand>,
    preview_size: (u32, u32),
    preview_interval: Duration,
    frames_shown: u64,
}

impl DialogController {
    pub fn new(
        dialog: CaptureDialog<CaptureSession>,
        credential: Credential,
        cmd_rx: mpsc::UnboundedReceiver<DialogCommand>,
    ) -> (Self, watch::Receiver<DialogState>) {
        let (state_tx, state_rx) = watch::channel(DialogState::default());
        let controller = Self {
            dialog,
            credential,
            state_tx,
            cmd_rx,
            preview_size: DEFAULT_PREVIEW_SIZE,
            preview_interval: DEFAULT_PREVIEW_INTERVAL,
            frames_shown: 0,
        };
        controller.publish(None);
        (controller, state_rx)
    }

    pub fn with_preview_size(mut self, width: u32, height: u32) -> Self {
        self.preview_size = (width, height);
        self
    }

    pub fn with_preview_interval(mut self, interval: Duration) -> Self {
        self.preview_interval = interval;
        self
    }

    fn build_state(&self, status: DialogStatus) -> DialogState {
        let session = self.dialog.content();
        DialogState {
            status,
            device_label: session.device_label().to_string(),
            resolution: session.resolution(),
            engine: session.engine_name().to_string(),
            document: session.document_name().to_string(),
            alert: session.alert().map(str::to_string),
            preview: self.state_tx.borrow().preview.clone(),
            frames_shown: self.frames_shown,
        }
    }

    fn publish(&self, status: Option<DialogStatus>) {
        let status = status.unwrap_or_else(|| self.dialog.content().status());
        let state = self.build_state(status);
        self.state_tx.send_replace(state);
    }

    fn refresh_preview(&mut self) {
        let (width, height) = self.preview_size;
        let Some(frame) = self.dialog.content().preview(width, height) else {
            return;
        };
        self.frames_shown += 1;
        let frames_shown = self.frames_shown;
        self.state_tx.send_modify(|state| {
            state.preview = Some(frame);
            state.frames_shown = frames_shown;
        });
    }

    /// Run until the dialog closes, then close it and return the outcome.
    pub async fn run(mut self) -> DialogOutcome {
        let mut ticker = tokio::time::interval(self.preview_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let outcome = loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(DialogCommand::TakePhoto) => {
                        let status = self.dialog.content().status();
                        if !status.can_capture() {
                            tracing::debug!(status = status.label(), "take-photo ignored");
                            continue;
                        }
                        break self.take_photo().await;
                    }
                    Some(DialogCommand::Close) | None => break DialogOutcome::Closed,
                },
                _ = ticker.tick() => self.refresh_preview(),
            }
        };

        self.dialog.close();
        self.publish(Some(DialogStatus::Closed));
        tracing::info!(?outcome, "capture dialog finished");
        outcome
    }

    async fn take_photo(&mut self) -> DialogOutcome {
        let image = match self.dialog.content().snapshot() {
            Ok(image) => image,
            Err(e) => return outcome_of(self.dialog.content_mut().deliver(Err(e)).await),
        };
        self.publish(Some(DialogStatus::Recognizing));
        self.dialog.content_mut().note_request();

        // The request runs detached so closing the dialog never cancels it.
        let mut request = self
            .dialog
            .content()
            .spawn_recognition(image, self.credential.clone());
        let result = loop {
            tokio::select! {
                joined = &mut request => break Some(joined),
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(DialogCommand::TakePhoto) => {
                        tracing::debug!("request already in flight, take-photo ignored");
                    }
                    Some(DialogCommand::Close) | None => break None,
                },
            }
        };

        match result {
            Some(joined) => {
                let result = match joined {
                    Ok(result) => result.map_err(WorkflowError::from),
                    Err(e) => Err(WorkflowError::Recognition(RecognitionError::Transport {
                        service: self.dialog.content().engine_name().to_string(),
                        message: e.to_string(),
                    })),
                };
                outcome_of(self.dialog.content_mut().deliver(result).await)
            }
            None => {
                tracing::info!("dialog closed with a request in flight, ignoring its result");
                DialogOutcome::Abandoned
            }
        }
    }
}

/// Take one photo straight away without a UI, then close the dialog.
pub async fn capture_once(
    mut dialog: CaptureDialog<CaptureSession>,
    credential: &Credential,
) -> DialogOutcome {
    let outcome = match dialog.content_mut().capture_and_submit(credential).await {
        Err(WorkflowError::NoStream) => DialogOutcome::Closed,
        result => outcome_of(result),
    };
    dialog.close();
    outcome
}

fn outcome_of(result: Result<RecognizedText, WorkflowError>) -> DialogOutcome {
    match result {
        Ok(text) => DialogOutcome::Inserted(text),
        Err(e) => DialogOutcome::Failed(e.to_string()),
    }
}
