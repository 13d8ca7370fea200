use crossterm::event::{KeyCode, KeyEvent};
use paper2md_core::{DialogCommand, DialogState, DialogStatus};

use crate::log_layer::LogBuffer;

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    None,
    /// Send `Close` and leave the UI loop.
    Close,
    Command(DialogCommand),
}

pub struct App {
    pub state: DialogState,
    pub should_quit: bool,
    pub logs: LogBuffer,
    pub log_scroll: usize,
    pub log_auto_scroll: bool,
    dismissed_alert: Option<String>,
}

impl App {
    pub fn new(logs: LogBuffer) -> Self {
        Self {
            state: DialogState::default(),
            should_quit: false,
            logs,
            log_scroll: 0,
            log_auto_scroll: true,
            dismissed_alert: None,
        }
    }

    pub fn update_state(&mut self, new_state: DialogState) {
        self.state = new_state;
        if self.state.status == DialogStatus::Closed {
            self.should_quit = true;
        }
    }

    /// The alert popup text, unless the user has dismissed it.
    pub fn visible_alert(&self) -> Option<&str> {
        let alert = self.state.alert.as_deref()?;
        if self.dismissed_alert.as_deref() == Some(alert) {
            return None;
        }
        Some(alert)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
                return AppAction::Close;
            }
            KeyCode::Enter if self.visible_alert().is_some() => {
                self.dismissed_alert = self.state.alert.clone();
                return AppAction::None;
            }
            _ => {}
        }

        if self.visible_alert().is_some() {
            return AppAction::None;
        }

        match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => {
                if self.state.status.can_capture() {
                    AppAction::Command(DialogCommand::TakePhoto)
                } else {
                    AppAction::None
                }
            }
            KeyCode::Up => {
                self.log_scroll = self.log_scroll.saturating_add(1);
                self.log_auto_scroll = false;
                AppAction::None
            }
            KeyCode::Down => {
                self.log_scroll = self.log_scroll.saturating_sub(1);
                if self.log_scroll == 0 {
                    self.log_auto_scroll = true;
                }
                AppAction::None
            }
            KeyCode::Char('G') => {
                self.log_scroll = 0;
                self.log_auto_scroll = true;
                AppAction::None
            }
            _ => AppAction::None,
        }
    }
}
