use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ragchat_client::{collect_upload_files, Backend, ChatController, ChatState, Notification};
use ragchat_core::SUGGESTIONS;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, Instrument};

const TOAST_TTL: Duration = Duration::from_secs(5);
const PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Connecting,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "● Online"),
            ConnectionStatus::Disconnected => write!(f, "○ Offline"),
            ConnectionStatus::Connecting => write!(f, "◐ Connecting"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    /// Typing a file or directory to upload
    UploadPath,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub notification: Notification,
    pub(crate) shown_at: Instant,
}

pub struct App<B: Backend + 'static> {
    controller: ChatController<B>,
    changes: watch::Receiver<u64>,
    pub state: ChatState,
    pub input: String,
    pub upload_path: String,
    pub input_mode: InputMode,
    pub status: ConnectionStatus,
    pub selected_document: usize,
    pub selected_suggestion: usize,
    /// Lines scrolled up from the bottom of the transcript; 0 follows new text
    pub scroll_offset: usize,
    pub toasts: VecDeque<Toast>,
    local_tx: mpsc::UnboundedSender<Notification>,
    local_rx: mpsc::UnboundedReceiver<Notification>,
    health_rx: Option<oneshot::Receiver<bool>>,
}

impl<B: Backend + 'static> App<B> {
    pub fn new(controller: ChatController<B>) -> Self {
        let changes = controller.subscribe();
        let state = controller.snapshot();
        let (local_tx, local_rx) = mpsc::unbounded_channel();

        Self {
            controller,
            changes,
            state,
            input: String::new(),
            upload_path: String::new(),
            input_mode: InputMode::Normal,
            status: ConnectionStatus::Connecting,
            selected_document: 0,
            selected_suggestion: 0,
            scroll_offset: 0,
            toasts: VecDeque::new(),
            local_tx,
            local_rx,
            health_rx: None,
        }
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    /// Load documents and probe the backend in the background
    pub fn refresh(&mut self) {
        let controller = self.controller.clone();
        tokio::spawn(
            async move {
                controller.initialize().await;
            }
            .in_current_span(),
        );
        self.check_connection();
    }

    pub fn check_connection(&mut self) {
        self.status = ConnectionStatus::Connecting;
        let (tx, rx) = oneshot::channel();
        let controller = self.controller.clone();
        tokio::spawn(
            async move {
                let _ = tx.send(controller.backend().health_check().await);
            }
            .in_current_span(),
        );
        self.health_rx = Some(rx);
    }

    /// Pull controller state and pending notifications into the view
    pub fn sync(&mut self) {
        if self.changes.has_changed().unwrap_or(false) {
            self.changes.borrow_and_update();
            self.state = self.controller.snapshot();
        }

        for notification in self.controller.take_notifications() {
            self.push_toast(notification);
        }
        while let Ok(notification) = self.local_rx.try_recv() {
            self.push_toast(notification);
        }

        if let Some(rx) = self.health_rx.as_mut() {
            match rx.try_recv() {
                Ok(online) => {
                    self.status = if online {
                        ConnectionStatus::Connected
                    } else {
                        ConnectionStatus::Disconnected
                    };
                    self.health_rx = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    self.status = ConnectionStatus::Disconnected;
                    self.health_rx = None;
                }
            }
        }

        let count = self.state.documents.len();
        if self.selected_document >= count {
            self.selected_document = count.saturating_sub(1);
        }
    }

    pub fn on_tick(&mut self) {
        while let Some(toast) = self.toasts.front() {
            if toast.shown_at.elapsed() < TOAST_TTL {
                break;
            }
            self.toasts.pop_front();
        }
    }

    fn push_toast(&mut self, notification: Notification) {
        debug!("Toast: {}", notification);
        self.toasts.push_back(Toast {
            notification,
            shown_at: Instant::now(),
        });
    }

    pub fn dismiss_toasts(&mut self) {
        self.toasts.clear();
        self.controller.dismiss_notifications();
    }

    pub fn latest_toast(&self) -> Option<&Toast> {
        self.toasts.back()
    }

    /// Send the composer text, or the highlighted suggestion on an empty chat
    pub fn send_message(&mut self) {
        if self.state.is_streaming {
            return;
        }

        let content = self.input.trim().to_string();
        if content.is_empty() {
            if self.state.messages.is_empty() {
                self.send_suggestion();
            }
            return;
        }

        self.input.clear();
        self.scroll_to_bottom();
        let controller = self.controller.clone();
        tokio::spawn(
            async move {
                controller.send_message(&content).await;
            }
            .in_current_span(),
        );
    }

    fn send_suggestion(&mut self) {
        let index = self.selected_suggestion;
        info!("Sending suggestion {}", index);
        self.scroll_to_bottom();
        let controller = self.controller.clone();
        tokio::spawn(
            async move {
                controller.send_suggestion(index).await;
            }
            .in_current_span(),
        );
    }

    pub fn next_suggestion(&mut self) {
        self.selected_suggestion = (self.selected_suggestion + 1) % SUGGESTIONS.len();
    }

    pub fn start_upload_prompt(&mut self) {
        self.input_mode = InputMode::UploadPath;
        self.upload_path.clear();
    }

    pub fn cancel_upload_prompt(&mut self) {
        self.input_mode = InputMode::Normal;
        self.upload_path.clear();
    }

    pub fn submit_upload_path(&mut self) {
        let path = std::mem::take(&mut self.upload_path).trim().to_string();
        self.input_mode = InputMode::Normal;
        if path.is_empty() {
            return;
        }
        if self.state.is_uploading {
            self.push_toast(Notification::error(
                "Upload Failed",
                "Another upload is still running",
            ));
            return;
        }

        let controller = self.controller.clone();
        let local = self.local_tx.clone();
        tokio::spawn(
            async move {
                match collect_upload_files(&path).await {
                    Ok(selection) => {
                        if !selection.skipped.is_empty() {
                            let _ = local.send(Notification::error(
                                "Skipped",
                                format!(
                                    "{} unsupported file{} ignored",
                                    selection.skipped.len(),
                                    if selection.skipped.len() > 1 { "s" } else { "" }
                                ),
                            ));
                        }
                        if selection.is_empty() {
                            let _ = local.send(Notification::error(
                                "Nothing to Upload",
                                format!("No PDF, TXT, MD, DOC or DOCX files at {}", path),
                            ));
                            return;
                        }
                        controller.handle_file_drop(selection.files).await;
                    }
                    Err(e) => {
                        let _ = local.send(Notification::error(
                            "Upload Failed",
                            format!("Could not read {}: {}", path, e),
                        ));
                    }
                }
            }
            .in_current_span(),
        );
    }

    pub fn delete_selected(&mut self) {
        if self.state.deleting_id.is_some() {
            return;
        }
        let Some(document) = self.state.documents.get(self.selected_document) else {
            return;
        };
        let id = document.id.clone();
        let controller = self.controller.clone();
        tokio::spawn(
            async move {
                controller.handle_delete_document(&id).await;
            }
            .in_current_span(),
        );
    }

    pub fn select_next_document(&mut self) {
        if self.selected_document + 1 < self.state.documents.len() {
            self.selected_document += 1;
        }
    }

    pub fn select_previous_document(&mut self) {
        self.selected_document = self.selected_document.saturating_sub(1);
    }

    pub fn push_input(&mut self, c: char) {
        match self.input_mode {
            InputMode::Normal => self.input.push(c),
            InputMode::UploadPath => self.upload_path.push(c),
        }
    }

    pub fn pop_input(&mut self) {
        match self.input_mode {
            InputMode::Normal => self.input.pop(),
            InputMode::UploadPath => self.upload_path.pop(),
        };
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset += 1;
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn scroll_page_up(&mut self) {
        self.scroll_offset += PAGE;
    }

    pub fn scroll_page_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(PAGE);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }
}
