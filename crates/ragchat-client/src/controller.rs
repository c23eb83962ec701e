use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use ragchat_core::{Document, Message, Notification, RequestError, SUGGESTIONS};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::gateway::{Backend, UploadFile};

/// Everything the views render
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub documents: Vec<Document>,
    pub is_streaming: bool,
    pub is_uploading: bool,
    /// 0 to 100
    pub upload_progress: f32,
    pub deleting_id: Option<String>,
    pub notifications: Vec<Notification>,
}

impl ChatState {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            ..Self::default()
        }
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Replace the list with `fetched`, keeping local changes made since
    /// `before` was taken. Returns the resulting number of documents.
    fn merge_documents(&mut self, before: &HashSet<String>, fetched: Vec<Document>) -> usize {
        let current: HashSet<String> = self.documents.iter().map(|d| d.id.clone()).collect();
        let added_locally: Vec<Document> = self
            .documents
            .drain(..)
            .filter(|d| !before.contains(&d.id))
            .collect();

        for doc in fetched {
            let deleted_locally = before.contains(&doc.id) && !current.contains(&doc.id);
            if !deleted_locally {
                self.upsert_document(doc);
            }
        }
        for doc in added_locally {
            if self.document(&doc.id).is_none() {
                self.documents.push(doc);
            }
        }
        self.documents.len()
    }

    /// Begin a multi-file upload
    fn begin_upload(&mut self) {
        self.is_uploading = true;
        self.upload_progress = 0.0;
    }

    /// Record the `uploaded`-th success out of `total` files
    fn record_upload(&mut self, document: Document, uploaded: usize, total: usize) {
        self.upsert_document(document);
        self.upload_progress = uploaded as f32 / total as f32 * 100.0;
    }

    fn finish_upload(&mut self) {
        self.is_uploading = false;
        self.upload_progress = 0.0;
    }

    /// Insert a document, replacing any entry with the same id in place
    fn upsert_document(&mut self, document: Document) {
        match self.documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => self.documents.push(document),
        }
    }
}

/// Result of [`ChatController::send_message`]
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Empty input, or another answer is still streaming
    Ignored,
    Completed { message_id: String, content: String },
    Failed(RequestError),
}

/// Result of [`ChatController::handle_file_drop`]
#[derive(Debug, Clone, Default)]
pub struct UploadOutcome {
    pub uploaded: Vec<Document>,
    pub failed: Vec<(String, RequestError)>,
}

/// Owns chat and document state and drives the backend.
///
/// Clones share state, so an operation can run on a spawned task while the
/// view keeps reading [`ChatController::snapshot`]. The state lock is never
/// held across an await, and streamed text is written to its message by id.
pub struct ChatController<B: Backend> {
    backend: Arc<B>,
    session_id: Arc<str>,
    state: Arc<RwLock<ChatState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl<B: Backend> Clone for ChatController<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session_id: Arc::clone(&self.session_id),
            state: Arc::clone(&self.state),
            revision: Arc::clone(&self.revision),
        }
    }
}

impl<B: Backend> ChatController<B> {
    pub fn new(backend: B, session_id: impl Into<String>) -> Self {
        Self::with_backend(Arc::new(backend), session_id)
    }

    pub fn with_backend(backend: Arc<B>, session_id: impl Into<String>) -> Self {
        let session_id: String = session_id.into();
        let (revision, _) = watch::channel(0);
        Self {
            backend,
            state: Arc::new(RwLock::new(ChatState::new(session_id.clone()))),
            session_id: session_id.into(),
            revision: Arc::new(revision),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ChatState {
        self.state.read().clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.read().is_streaming
    }

    /// Receiver that changes whenever the state does
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn update<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        let result = {
            let mut state = self.state.write();
            f(&mut state)
        };
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
        result
    }

    /// Load the session's documents. A failure leaves the list unchanged.
    ///
    /// The server list is merged with what happened locally while the request
    /// was in flight: documents uploaded meanwhile are kept and documents
    /// deleted meanwhile stay gone.
    pub async fn initialize(&self) -> usize {
        let before: HashSet<String> = self
            .state
            .read()
            .documents
            .iter()
            .map(|d| d.id.clone())
            .collect();

        match self.backend.list_documents(&self.session_id).await {
            Ok(documents) => {
                let count = self.update(|state| state.merge_documents(&before, documents));
                info!("Loaded {} documents for session {}", count, self.session_id);
                count
            }
            Err(e) => {
                // the backend may simply not be up yet
                info!("Could not load documents: {}", e);
                0
            }
        }
    }

    /// Send a user message and stream the answer into a new assistant message
    pub async fn send_message(&self, content: &str) -> SendOutcome {
        if content.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let user_message = Message::user(content);
        let placeholder = Message::assistant_placeholder();
        let placeholder_id = placeholder.id.clone();

        let started = self.update(|state| {
            if state.is_streaming {
                return false;
            }
            state.messages.push(user_message);
            state.messages.push(placeholder);
            state.is_streaming = true;
            true
        });
        if !started {
            debug!("Ignoring message while a response is streaming");
            return SendOutcome::Ignored;
        }

        let result = self.consume_stream(content, &placeholder_id).await;

        self.update(|state| {
            state.is_streaming = false;
            match result {
                Ok(content) => SendOutcome::Completed {
                    message_id: placeholder_id,
                    content,
                },
                Err(err) => {
                    error!("Chat error: {}", err);
                    state.messages.retain(|m| m.id != placeholder_id);
                    state.notifications.push(Notification::error(
                        "Error",
                        err.message_or("Failed to get response"),
                    ));
                    SendOutcome::Failed(err)
                }
            }
        })
    }

    /// Send one of the welcome-screen prompts
    pub async fn send_suggestion(&self, index: usize) -> SendOutcome {
        match SUGGESTIONS.get(index) {
            Some(suggestion) => self.send_message(suggestion.query).await,
            None => SendOutcome::Ignored,
        }
    }

    async fn consume_stream(
        &self,
        content: &str,
        placeholder_id: &str,
    ) -> Result<String, RequestError> {
        let mut stream = self.backend.stream_chat(&self.session_id, content).await?;
        let mut accumulated = String::new();

        while let Some(chunk) = stream.next_chunk().await? {
            accumulated.push_str(&chunk);
            self.update(|state| {
                if let Some(message) = state.messages.iter_mut().find(|m| m.id == placeholder_id) {
                    message.content.clone_from(&accumulated);
                }
            });
        }

        debug!("Stream finished with {} bytes", accumulated.len());
        Ok(accumulated)
    }

    /// Upload files one at a time.
    ///
    /// A failed file is reported and skipped; the rest still upload.
    pub async fn handle_file_drop(&self, files: Vec<UploadFile>) -> UploadOutcome {
        self.update(ChatState::begin_upload);

        let total = files.len();
        let mut outcome = UploadOutcome::default();

        for file in &files {
            match self.backend.upload_document(file, &self.session_id).await {
                Ok(document) => {
                    info!("Uploaded {} as {}", file.name, document.id);
                    outcome.uploaded.push(document.clone());
                    let uploaded = outcome.uploaded.len();
                    self.update(|state| state.record_upload(document, uploaded, total));
                }
                Err(err) => {
                    warn!("Upload of {} failed: {}", file.name, err);
                    self.update(|state| {
                        state.notifications.push(Notification::error(
                            "Upload Failed",
                            format!("Failed to upload {}", file.name),
                        ));
                    });
                    outcome.failed.push((file.name.clone(), err));
                }
            }
        }

        let uploaded = outcome.uploaded.len();
        self.update(|state| {
            if uploaded > 0 {
                state.notifications.push(Notification::success(
                    "Upload Complete",
                    format!(
                        "{} file{} uploaded successfully",
                        uploaded,
                        if uploaded > 1 { "s" } else { "" }
                    ),
                ));
            }
            state.finish_upload();
        });

        outcome
    }

    /// Delete a document; the local list only changes if the backend agrees
    pub async fn handle_delete_document(&self, id: &str) -> bool {
        self.update(|state| state.deleting_id = Some(id.to_string()));

        let result = self.backend.delete_document(id, &self.session_id).await;

        self.update(|state| {
            state.deleting_id = None;
            match result {
                Ok(()) => {
                    info!("Deleted document {}", id);
                    state.documents.retain(|d| d.id != id);
                    state.notifications.push(Notification::success(
                        "Document Deleted",
                        "The document has been removed from your knowledge base",
                    ));
                    true
                }
                Err(err) => {
                    error!("Delete error: {}", err);
                    state.notifications.push(Notification::error(
                        "Delete Failed",
                        "Failed to delete the document",
                    ));
                    false
                }
            }
        })
    }

    /// Remove and return pending notifications
    pub fn take_notifications(&self) -> Vec<Notification> {
        let taken = std::mem::take(&mut self.state.write().notifications);
        if !taken.is_empty() {
            self.revision.send_modify(|r| *r = r.wrapping_add(1));
        }
        taken
    }

    pub fn dismiss_notifications(&self) {
        self.take_notifications();
    }
}
