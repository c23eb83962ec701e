#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use futures::channel::mpsc;
use parking_lot::Mutex;
use ragchat_client::{Backend, ChatStream, Document, RequestError, UploadFile};

/// What the mock does for the next `stream_chat` call
pub enum ChatScript {
    /// Yield these text chunks, then finish
    Chunks(Vec<&'static str>),
    /// Yield these blocks (errors included), then finish
    Blocks(Vec<Result<Vec<u8>, RequestError>>),
    /// Fail before any chunk
    Refuse(RequestError),
    /// Chunks are fed by the test through a channel
    Channel(mpsc::UnboundedReceiver<Result<Vec<u8>, RequestError>>),
}

/// Mock backend for testing the controller
#[derive(Default)]
pub struct MockBackend {
    pub documents: Mutex<Vec<Document>>,
    pub list_error: Option<RequestError>,
    pub failing_uploads: HashSet<String>,
    pub delete_error: Option<RequestError>,
    pub chat_scripts: Mutex<VecDeque<ChatScript>>,
    pub calls: Mutex<Vec<String>>,
    pub next_id: Mutex<u32>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Mutex::new(documents),
            ..Self::default()
        }
    }

    pub fn with_chat(script: ChatScript) -> Self {
        let backend = Self::default();
        backend.chat_scripts.lock().push_back(script);
        backend
    }

    pub fn failing_uploads(names: &[&str]) -> Self {
        Self {
            failing_uploads: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_documents(&self, session_id: &str) -> Result<Vec<Document>, RequestError> {
        self.calls.lock().push(format!("list:{}", session_id));
        match &self.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.documents.lock().clone()),
        }
    }

    async fn upload_document(
        &self,
        file: &UploadFile,
        session_id: &str,
    ) -> Result<Document, RequestError> {
        self.calls.lock().push(format!("upload:{}:{}", file.name, session_id));
        if self.failing_uploads.contains(&file.name) {
            return Err(RequestError::new(format!("cannot index {}", file.name)));
        }
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            format!("doc-{}", next)
        };
        Ok(Document::new(id, file.name.clone(), file.size()))
    }

    async fn delete_document(&self, document_id: &str, session_id: &str) -> Result<(), RequestError> {
        self.calls.lock().push(format!("delete:{}:{}", document_id, session_id));
        match &self.delete_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn stream_chat(&self, session_id: &str, message: &str) -> Result<ChatStream, RequestError> {
        self.calls.lock().push(format!("chat:{}:{}", session_id, message));
        let script = self
            .chat_scripts
            .lock()
            .pop_front()
            .unwrap_or(ChatScript::Chunks(Vec::new()));
        match script {
            ChatScript::Chunks(chunks) => Ok(ChatStream::from_text_chunks(chunks)),
            ChatScript::Blocks(blocks) => {
                Ok(ChatStream::from_byte_stream(futures::stream::iter(blocks)))
            }
            ChatScript::Refuse(err) => Err(err),
            ChatScript::Channel(rx) => Ok(ChatStream::from_byte_stream(rx)),
        }
    }
}

pub fn upload(name: &str, bytes: &[u8]) -> UploadFile {
    UploadFile::new(name, bytes.to_vec())
}
