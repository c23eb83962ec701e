//! Client side of the RAG chat assistant.
//!
//! [`HttpGateway`] speaks the backend's HTTP contract, [`ChatStream`] turns a
//! chunked response into text pieces, and [`ChatController`] owns the chat
//! and document state the views render.

pub mod controller;
pub mod gateway;
pub mod session;
pub mod stream;
pub mod uploads;

pub use controller::{ChatController, ChatState, SendOutcome, UploadOutcome};
pub use gateway::{Backend, HttpGateway, UploadFile};
pub use session::{
    open_store, FileStore, KeyValueStore, MemoryStore, SessionIdentity, StoreError, SESSION_KEY,
};
pub use stream::{ChatStream, Utf8Decoder};
pub use uploads::{collect_from_paths, collect_upload_files, UploadSelection};

pub use ragchat_core::{Document, DocumentType, Message, Notification, RequestError, Role};
