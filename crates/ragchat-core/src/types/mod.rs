pub mod message;
pub mod document;
pub mod notification;

pub use message::{Message, Role, MessageId};
pub use document::{Document, DocumentType};
pub use notification::{Notification, NotificationLevel};
