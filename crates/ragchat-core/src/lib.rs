pub mod types;
pub mod error;
pub mod format;
pub mod suggestion;

pub use types::{
    Document,
    DocumentType,
    Message,
    MessageId,
    Role,
    Notification,
    NotificationLevel,
};

pub use error::RequestError;
pub use format::{format_file_size, is_accepted_upload, ACCEPTED_EXTENSIONS};
pub use suggestion::{Suggestion, SUGGESTIONS};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
