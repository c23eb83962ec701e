use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use ragchat_config::ServerConfig;
use ragchat_core::{Document, DocumentType, RequestError};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::Serialize;
use tracing::{debug, warn};

use crate::stream::ChatStream;

pub type Result<T> = std::result::Result<T, RequestError>;

/// Operations the controller needs from the RAG backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Documents uploaded under this session
    async fn list_documents(&self, session_id: &str) -> Result<Vec<Document>>;

    /// Upload one file and return the record the backend created for it
    async fn upload_document(&self, file: &UploadFile, session_id: &str) -> Result<Document>;

    /// Remove a document from the knowledge base
    async fn delete_document(&self, document_id: &str, session_id: &str) -> Result<()>;

    /// Ask a question; the answer arrives as a stream of text chunks
    async fn stream_chat(&self, session_id: &str, message: &str) -> Result<ChatStream>;

    /// Whether the backend can be reached at all
    async fn health_check(&self) -> bool {
        true
    }
}

/// A file picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping only its file name
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", path.display()),
                )
            })?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn mime_type(&self) -> &'static str {
        let lower = self.name.to_lowercase();
        if lower.ends_with(".docx") {
            return "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
        }
        match DocumentType::from_filename(&self.name) {
            DocumentType::Pdf => "application/pdf",
            DocumentType::Md => "text/markdown",
            DocumentType::Doc => "application/msword",
            DocumentType::Txt if lower.ends_with(".txt") => "text/plain",
            DocumentType::Txt => "application/octet-stream",
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    session_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    session_id: &'a str,
}

/// HTTP implementation of [`Backend`]
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: Url,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RequestError::new(format!("Invalid base url '{}': {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RequestError::new(format!(
                "Invalid base url '{}'",
                config.base_url
            )));
        }

        let mut builder =
            Client::builder().connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(transport)?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Append path segments to the base address, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RequestError::new(format!("Invalid base url '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn transport(err: reqwest::Error) -> RequestError {
    RequestError::new(err.to_string())
}

async fn error_from_body(response: Response, fallback: &str) -> RequestError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!("Backend returned {}: {}", status, body);
    RequestError::from_body(&body, fallback)
}

#[async_trait]
impl Backend for HttpGateway {
    async fn list_documents(&self, session_id: &str) -> Result<Vec<Document>> {
        let url = self.endpoint(&["documents"])?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .query(&[("session_id", session_id)])
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            warn!("Listing documents failed with status {}", response.status());
            return Err(RequestError::new("Failed to fetch documents"));
        }

        response
            .json::<Vec<Document>>()
            .await
            .map_err(|e| RequestError::new(format!("Invalid document list: {}", e)))
    }

    async fn upload_document(&self, file: &UploadFile, session_id: &str) -> Result<Document> {
        let url = self.endpoint(&["upload"])?;
        debug!("POST {} ({}, {} bytes)", url, file.name, file.size());

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(file.mime_type())
            .map_err(transport)?;
        let form = Form::new()
            .part("file", part)
            .text("session_id", session_id.to_string());

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(error_from_body(response, "Failed to upload document").await);
        }

        response
            .json::<Document>()
            .await
            .map_err(|e| RequestError::new(format!("Invalid upload response: {}", e)))
    }

    async fn delete_document(&self, document_id: &str, session_id: &str) -> Result<()> {
        let url = self.endpoint(&["documents", document_id])?;
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(url)
            .json(&DeleteRequest { session_id })
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            warn!("Deleting document {} failed with status {}", document_id, response.status());
            return Err(RequestError::new("Failed to delete document"));
        }

        Ok(())
    }

    async fn stream_chat(&self, session_id: &str, message: &str) -> Result<ChatStream> {
        let url = self.endpoint(&["chat"])?;
        debug!("POST {} ({} chars)", url, message.chars().count());

        let response = self
            .client
            .post(url)
            .json(&ChatRequest { session_id, message })
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(error_from_body(response, "Chat request failed").await);
        }

        let bytes = response
            .bytes_stream()
            .map(|block| block.map(|b| b.to_vec()).map_err(transport));
        Ok(ChatStream::from_byte_stream(bytes))
    }

    async fn health_check(&self) -> bool {
        let Ok(url) = self.endpoint(&["health"]) else {
            return false;
        };
        match self.client.get(url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(&ServerConfig::new(base)).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let gw = gateway("http://localhost:8000");
        assert_eq!(
            gw.endpoint(&["documents"]).unwrap().as_str(),
            "http://localhost:8000/documents"
        );

        let gw = gateway("http://example.com/api/");
        assert_eq!(
            gw.endpoint(&["chat"]).unwrap().as_str(),
            "http://example.com/api/chat"
        );
    }

    #[test]
    fn test_endpoint_encodes_document_id() {
        let gw = gateway("http://localhost:8000");
        let url = gw.endpoint(&["documents", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/documents/a%20b%2Fc");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpGateway::new(&ServerConfig::new("not a url")).is_err());
        assert!(HttpGateway::new(&ServerConfig::new("mailto:someone@example.com")).is_err());
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(UploadFile::new("a.pdf", vec![]).mime_type(), "application/pdf");
        assert_eq!(UploadFile::new("a.md", vec![]).mime_type(), "text/markdown");
        assert_eq!(UploadFile::new("a.txt", vec![]).mime_type(), "text/plain");
        assert_eq!(
            UploadFile::new("a.docx", vec![]).mime_type(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(UploadFile::new("a.bin", vec![]).mime_type(), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_upload_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        tokio::fs::write(&path, b"# Notes").await.unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "notes.md");
        assert_eq!(file.size(), 7);
    }
}
