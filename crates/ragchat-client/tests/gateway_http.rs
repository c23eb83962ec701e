use std::io::Write;

use mockito::{Matcher, Server};
use ragchat_client::{Backend, DocumentType, HttpGateway, UploadFile};
use ragchat_config::ServerConfig;
use serde_json::json;

fn gateway(server: &Server) -> HttpGateway {
    HttpGateway::new(&ServerConfig::new(server.url())).unwrap()
}

#[tokio::test]
async fn test_list_documents() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/documents")
        .match_query(Matcher::UrlEncoded("session_id".into(), "s1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"id": "1", "name": "a.pdf", "type": "pdf", "size": 1024, "uploadedAt": "2024-01-01T00:00:00Z"},
                {"id": "2", "name": "notes.md", "size": 5, "uploaded_at": "2024-01-02T08:30:00"}
            ]"#,
        )
        .create_async()
        .await;

    let docs = gateway(&server).list_documents("s1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].doc_type, DocumentType::Pdf);
    assert_eq!(docs[0].size, 1024);
    assert_eq!(docs[1].doc_type, DocumentType::Md);
    assert_eq!(docs[1].uploaded_at.to_rfc3339(), "2024-01-02T08:30:00+00:00");
}

#[tokio::test]
async fn test_list_documents_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/documents")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("database is down")
        .create_async()
        .await;

    let err = gateway(&server).list_documents("s1").await.unwrap_err();
    assert_eq!(err.message, "Failed to fetch documents");
}

#[tokio::test]
async fn test_upload_document_sends_multipart() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/upload")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".into()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="file"; filename="report.pdf""#.into()),
            Matcher::Regex(r#"name="session_id"\r\n\r\ns1\r\n"#.into()),
            Matcher::Regex("%PDF-1.4".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "doc-7", "name": "report.pdf", "type": "pdf", "size": 8, "uploadedAt": "2024-03-01T10:00:00Z"}"#)
        .create_async()
        .await;

    let file = UploadFile::new("report.pdf", b"%PDF-1.4".to_vec());
    let doc = gateway(&server).upload_document(&file, "s1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(doc.id, "doc-7");
    assert_eq!(doc.name, "report.pdf");
}

#[tokio::test]
async fn test_upload_error_uses_body_text() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(415)
        .with_body("Unsupported file type")
        .create_async()
        .await;

    let file = UploadFile::new("image.png", b"png".to_vec());
    let err = gateway(&server).upload_document(&file, "s1").await.unwrap_err();
    assert_eq!(err.message, "Unsupported file type");
}

#[tokio::test]
async fn test_upload_error_with_empty_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(500)
        .create_async()
        .await;

    let file = UploadFile::new("a.txt", b"a".to_vec());
    let err = gateway(&server).upload_document(&file, "s1").await.unwrap_err();
    assert_eq!(err.message, "Failed to upload document");
}

#[tokio::test]
async fn test_delete_document() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/documents/doc-1")
        .match_body(Matcher::Json(json!({ "session_id": "s1" })))
        .with_status(200)
        .create_async()
        .await;

    gateway(&server).delete_document("doc-1", "s1").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_delete_document_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/documents/doc-1")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;

    let err = gateway(&server).delete_document("doc-1", "s1").await.unwrap_err();
    assert_eq!(err.message, "Failed to delete document");
}

#[tokio::test]
async fn test_chat_streams_chunked_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({ "session_id": "s1", "message": "hi" })))
        .with_status(200)
        .with_chunked_body(|w| {
            w.write_all(b"Hel")?;
            w.write_all(b"lo, caf")?;
            // split inside a two-byte character
            w.write_all(&[0xC3])?;
            w.write_all(&[0xA9, b'!'])
        })
        .create_async()
        .await;

    let stream = gateway(&server).stream_chat("s1", "hi").await.unwrap();
    let text = stream.collect_text().await.unwrap();

    mock.assert_async().await;
    assert_eq!(text, "Hello, café!");
}

#[tokio::test]
async fn test_chat_error_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat")
        .with_status(503)
        .with_body("model overloaded\n")
        .create_async()
        .await;

    let err = gateway(&server).stream_chat("s1", "hi").await.unwrap_err();
    assert_eq!(err.message, "model overloaded\n");
}

#[tokio::test]
async fn test_chat_error_without_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat")
        .with_status(500)
        .create_async()
        .await;

    let err = gateway(&server).stream_chat("s1", "hi").await.unwrap_err();
    assert_eq!(err.message, "Chat request failed");
}

#[tokio::test]
async fn test_health_check() {
    let mut server = Server::new_async().await;
    // any answer means the server is reachable
    server
        .mock("GET", "/health")
        .with_status(404)
        .create_async()
        .await;

    assert!(gateway(&server).health_check().await);
}

#[tokio::test]
async fn test_unreachable_backend() {
    let gw = HttpGateway::new(&ServerConfig::new("http://127.0.0.1:1")).unwrap();

    let err = gw.list_documents("s1").await.unwrap_err();
    assert!(!err.message.is_empty());
    assert!(!gw.health_check().await);
}
