use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of an uploaded knowledge-base file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DocumentType {
    Pdf,
    #[default]
    Txt,
    Md,
    Doc,
}

impl DocumentType {
    /// Map a file extension (or a server-reported type) to a document type.
    ///
    /// Unknown values fall back to `Txt`.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" => Self::Txt,
            "md" | "markdown" => Self::Md,
            "doc" | "docx" => Self::Doc,
            _ => Self::Txt,
        }
    }

    /// Derive the type from a filename's last extension
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Self::Txt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
            Self::Md => "md",
            Self::Doc => "doc",
        }
    }
}

impl From<String> for DocumentType {
    fn from(s: String) -> Self {
        Self::from_extension(&s)
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A document indexed by the backend knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocument")]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub size: u64,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            doc_type: DocumentType::from_filename(&name),
            name,
            size,
            uploaded_at: Utc::now(),
        }
    }
}

/// Wire shape accepted from the backend.
///
/// Servers differ in how they spell the upload time and some omit the type,
/// so both are normalized here.
#[derive(Deserialize)]
struct RawDocument {
    id: String,
    name: String,
    #[serde(rename = "type", default)]
    doc_type: Option<DocumentType>,
    #[serde(default)]
    size: u64,
    #[serde(rename = "uploadedAt", alias = "uploaded_at", default)]
    uploaded_at: Option<Value>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let doc_type = raw
            .doc_type
            .unwrap_or_else(|| DocumentType::from_filename(&raw.name));
        let uploaded_at = raw
            .uploaded_at
            .as_ref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);

        Self {
            id: raw.id,
            name: raw.name,
            doc_type,
            size: raw.size,
            uploaded_at,
        }
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                // naive ISO timestamps are taken as UTC
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }),
        Value::Number(n) => {
            let secs = n.as_f64()?;
            // milliseconds since epoch when the number is too large for seconds
            let millis = if secs > 1e11 { secs } else { secs * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename() {
        assert_eq!(DocumentType::from_filename("report.PDF"), DocumentType::Pdf);
        assert_eq!(DocumentType::from_filename("notes.markdown"), DocumentType::Md);
        assert_eq!(DocumentType::from_filename("letter.docx"), DocumentType::Doc);
        assert_eq!(DocumentType::from_filename("archive.tar.gz"), DocumentType::Txt);
        assert_eq!(DocumentType::from_filename("README"), DocumentType::Txt);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "id": "doc-1",
            "name": "paper.pdf",
            "type": "pdf",
            "size": 2048,
            "uploadedAt": "2024-05-01T10:00:00Z"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.doc_type, DocumentType::Pdf);
        assert_eq!(doc.size, 2048);
        assert_eq!(doc.uploaded_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_deserialize_snake_case_naive_timestamp() {
        let json = r#"{
            "id": "doc-2",
            "name": "notes.md",
            "type": "md",
            "size": 10,
            "uploaded_at": "2024-05-01T10:00:00.250000"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.doc_type, DocumentType::Md);
        assert_eq!(doc.uploaded_at.timestamp_millis() % 1000, 250);
    }

    #[test]
    fn test_unknown_type_falls_back_to_txt() {
        let json = r#"{"id": "x", "name": "data.csv", "type": "csv", "size": 1}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.doc_type, DocumentType::Txt);
    }

    #[test]
    fn test_missing_type_uses_filename() {
        let json = r#"{"id": "x", "name": "slides.pdf", "size": 1}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.doc_type, DocumentType::Pdf);
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let doc = Document::new("d", "a.md", 3);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["type"], "md");
        assert!(value.get("uploadedAt").is_some());
    }
}
