//! Contracts for the external collaborators of a form session, and the
//! normalization applied to form data before it leaves the client.
//!
//! The session never talks to a concrete backend or storage; it is handed
//! implementations of [`AttachmentStore`], [`DraftStore`] and
//! [`SubmissionSink`] at construction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{PersistenceError, SubmissionError, UploadError};
use super::models::{DraftSnapshot, Field, FieldValue, FormData, STATUS_SUBMITTED};

/// What the attachment store reports back for a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub url: String,
    pub size: u64,
    pub mime_type: String,
}

/// Remote file storage. Implementations must be callable from worker threads.
pub trait AttachmentStore: Send + Sync {
    fn upload(&self, bytes: &[u8], file_name: &str, mime_type: &str) -> Result<UploadedFile, UploadError>;
}

/// Local draft storage under a single well-known session key.
pub trait DraftStore: Send {
    fn save(&self, snapshot: &DraftSnapshot) -> Result<(), PersistenceError>;
    fn load(&self) -> Result<Option<DraftSnapshot>, PersistenceError>;
    fn clear(&self) -> Result<(), PersistenceError>;
}

/// Backend entity creation for completed submissions.
pub trait SubmissionSink: Send + Sync {
    fn create(&self, record: &SubmissionRecord) -> Result<SubmissionReceipt, SubmissionError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub id: String,
}

/// The payload sent to the submission sink.
///
/// All fields are carried over, except that attachments are reduced to their
/// URLs and the status is forced to `"submitted"`.
///
/// # Examples
///
/// ```
/// use stepform::domain::{Field, FormData, SubmissionRecord};
///
/// let mut data = FormData::default();
/// data.set(Field::FirstName, "Ada".into());
///
/// let record = SubmissionRecord::from_form(&data);
/// assert_eq!(record.get("first_name").unwrap(), "Ada");
/// assert_eq!(record.get("status").unwrap(), "submitted");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SubmissionRecord(Map<String, Value>);

impl SubmissionRecord {
    pub fn from_form(data: &FormData) -> Self {
        let mut map = Map::new();
        for (field, value) in data.iter() {
            let json = match (field, value) {
                (Field::Status, _) => Value::String(STATUS_SUBMITTED.to_string()),
                (_, FieldValue::Attachments(list)) => Value::Array(
                    list.iter()
                        .map(|attachment| Value::String(attachment.url.clone()))
                        .collect(),
                ),
                (_, FieldValue::Text(text)) => Value::String(text.clone()),
                (_, FieldValue::Flag(flag)) => Value::Bool(*flag),
            };
            map.insert(field.name().to_string(), json);
        }
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Human-readable file size using 1024-based units.
///
/// # Examples
///
/// ```
/// use stepform::domain::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Guesses a MIME type from the file extension.
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Accepted attachment types: any image, PDF, and Word documents.
pub fn is_accepted_attachment(file_name: &str, mime_type: &str) -> bool {
    if mime_type.starts_with("image/") {
        return true;
    }
    let lower = file_name.to_ascii_lowercase();
    [".pdf", ".doc", ".docx"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AttachmentDescriptor;

    #[test]
    fn test_record_reduces_attachments_to_urls() {
        let mut data = FormData::default();
        data.push_attachment(AttachmentDescriptor {
            url: "https://files.example/a.pdf".to_string(),
            name: "a.pdf".to_string(),
            size: 12,
            mime_type: "application/pdf".to_string(),
        });
        data.set(Field::TermsAccepted, true.into());

        let record = SubmissionRecord::from_form(&data);
        assert_eq!(
            record.get("attachments").unwrap(),
            &serde_json::json!(["https://files.example/a.pdf"])
        );
        assert_eq!(record.get("terms_accepted").unwrap(), &Value::Bool(true));
        assert_eq!(record.get("priority").unwrap(), "medium");
        assert_eq!(record.as_map().len(), Field::ALL.len());
    }

    #[test]
    fn test_record_forces_submitted_status() {
        let mut data = FormData::default();
        data.set(Field::Status, "draft".into());
        let record = SubmissionRecord::from_form(&data);
        assert_eq!(record.get("status").unwrap(), STATUS_SUBMITTED);
    }

    #[test]
    fn test_record_serializes_as_flat_object() {
        let record = SubmissionRecord::from_form(&FormData::default());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.is_object());
        assert_eq!(json["newsletter"], Value::Bool(false));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("photo.JPG"), "image/jpeg");
        assert_eq!(guess_mime_type("report.pdf"), "application/pdf");
        assert_eq!(guess_mime_type("README"), "application/octet-stream");
    }

    #[test]
    fn test_accepted_attachments() {
        assert!(is_accepted_attachment("x.png", "image/png"));
        assert!(is_accepted_attachment("Contract.DOCX", guess_mime_type("Contract.DOCX")));
        assert!(!is_accepted_attachment("notes.txt", "text/plain"));
        assert!(!is_accepted_attachment("run.exe", "application/octet-stream"));
    }
}
