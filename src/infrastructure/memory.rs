//! In-process backend used for offline runs and tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::domain::{
    AttachmentStore, SubmissionError, SubmissionReceipt, SubmissionRecord, SubmissionSink,
    UploadError, UploadedFile,
};

#[derive(Debug, Default)]
struct BackendState {
    submissions: Vec<(String, SubmissionRecord)>,
    files: BTreeMap<String, Vec<u8>>,
}

/// Keeps uploaded files and created submissions in memory. Clones share
/// the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> Vec<SubmissionRecord> {
        self.lock()
            .submissions
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub fn submission(&self, id: &str) -> Option<SubmissionRecord> {
        self.lock()
            .submissions
            .iter()
            .find(|(stored, _)| stored == id)
            .map(|(_, record)| record.clone())
    }

    pub fn file(&self, url: &str) -> Option<Vec<u8>> {
        self.lock().files.get(url).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AttachmentStore for InMemoryBackend {
    fn upload(&self, bytes: &[u8], file_name: &str, mime_type: &str) -> Result<UploadedFile, UploadError> {
        let url = format!("memory://{}/{}", Uuid::new_v4().simple(), file_name);
        self.lock().files.insert(url.clone(), bytes.to_vec());
        Ok(UploadedFile {
            url,
            size: bytes.len() as u64,
            mime_type: mime_type.to_string(),
        })
    }
}

impl SubmissionSink for InMemoryBackend {
    fn create(&self, record: &SubmissionRecord) -> Result<SubmissionReceipt, SubmissionError> {
        let id = Uuid::new_v4().simple().to_string();
        self.lock().submissions.push((id.clone(), record.clone()));
        Ok(SubmissionReceipt { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Field, FormData};

    #[test]
    fn test_upload_stores_bytes_under_returned_url() {
        let backend = InMemoryBackend::new();
        let uploaded = backend.upload(b"hello", "a.png", "image/png").unwrap();

        assert!(uploaded.url.starts_with("memory://"));
        assert!(uploaded.url.ends_with("/a.png"));
        assert_eq!(uploaded.size, 5);
        assert_eq!(backend.file(&uploaded.url), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_create_assigns_distinct_ids() {
        let backend = InMemoryBackend::new();
        let mut data = FormData::default();
        data.set(Field::Email, "a@b.co".into());
        let record = SubmissionRecord::from_form(&data);

        let first = backend.create(&record).unwrap();
        let second = backend.create(&record).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(backend.submissions().len(), 2);
        assert_eq!(backend.submission(&first.id), Some(record));
    }
}
