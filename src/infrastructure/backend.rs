//! HTTP backend for submissions and file uploads.

use reqwest::blocking::{multipart, Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::domain::{
    AttachmentStore, SubmissionError, SubmissionReceipt, SubmissionRecord, SubmissionSink,
    UploadError, UploadedFile,
};

const SUBMISSION_ENTITY: &str = "Submission";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file_url: String,
}

/// Talks to the form backend over blocking HTTP.
///
/// Submissions are created with `POST {url}/apps/{app_id}/entities/Submission`
/// and files are sent as multipart to
/// `POST {url}/apps/{app_id}/integrations/Core/UploadFile`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    app_id: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
        })
    }

    pub fn entity_url(&self, entity: &str) -> String {
        format!("{}/apps/{}/entities/{}", self.base_url, self.app_id, entity)
    }

    pub fn upload_url(&self) -> String {
        format!(
            "{}/apps/{}/integrations/Core/UploadFile",
            self.base_url, self.app_id
        )
    }
}

/// Splits a response into its status and body text when it is not a success.
fn rejection(response: Response) -> Result<Response, (u16, String)> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().unwrap_or_default();
    Err((status.as_u16(), message))
}

impl AttachmentStore for HttpBackend {
    fn upload(&self, bytes: &[u8], file_name: &str, mime_type: &str) -> Result<UploadedFile, UploadError> {
        let part = multipart::Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        debug!(file = file_name, size = bytes.len(), "uploading attachment");
        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let response = rejection(response).map_err(|(status, message)| {
            warn!(file = file_name, status, "upload rejected");
            UploadError::Rejected { status, message }
        })?;
        let body: UploadResponse = response
            .json()
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        Ok(UploadedFile {
            url: body.file_url,
            size: bytes.len() as u64,
            mime_type: mime_type.to_string(),
        })
    }
}

impl SubmissionSink for HttpBackend {
    fn create(&self, record: &SubmissionRecord) -> Result<SubmissionReceipt, SubmissionError> {
        let response = self
            .client
            .post(self.entity_url(SUBMISSION_ENTITY))
            .json(record)
            .send()
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;
        let response = rejection(response).map_err(|(status, message)| {
            warn!(status, "submission rejected");
            SubmissionError::Rejected { status, message }
        })?;
        response
            .json::<SubmissionReceipt>()
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))
    }
}
