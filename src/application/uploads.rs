//! Concurrent attachment uploads.
//!
//! Each accepted file is uploaded on its own worker thread. Workers report
//! back over a channel and the owning thread drains it, so completions are
//! applied to the form one at a time no matter in which order they finish.
//!
//! Every batch belongs to a generation. [`UploadQueue::abandon`] starts a new
//! one, and results from older generations are dropped when they arrive, so
//! uploads started for a discarded form never reach the next one.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::domain::{
    guess_mime_type, is_accepted_attachment, AttachmentDescriptor, AttachmentStore, UploadError,
};

pub const DEFAULT_MAX_FILES: usize = 5;
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Client-side attachment limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Most files a form may carry, counting uploads still running.
    pub max_files: usize,
    /// Largest accepted file, in bytes.
    pub max_file_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// A file waiting to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    /// Builds a request from in-memory bytes, guessing the MIME type from
    /// the file extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepform::application::UploadRequest;
    ///
    /// let request = UploadRequest::new("scan.pdf", vec![0; 4]);
    /// assert_eq!(request.mime_type, "application/pdf");
    /// assert_eq!(request.size(), 4);
    /// ```
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = guess_mime_type(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    /// Reads a file from disk.
    ///
    /// The size is checked against `max_bytes` before anything is read, so
    /// an oversized file fails with [`UploadError::TooLarge`] without being
    /// loaded into memory.
    pub fn from_path(path: &Path, max_bytes: u64) -> Result<Self, UploadError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let read_error = |e: std::io::Error| UploadError::Read {
            name: file_name.clone(),
            message: e.to_string(),
        };

        let size = fs::metadata(path).map_err(read_error)?.len();
        if size > max_bytes {
            return Err(UploadError::TooLarge {
                name: file_name.clone(),
                size,
                max: max_bytes,
            });
        }
        let bytes = fs::read(path).map_err(read_error)?;
        Ok(Self::new(file_name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// State of one file, keyed by file name in [`UploadQueue::progress`].
#[derive(Debug, Clone, PartialEq)]
pub enum UploadProgress {
    InFlight,
    Done,
    Failed(UploadError),
}

impl UploadProgress {
    pub fn percent(&self) -> u16 {
        match self {
            UploadProgress::Done => 100,
            UploadProgress::InFlight | UploadProgress::Failed(_) => 0,
        }
    }
}

/// A finished upload, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub file_name: String,
    pub result: Result<AttachmentDescriptor, UploadError>,
}

/// Outcome tagged with the generation of the batch that produced it.
type Tagged = (u64, UploadOutcome);

/// Runs uploads in the background and hands back their outcomes.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use stepform::application::{UploadLimits, UploadQueue, UploadRequest};
/// use stepform::infrastructure::InMemoryBackend;
///
/// let mut uploads = UploadQueue::new(Arc::new(InMemoryBackend::new()), UploadLimits::default());
/// uploads.start(UploadRequest::new("photo.png", vec![1, 2, 3]), 0).unwrap();
///
/// let outcome = uploads.wait_next(Duration::from_secs(5)).unwrap();
/// assert_eq!(outcome.result.unwrap().size, 3);
/// assert!(!uploads.is_busy());
/// ```
pub struct UploadQueue {
    store: Arc<dyn AttachmentStore>,
    limits: UploadLimits,
    sender: Sender<Tagged>,
    receiver: Receiver<Tagged>,
    progress: BTreeMap<String, UploadProgress>,
    in_flight: usize,
    generation: u64,
}

impl std::fmt::Debug for UploadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadQueue")
            .field("limits", &self.limits)
            .field("progress", &self.progress)
            .field("in_flight", &self.in_flight)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl UploadQueue {
    pub fn new(store: Arc<dyn AttachmentStore>, limits: UploadLimits) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            store,
            limits,
            sender,
            receiver,
            progress: BTreeMap::new(),
            in_flight: 0,
            generation: 0,
        }
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    /// Progress per file name.
    pub fn progress(&self) -> &BTreeMap<String, UploadProgress> {
        &self.progress
    }

    /// Number of uploads of the current generation still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Whether any upload of the current generation is still running.
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Starts uploading a batch of files.
    ///
    /// `attached` is the number of files already on the form. A batch that
    /// would exceed the file limit is rejected as a whole. Files that are
    /// too large or of an unaccepted type are marked failed individually and
    /// the rest of the batch still starts. Returns how many uploads started.
    pub fn start_batch(
        &mut self,
        requests: Vec<UploadRequest>,
        attached: usize,
    ) -> Result<usize, UploadError> {
        if attached + self.in_flight + requests.len() > self.limits.max_files {
            return Err(UploadError::TooManyFiles {
                max: self.limits.max_files,
            });
        }

        let mut started = 0;
        for request in requests {
            match self.check(&request) {
                Ok(()) => {
                    self.spawn(request);
                    started += 1;
                }
                Err(err) => {
                    warn!(file = %request.file_name, error = %err, "attachment rejected");
                    self.progress
                        .insert(request.file_name, UploadProgress::Failed(err));
                }
            }
        }
        Ok(started)
    }

    /// Single-file form of [`start_batch`](Self::start_batch).
    pub fn start(&mut self, request: UploadRequest, attached: usize) -> Result<usize, UploadError> {
        self.start_batch(vec![request], attached)
    }

    /// Forgets every upload, running or finished.
    ///
    /// Workers still running are left to finish, but their outcomes are
    /// discarded by [`drain`](Self::drain) and [`wait_next`](Self::wait_next).
    pub fn abandon(&mut self) {
        if self.in_flight > 0 {
            debug!(count = self.in_flight, "abandoning running uploads");
        }
        self.generation += 1;
        self.in_flight = 0;
        self.progress.clear();
    }

    fn check(&self, request: &UploadRequest) -> Result<(), UploadError> {
        if request.size() > self.limits.max_file_bytes {
            return Err(UploadError::TooLarge {
                name: request.file_name.clone(),
                size: request.size(),
                max: self.limits.max_file_bytes,
            });
        }
        if !is_accepted_attachment(&request.file_name, &request.mime_type) {
            return Err(UploadError::UnsupportedType {
                name: request.file_name.clone(),
                mime_type: request.mime_type.clone(),
            });
        }
        Ok(())
    }

    fn spawn(&mut self, request: UploadRequest) {
        info!(file = %request.file_name, bytes = request.size(), "upload started");
        self.progress
            .insert(request.file_name.clone(), UploadProgress::InFlight);
        self.in_flight += 1;

        let store = Arc::clone(&self.store);
        let sender = self.sender.clone();
        let generation = self.generation;
        thread::spawn(move || {
            let result = store
                .upload(&request.bytes, &request.file_name, &request.mime_type)
                .map(|uploaded| AttachmentDescriptor {
                    url: uploaded.url,
                    name: request.file_name.clone(),
                    size: uploaded.size,
                    mime_type: uploaded.mime_type,
                });
            let outcome = UploadOutcome {
                file_name: request.file_name,
                result,
            };
            if sender.send((generation, outcome)).is_err() {
                debug!("upload queue dropped before completion");
            }
        });
    }

    /// Collects every upload of the current generation that has finished
    /// since the last call.
    pub fn drain(&mut self) -> Vec<UploadOutcome> {
        let mut finished = Vec::new();
        while let Ok(tagged) = self.receiver.try_recv() {
            if let Some(outcome) = self.accept(tagged) {
                finished.push(outcome);
            }
        }
        finished
    }

    /// Blocks for up to `timeout` waiting for the next finished upload of the
    /// current generation.
    pub fn wait_next(&mut self, timeout: Duration) -> Option<UploadOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let tagged = self.receiver.recv_timeout(remaining).ok()?;
            if let Some(outcome) = self.accept(tagged) {
                return Some(outcome);
            }
        }
    }

    fn accept(&mut self, (generation, outcome): Tagged) -> Option<UploadOutcome> {
        if generation != self.generation {
            debug!(file = %outcome.file_name, "dropping result of abandoned upload");
            return None;
        }
        self.record(&outcome);
        Some(outcome)
    }

    fn record(&mut self, outcome: &UploadOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let progress = match &outcome.result {
            Ok(attachment) => {
                info!(file = %outcome.file_name, url = %attachment.url, "upload finished");
                UploadProgress::Done
            }
            Err(err) => {
                warn!(file = %outcome.file_name, error = %err, "upload failed");
                UploadProgress::Failed(err.clone())
            }
        };
        self.progress.insert(outcome.file_name.clone(), progress);
    }
}
