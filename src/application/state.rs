//! Application state for the terminal front end.
//!
//! [`App`] wraps a [`FormSession`] with everything the UI needs on top of
//! it: which field has focus, the uncommitted text buffer, the attach prompt,
//! the help popup and transient status messages.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use super::session::{FormSession, SubmitError};
use super::uploads::{UploadQueue, UploadRequest};
use crate::domain::{
    option_label, Field, FieldKind, LifecycleStatus, SubmissionSink, UploadError, COMPANY_SIZES,
    INDUSTRIES, PRIORITIES, SUBMISSION_TYPES,
};

const IDLE_POLL: Duration = Duration::from_millis(500);
const BUSY_POLL: Duration = Duration::from_millis(100);

/// Represents the current mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Moving between fields and steps
    Normal,
    /// Typing into a text field; nothing is committed until Enter
    Editing,
    /// Entering file paths to attach
    AttachFile,
    /// Help popup is displayed
    Help,
    /// Submission finished, success screen is shown
    Complete,
}

/// Main application state.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use stepform::application::{App, AppMode, FormSession, UploadLimits, UploadQueue};
/// use stepform::infrastructure::{InMemoryBackend, MemoryDraftStore};
///
/// let backend = Arc::new(InMemoryBackend::new());
/// let session = FormSession::new(Box::new(MemoryDraftStore::new()), Duration::from_secs(2));
/// let uploads = UploadQueue::new(backend.clone(), UploadLimits::default());
/// let app = App::new(session, uploads, backend);
///
/// assert_eq!(app.mode, AppMode::Normal);
/// assert_eq!(app.session.current_step(), 0);
/// ```
pub struct App {
    pub session: FormSession,
    pub uploads: UploadQueue,
    sink: Arc<dyn SubmissionSink>,
    pub mode: AppMode,
    /// Index into [`visible_fields`](Self::visible_fields)
    pub focused: usize,
    /// Text buffer for editing mode
    pub input: String,
    /// Cursor position in characters, within whichever buffer is active
    pub cursor_position: usize,
    /// Path buffer for the attach prompt
    pub path_input: String,
    pub help_scroll: usize,
    pub status_message: Option<String>,
    pub selected_attachment: usize,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("session", &self.session)
            .field("uploads", &self.uploads)
            .field("mode", &self.mode)
            .field("focused", &self.focused)
            .field("status_message", &self.status_message)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn new(session: FormSession, uploads: UploadQueue, sink: Arc<dyn SubmissionSink>) -> Self {
        let mode = if session.status() == LifecycleStatus::Completed {
            AppMode::Complete
        } else {
            AppMode::Normal
        };
        Self {
            session,
            uploads,
            sink,
            mode,
            focused: 0,
            input: String::new(),
            cursor_position: 0,
            path_input: String::new(),
            help_scroll: 0,
            status_message: None,
            selected_attachment: 0,
        }
    }

    /// Fields of the current step that are shown. Company fields only
    /// appear for business and partnership submissions.
    pub fn visible_fields(&self) -> Vec<Field> {
        let shows_company = self
            .session
            .fields()
            .submission_type()
            .is_some_and(|kind| kind.shows_company());
        self.session
            .step_info()
            .fields
            .iter()
            .copied()
            .filter(|field| {
                shows_company
                    || !matches!(
                        field,
                        Field::CompanyName | Field::CompanySize | Field::Industry
                    )
            })
            .collect()
    }

    pub fn focused_field(&self) -> Option<Field> {
        self.visible_fields().get(self.focused).copied()
    }

    pub fn focus_next(&mut self) {
        let count = self.visible_fields().len();
        if count > 0 {
            self.focused = (self.focused + 1) % count;
        }
    }

    pub fn focus_prev(&mut self) {
        let count = self.visible_fields().len();
        if count > 0 {
            self.focused = (self.focused + count - 1) % count;
        }
    }

    fn clamp_focus(&mut self) {
        let count = self.visible_fields().len();
        if self.focused >= count {
            self.focused = count.saturating_sub(1);
        }
    }

    /// Enter on the focused field: edit text, toggle a flag, cycle a choice
    /// or open the attach prompt.
    pub fn activate_focused(&mut self) {
        let Some(field) = self.focused_field() else {
            return;
        };
        match field.kind() {
            FieldKind::Text | FieldKind::LongText | FieldKind::Date => self.start_editing(),
            FieldKind::Choice(_) => self.cycle_choice(true),
            FieldKind::Flag => self.toggle_flag(),
            FieldKind::Attachments => self.start_attach(),
        }
    }

    /// Loads the focused field's committed text into the input buffer.
    pub fn start_editing(&mut self) {
        let Some(field) = self.focused_field() else {
            return;
        };
        self.input = self.session.fields().text(field).to_string();
        self.cursor_position = self.input.chars().count();
        self.status_message = None;
        self.mode = AppMode::Editing;
    }

    /// Commits the input buffer to the focused field.
    pub fn finish_editing(&mut self) {
        if let Some(field) = self.focused_field() {
            let value = std::mem::take(&mut self.input);
            self.session.update_field(field, value.into());
        }
        self.cancel_editing();
    }

    pub fn cancel_editing(&mut self) {
        self.mode = AppMode::Normal;
        self.input.clear();
        self.cursor_position = 0;
    }

    /// Moves the focused choice field to the next (or previous) option.
    /// An unset choice starts at the first (or last) option.
    pub fn cycle_choice(&mut self, forward: bool) {
        let Some(field) = self.focused_field() else {
            return;
        };
        let FieldKind::Choice(options) = field.kind() else {
            return;
        };
        if options.is_empty() {
            return;
        }
        let current = self.session.fields().text(field);
        let next = match options.iter().position(|option| option.value == current) {
            Some(index) if forward => (index + 1) % options.len(),
            Some(index) => (index + options.len() - 1) % options.len(),
            None if forward => 0,
            None => options.len() - 1,
        };
        self.session.update_field(field, options[next].value.into());
        self.clamp_focus();
    }

    pub fn toggle_flag(&mut self) {
        let Some(field) = self.focused_field() else {
            return;
        };
        if field.kind() != FieldKind::Flag {
            return;
        }
        let flag = self.session.fields().flag(field);
        self.session.update_field(field, (!flag).into());
    }

    fn focus_first_error(&mut self) {
        let errors = self.session.errors();
        if let Some(index) = self
            .visible_fields()
            .iter()
            .position(|field| errors.contains_key(field))
        {
            self.focused = index;
        }
    }

    pub fn next_step(&mut self) {
        if self.session.advance() {
            self.focused = 0;
            self.status_message = None;
        } else {
            self.focus_first_error();
            self.status_message = Some("Please fix the highlighted fields".to_string());
        }
    }

    pub fn previous_step(&mut self) {
        self.session.retreat();
        self.focused = 0;
        self.status_message = None;
    }

    pub fn jump_to_step(&mut self, step: usize) {
        if self.session.jump_to(step) {
            self.focused = 0;
            self.status_message = None;
        } else {
            self.status_message = Some("Complete the current step first".to_string());
        }
    }

    /// Submits the form to the configured sink.
    pub fn submit(&mut self) {
        if self.uploads.is_busy() {
            self.status_message =
                Some("Wait for uploads to finish before submitting".to_string());
            return;
        }
        let sink = Arc::clone(&self.sink);
        match self.session.submit(sink.as_ref()) {
            Ok(id) => {
                info!(%id, "submission complete");
                self.uploads.abandon();
                self.status_message = None;
                self.mode = AppMode::Complete;
            }
            Err(SubmitError::Validation(_)) => {
                self.focus_first_error();
                self.status_message = Some("Please fix the highlighted fields".to_string());
            }
            Err(SubmitError::Sink(err)) => {
                self.status_message = Some(format!(
                    "Submission failed: {err}. Press Ctrl+S to try again."
                ));
            }
            Err(err) => self.status_message = Some(err.to_string()),
        }
    }

    /// Discards the whole form and the saved draft.
    pub fn reset_form(&mut self) {
        self.session.reset();
        self.uploads.abandon();
        self.focused = 0;
        self.selected_attachment = 0;
        self.mode = AppMode::Normal;
        self.status_message = Some("Form reset".to_string());
    }

    /// Leaves the success screen with a fresh form.
    pub fn new_submission(&mut self) {
        self.reset_form();
        self.status_message = None;
    }

    /// `#` followed by the first eight characters of the submission id,
    /// upper-cased.
    pub fn reference_number(&self) -> Option<String> {
        self.session.submission_id().map(|id| {
            let short: String = id.chars().take(8).collect();
            format!("#{}", short.to_uppercase())
        })
    }

    pub fn set_copy_result<E: std::fmt::Display>(&mut self, result: Result<(), E>) {
        self.status_message = Some(match result {
            Ok(()) => "Reference number copied".to_string(),
            Err(e) => format!("Copy failed: {e}"),
        });
    }

    pub fn start_attach(&mut self) {
        self.mode = AppMode::AttachFile;
        self.path_input.clear();
        self.cursor_position = 0;
        self.status_message = None;
    }

    pub fn cancel_attach(&mut self) {
        self.mode = AppMode::Normal;
        self.path_input.clear();
        self.cursor_position = 0;
    }

    /// Paths typed at the attach prompt, separated by commas.
    pub fn attach_paths(&self) -> Vec<String> {
        self.path_input
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Starts uploading the files read from the attach prompt.
    pub fn set_attach_result(&mut self, requests: Vec<Result<UploadRequest, UploadError>>) {
        self.cancel_attach();

        let mut problems = Vec::new();
        let mut readable = Vec::new();
        for request in requests {
            match request {
                Ok(request) => readable.push(request),
                Err(err) => problems.push(err.to_string()),
            }
        }

        let attached = self.session.fields().attachments().len();
        match self.uploads.start_batch(readable, attached) {
            Ok(0) if problems.is_empty() => {
                self.status_message = Some("No file was accepted".to_string());
            }
            Ok(started) if problems.is_empty() => {
                self.status_message = Some(format!("Uploading {started} file(s)..."));
            }
            Ok(0) => self.status_message = Some(problems.join("; ")),
            Ok(started) => {
                self.status_message = Some(format!(
                    "Uploading {started} file(s); {}",
                    problems.join("; ")
                ));
            }
            Err(err) => self.status_message = Some(err.to_string()),
        }
    }

    /// Applies finished uploads to the form. Returns whether anything changed.
    pub fn poll_uploads(&mut self) -> bool {
        let finished = self.uploads.drain();
        if finished.is_empty() {
            return false;
        }
        for outcome in finished {
            match outcome.result {
                Ok(attachment) => self.session.add_attachment(attachment),
                Err(err) => self.status_message = Some(err.to_string()),
            }
        }
        true
    }

    pub fn select_attachment(&mut self, forward: bool) {
        let count = self.session.fields().attachments().len();
        if count == 0 {
            self.selected_attachment = 0;
        } else if forward {
            self.selected_attachment = (self.selected_attachment + 1) % count;
        } else {
            self.selected_attachment = (self.selected_attachment + count - 1) % count;
        }
    }

    pub fn remove_selected_attachment(&mut self) {
        if let Some(removed) = self.session.remove_attachment(self.selected_attachment) {
            self.status_message = Some(format!("Removed {}", removed.name));
        }
        let count = self.session.fields().attachments().len();
        if self.selected_attachment >= count {
            self.selected_attachment = count.saturating_sub(1);
        }
    }

    /// Drives the autosave timer. Returns true when a draft was written.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.session.tick(now)
    }

    /// How long the event loop may block before something needs attention.
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        let base = if self.uploads.is_busy() {
            BUSY_POLL
        } else {
            IDLE_POLL
        };
        self.session
            .autosave_due_in(now)
            .map_or(base, |due| due.min(base))
    }

    pub fn show_help(&mut self) {
        self.mode = AppMode::Help;
        self.help_scroll = 0;
    }

    pub fn close_help(&mut self) {
        self.mode = if self.session.status() == LifecycleStatus::Completed {
            AppMode::Complete
        } else {
            AppMode::Normal
        };
    }

    /// Label/value pairs shown on the review step.
    pub fn review_summary(&self) -> Vec<(&'static str, String)> {
        let data = self.session.fields();
        let mut rows = vec![
            (
                "Name",
                format!("{} {}", data.text(Field::FirstName), data.text(Field::LastName))
                    .trim()
                    .to_string(),
            ),
            ("Email", data.text(Field::Email).to_string()),
        ];
        if !data.text(Field::Phone).is_empty() {
            rows.push(("Phone", data.text(Field::Phone).to_string()));
        }
        let kind = data.text(Field::SubmissionType);
        rows.push((
            "Type",
            option_label(SUBMISSION_TYPES, kind).unwrap_or(kind).to_string(),
        ));
        if !data.text(Field::CompanyName).is_empty() {
            let mut company = data.text(Field::CompanyName).to_string();
            let details: Vec<&str> = [
                option_label(COMPANY_SIZES, data.text(Field::CompanySize)),
                option_label(INDUSTRIES, data.text(Field::Industry)),
            ]
            .into_iter()
            .flatten()
            .collect();
            if !details.is_empty() {
                company = format!("{company} ({})", details.join(", "));
            }
            rows.push(("Company", company));
        }
        let priority = data.text(Field::Priority);
        rows.push((
            "Priority",
            option_label(PRIORITIES, priority).unwrap_or(priority).to_string(),
        ));
        if !data.text(Field::Message).is_empty() {
            rows.push(("Message", data.text(Field::Message).to_string()));
        }
        rows.push((
            "Attachments",
            format!("{} file(s)", data.attachments().len()),
        ));
        rows
    }

    fn active_buffer(&mut self) -> &mut String {
        if self.mode == AppMode::AttachFile {
            &mut self.path_input
        } else {
            &mut self.input
        }
    }

    fn byte_offset(buffer: &str, chars: usize) -> usize {
        buffer
            .char_indices()
            .nth(chars)
            .map_or(buffer.len(), |(offset, _)| offset)
    }

    pub fn insert_char(&mut self, c: char) {
        let cursor = self.cursor_position;
        let buffer = self.active_buffer();
        let offset = Self::byte_offset(buffer, cursor);
        buffer.insert(offset, c);
        self.cursor_position += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        let cursor = self.cursor_position - 1;
        let buffer = self.active_buffer();
        let offset = Self::byte_offset(buffer, cursor);
        buffer.remove(offset);
        self.cursor_position = cursor;
    }

    pub fn delete_at_cursor(&mut self) {
        let cursor = self.cursor_position;
        let buffer = self.active_buffer();
        if cursor < buffer.chars().count() {
            let offset = Self::byte_offset(buffer, cursor);
            buffer.remove(offset);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        let len = self.active_buffer().chars().count();
        if self.cursor_position < len {
            self.cursor_position += 1;
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_position = self.active_buffer().chars().count();
    }
}
