//! Form session controller.
//!
//! [`FormSession`] owns the state of one pass through the form: field values,
//! the current step, validation errors, the lifecycle status and, once
//! submitted, the submission id. All mutation goes through its methods so the
//! step and status invariants hold regardless of the front end driving it.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    validate_step, AttachmentDescriptor, DomainError, DomainResult, DraftSnapshot, DraftStore,
    Field, FieldErrors, FieldKind, FieldValue, FormData, LifecycleStatus, NavigationDirection, PersistenceError,
    StepInfo, SubmissionError, SubmissionReceipt, SubmissionRecord, SubmissionSink, REVIEW_STEP,
    STEPS,
};

use super::autosave::AutosaveTimer;

/// Why a submit attempt did not complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("Please fix {} error(s) before submitting", .0.len())]
    Validation(FieldErrors),
    #[error("Submit is only available on the review step")]
    NotOnReviewStep,
    #[error("A submission is already in progress")]
    InFlight,
    #[error("This form has already been submitted")]
    AlreadyCompleted,
    #[error(transparent)]
    Sink(#[from] SubmissionError),
}

/// State and transitions of a single form session.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use stepform::application::FormSession;
/// use stepform::domain::Field;
/// use stepform::infrastructure::MemoryDraftStore;
///
/// let mut session = FormSession::new(Box::new(MemoryDraftStore::new()), Duration::from_secs(2));
/// assert!(!session.advance());
/// assert!(session.error(Field::Email).is_some());
///
/// session.update_field(Field::FirstName, "John".into());
/// session.update_field(Field::LastName, "Doe".into());
/// session.update_field(Field::Email, "john@x.com".into());
/// assert!(session.advance());
/// assert_eq!(session.current_step(), 1);
/// ```
pub struct FormSession {
    fields: FormData,
    current_step: usize,
    direction: NavigationDirection,
    errors: FieldErrors,
    status: LifecycleStatus,
    submission_id: Option<String>,
    last_saved: Option<DateTime<Local>>,
    autosave: AutosaveTimer,
    drafts: Box<dyn DraftStore>,
}

impl fmt::Debug for FormSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSession")
            .field("current_step", &self.current_step)
            .field("direction", &self.direction)
            .field("errors", &self.errors)
            .field("status", &self.status)
            .field("submission_id", &self.submission_id)
            .field("last_saved", &self.last_saved)
            .finish_non_exhaustive()
    }
}

impl FormSession {
    /// Starts an empty session.
    pub fn new(drafts: Box<dyn DraftStore>, autosave_delay: Duration) -> Self {
        Self {
            fields: FormData::default(),
            current_step: 0,
            direction: NavigationDirection::Forward,
            errors: FieldErrors::new(),
            status: LifecycleStatus::Editing,
            submission_id: None,
            last_saved: None,
            autosave: AutosaveTimer::new(autosave_delay),
            drafts,
        }
    }

    /// Starts a session from the persisted draft, if there is one.
    ///
    /// An unreadable draft is logged and ignored; the session starts empty.
    pub fn restore(drafts: Box<dyn DraftStore>, autosave_delay: Duration) -> Self {
        let mut session = Self::new(drafts, autosave_delay);
        match session.drafts.load() {
            Ok(Some(snapshot)) => {
                session.current_step = snapshot.current_step.min(REVIEW_STEP);
                session.fields = snapshot.fields;
                info!(step = session.current_step, "restored draft");
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "ignoring unreadable draft"),
        }
        session
    }

    /// Current field values.
    pub fn fields(&self) -> &FormData {
        &self.fields
    }

    /// Zero-based index of the visible step.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn step_info(&self) -> &'static StepInfo {
        &STEPS[self.current_step]
    }

    pub fn is_review_step(&self) -> bool {
        self.current_step == REVIEW_STEP
    }

    /// Direction of the last step change, used to pick the transition.
    pub fn direction(&self) -> NavigationDirection {
        self.direction
    }

    /// Errors from the last failed validation of the current step.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status
    }

    /// Id assigned by the backend once the submission completed.
    pub fn submission_id(&self) -> Option<&str> {
        self.submission_id.as_deref()
    }

    /// When a draft was last written.
    pub fn last_saved(&self) -> Option<DateTime<Local>> {
        self.last_saved
    }

    /// Time left before a pending autosave fires, `None` when nothing is
    /// pending.
    pub fn autosave_due_in(&self, now: Instant) -> Option<Duration> {
        self.autosave.time_until_due(now)
    }

    /// Writes a field value. Clears the field's error and restarts the
    /// autosave countdown; never touches the step or the status.
    pub fn update_field(&mut self, field: Field, value: FieldValue) {
        self.fields.set(field, value);
        self.errors.remove(&field);
        self.autosave.touch(Instant::now());
    }

    /// [`update_field`](Self::update_field) addressed by field name.
    ///
    /// Choice fields only take one of their listed option values, or the
    /// empty string to clear them.
    pub fn update_field_named(&mut self, name: &str, value: FieldValue) -> DomainResult<()> {
        let field = name.parse::<Field>()?;
        if let (FieldKind::Choice(options), Some(text)) = (field.kind(), value.as_text()) {
            if !text.is_empty() && !options.iter().any(|option| option.value == text) {
                return Err(DomainError::UnknownOption {
                    field: field.name(),
                    value: text.to_string(),
                });
            }
        }
        self.update_field(field, value);
        Ok(())
    }

    /// Appends a finished upload. Ignored unless the form is being edited,
    /// so a late upload cannot change a submitted or submitting form.
    pub fn add_attachment(&mut self, attachment: AttachmentDescriptor) {
        if self.status != LifecycleStatus::Editing {
            debug!(name = %attachment.name, status = ?self.status, "ignoring attachment");
            return;
        }
        self.fields.push_attachment(attachment);
        self.errors.remove(&Field::Attachments);
        self.autosave.touch(Instant::now());
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<AttachmentDescriptor> {
        let removed = self.fields.remove_attachment(index);
        if removed.is_some() {
            self.autosave.touch(Instant::now());
        }
        removed
    }

    pub fn validate_step(&self, step: usize) -> FieldErrors {
        validate_step(step, &self.fields)
    }

    /// Moves to the next step if the current one validates.
    ///
    /// On failure the errors are recorded and the step is left unchanged.
    /// Returns whether validation passed.
    pub fn advance(&mut self) -> bool {
        let errors = self.validate_step(self.current_step);
        if !errors.is_empty() {
            debug!(step = self.current_step, count = errors.len(), "step validation failed");
            self.errors = errors;
            return false;
        }

        self.errors.clear();
        self.direction = NavigationDirection::Forward;
        self.current_step = (self.current_step + 1).min(REVIEW_STEP);
        self.autosave.touch(Instant::now());
        true
    }

    /// Steps back without validating.
    pub fn retreat(&mut self) {
        self.direction = NavigationDirection::Backward;
        self.current_step = self.current_step.saturating_sub(1);
        self.autosave.touch(Instant::now());
    }

    /// Jumps to an already visited step. Steps ahead of the current one are
    /// rejected, since their predecessors have not been validated.
    pub fn jump_to(&mut self, target: usize) -> bool {
        if target > self.current_step {
            return false;
        }
        self.direction = NavigationDirection::Backward;
        self.current_step = target;
        self.autosave.touch(Instant::now());
        true
    }

    /// Validates the review step and hands back the normalized record.
    ///
    /// On success the session is `Submitting` until
    /// [`finish_submit`](Self::finish_submit) is called with the sink's answer.
    pub fn begin_submit(&mut self) -> Result<SubmissionRecord, SubmitError> {
        match self.status {
            LifecycleStatus::Submitting => return Err(SubmitError::InFlight),
            LifecycleStatus::Completed => return Err(SubmitError::AlreadyCompleted),
            LifecycleStatus::Editing | LifecycleStatus::Saving => {}
        }
        if !self.is_review_step() {
            return Err(SubmitError::NotOnReviewStep);
        }

        let errors = self.validate_step(self.current_step);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(SubmitError::Validation(errors));
        }

        self.errors.clear();
        self.status = LifecycleStatus::Submitting;
        Ok(SubmissionRecord::from_form(&self.fields))
    }

    /// Applies the submission sink's answer.
    ///
    /// Success completes the session and clears the draft. Failure returns
    /// the session to editing with all data intact so the user can retry.
    pub fn finish_submit(
        &mut self,
        result: Result<SubmissionReceipt, SubmissionError>,
    ) -> Result<String, SubmitError> {
        let result = result.and_then(|receipt| {
            if receipt.id.trim().is_empty() {
                Err(SubmissionError::InvalidResponse("empty submission id".to_string()))
            } else {
                Ok(receipt)
            }
        });

        match result {
            Ok(receipt) => {
                info!(id = %receipt.id, "submission created");
                self.submission_id = Some(receipt.id.clone());
                self.status = LifecycleStatus::Completed;
                self.autosave.cancel();
                if let Err(err) = self.drafts.clear() {
                    warn!(error = %err, "failed to clear draft after submission");
                }
                Ok(receipt.id)
            }
            Err(err) => {
                warn!(error = %err, "submission failed");
                self.status = LifecycleStatus::Editing;
                Err(SubmitError::Sink(err))
            }
        }
    }

    /// Validates, sends the record to `sink` and applies the outcome.
    pub fn submit(&mut self, sink: &dyn SubmissionSink) -> Result<String, SubmitError> {
        let record = self.begin_submit()?;
        let result = sink.create(&record);
        self.finish_submit(result)
    }

    /// Discards everything, including the persisted draft.
    pub fn reset(&mut self) {
        self.fields = FormData::default();
        self.current_step = 0;
        self.direction = NavigationDirection::Forward;
        self.errors.clear();
        self.status = LifecycleStatus::Editing;
        self.submission_id = None;
        self.last_saved = None;
        self.autosave.cancel();
        if let Err(err) = self.drafts.clear() {
            warn!(error = %err, "failed to clear draft on reset");
        }
    }

    pub fn snapshot(&self) -> DraftSnapshot {
        DraftSnapshot {
            fields: self.fields.clone(),
            current_step: self.current_step,
        }
    }

    /// Runs a pending autosave once its debounce deadline has passed.
    ///
    /// Returns true when a draft was written. A failed save is logged and
    /// rescheduled for the next debounce cycle.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.autosave.fire_if_due(now) {
            return false;
        }
        match self.save_draft() {
            Ok(saved) => saved,
            Err(err) => {
                warn!(error = %err, "draft autosave failed, will retry");
                self.autosave.touch(now);
                false
            }
        }
    }

    /// Persists the committed state if the user has identified themselves.
    ///
    /// Skipped while a submission is in flight or after completion.
    pub fn save_draft(&mut self) -> Result<bool, PersistenceError> {
        if self.status != LifecycleStatus::Editing || !self.fields.has_identity() {
            return Ok(false);
        }

        self.status = LifecycleStatus::Saving;
        let snapshot = self.snapshot();
        let result = self.drafts.save(&snapshot);
        self.status = LifecycleStatus::Editing;
        result?;

        self.last_saved = Some(Local::now());
        debug!(step = snapshot.current_step, "draft saved");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{InMemoryBackend, MemoryDraftStore};

    const DELAY: Duration = Duration::from_secs(2);

    struct FailingSink;

    impl SubmissionSink for FailingSink {
        fn create(&self, _record: &SubmissionRecord) -> Result<SubmissionReceipt, SubmissionError> {
            Err(SubmissionError::Transport("connection refused".to_string()))
        }
    }

    fn session_with(store: &MemoryDraftStore) -> FormSession {
        FormSession::new(Box::new(store.clone()), DELAY)
    }

    fn fill_personal(session: &mut FormSession) {
        session.update_field(Field::FirstName, "John".into());
        session.update_field(Field::LastName, "Doe".into());
        session.update_field(Field::Email, "john@x.com".into());
    }

    fn walk_to_review(session: &mut FormSession) {
        fill_personal(session);
        assert!(session.advance());
        session.update_field(Field::SubmissionType, "personal".into());
        assert!(session.advance());
        assert!(session.advance());
        assert!(session.is_review_step());
    }

    #[test]
    fn test_update_field_never_moves_step_or_status() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        walk_to_review(&mut session);

        for field in Field::ALL {
            session.update_field(field, "x".into());
            assert_eq!(session.current_step(), REVIEW_STEP);
            assert_eq!(session.status(), LifecycleStatus::Editing);
        }
    }

    #[test]
    fn test_update_field_clears_that_fields_error_only() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        assert!(!session.advance());
        assert!(session.error(Field::FirstName).is_some());
        assert!(session.error(Field::Email).is_some());

        session.update_field(Field::FirstName, "John".into());
        assert!(session.error(Field::FirstName).is_none());
        assert!(session.error(Field::Email).is_some());
    }

    #[test]
    fn test_update_field_named() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        session.update_field_named("company_name", "Acme".into()).unwrap();
        assert_eq!(session.fields().text(Field::CompanyName), "Acme");
        assert!(session.update_field_named("shoe_size", "42".into()).is_err());
    }

    #[test]
    fn test_update_field_named_rejects_unlisted_option() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);

        let err = session
            .update_field_named("priority", "whenever".into())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::UnknownOption {
                field: "priority",
                value: "whenever".to_string(),
            }
        );
        assert_eq!(err.to_string(), "Unknown option 'whenever' for priority");
        assert_eq!(session.fields().text(Field::Priority), "medium");

        session.update_field_named("priority", "urgent".into()).unwrap();
        assert_eq!(session.fields().text(Field::Priority), "urgent");
        session.update_field_named("industry", "".into()).unwrap();
    }

    #[test]
    fn test_valid_personal_step_advances() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        fill_personal(&mut session);

        assert!(session.advance());
        assert_eq!(session.current_step(), 1);
        assert!(session.errors().is_empty());
        assert_eq!(session.direction(), NavigationDirection::Forward);
    }

    #[test]
    fn test_invalid_email_blocks_advance() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        session.update_field(Field::FirstName, "John".into());
        session.update_field(Field::LastName, "Doe".into());
        session.update_field(Field::Email, "not-an-email".into());

        assert!(!session.advance());
        assert_eq!(session.error(Field::Email), Some("Please enter a valid email"));
        assert_eq!(session.current_step(), 0);
    }

    #[test]
    fn test_repeated_failing_advance_keeps_step() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        fill_personal(&mut session);
        assert!(session.advance());

        for _ in 0..5 {
            assert!(!session.advance());
            assert_eq!(session.current_step(), 1);
        }
    }

    #[test]
    fn test_business_type_requires_company() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        fill_personal(&mut session);
        assert!(session.advance());

        session.update_field(Field::SubmissionType, "business".into());
        session.update_field(Field::CompanyName, "".into());
        assert!(!session.advance());
        assert!(session.error(Field::CompanyName).is_some());
        assert_eq!(session.current_step(), 1);
    }

    #[test]
    fn test_advance_clamps_at_last_step() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        walk_to_review(&mut session);
        session.update_field(Field::TermsAccepted, true.into());

        assert!(session.advance());
        assert_eq!(session.current_step(), REVIEW_STEP);
    }

    #[test]
    fn test_retreat_clamps_at_zero_without_validation() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        fill_personal(&mut session);
        assert!(session.advance());

        session.retreat();
        assert_eq!(session.current_step(), 0);
        assert_eq!(session.direction(), NavigationDirection::Backward);
        session.retreat();
        assert_eq!(session.current_step(), 0);
    }

    #[test]
    fn test_jump_to_rejects_steps_ahead() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        for target in 1..10 {
            assert!(!session.jump_to(target));
            assert_eq!(session.current_step(), 0);
        }

        walk_to_review(&mut session);
        assert!(session.jump_to(1));
        assert_eq!(session.current_step(), 1);
        assert_eq!(session.direction(), NavigationDirection::Backward);
        assert!(!session.jump_to(2));
    }

    #[test]
    fn test_submit_blocked_without_terms() {
        let store = MemoryDraftStore::new();
        let backend = InMemoryBackend::new();
        let mut session = session_with(&store);
        walk_to_review(&mut session);
        session.update_field(Field::TermsAccepted, false.into());

        let err = session.submit(&backend).unwrap_err();
        assert!(matches!(err, SubmitError::Validation(_)));
        assert!(session.error(Field::TermsAccepted).is_some());
        assert_eq!(session.status(), LifecycleStatus::Editing);
        assert!(session.submission_id().is_none());
        assert!(backend.submissions().is_empty());
    }

    #[test]
    fn test_submit_only_on_review_step() {
        let store = MemoryDraftStore::new();
        let backend = InMemoryBackend::new();
        let mut session = session_with(&store);
        fill_personal(&mut session);

        assert_eq!(session.submit(&backend), Err(SubmitError::NotOnReviewStep));
        assert_eq!(session.status(), LifecycleStatus::Editing);
    }

    #[test]
    fn test_successful_submit_completes_and_clears_draft_once() {
        let store = MemoryDraftStore::new();
        let backend = InMemoryBackend::new();
        let mut session = session_with(&store);
        walk_to_review(&mut session);
        session.update_field(Field::TermsAccepted, true.into());

        let id = session.submit(&backend).unwrap();
        assert!(!id.is_empty());
        assert_eq!(session.status(), LifecycleStatus::Completed);
        assert_eq!(session.submission_id(), Some(id.as_str()));
        assert_eq!(store.clear_count(), 1);

        let submissions = backend.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].get("status").unwrap(), "submitted");
        assert_eq!(submissions[0].get("first_name").unwrap(), "John");
    }

    #[test]
    fn test_second_submit_after_completion_is_rejected() {
        let store = MemoryDraftStore::new();
        let backend = InMemoryBackend::new();
        let mut session = session_with(&store);
        walk_to_review(&mut session);
        session.update_field(Field::TermsAccepted, true.into());
        session.submit(&backend).unwrap();

        assert_eq!(session.submit(&backend), Err(SubmitError::AlreadyCompleted));
        assert_eq!(backend.submissions().len(), 1);
    }

    #[test]
    fn test_begin_submit_while_in_flight_is_rejected() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        walk_to_review(&mut session);
        session.update_field(Field::TermsAccepted, true.into());

        session.begin_submit().unwrap();
        assert_eq!(session.status(), LifecycleStatus::Submitting);
        assert_eq!(session.begin_submit(), Err(SubmitError::InFlight));
    }

    #[test]
    fn test_failed_submit_keeps_data_for_retry() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        walk_to_review(&mut session);
        session.update_field(Field::TermsAccepted, true.into());

        let err = session.submit(&FailingSink).unwrap_err();
        assert!(matches!(err, SubmitError::Sink(SubmissionError::Transport(_))));
        assert_eq!(session.status(), LifecycleStatus::Editing);
        assert!(session.submission_id().is_none());
        assert_eq!(session.fields().text(Field::FirstName), "John");
        assert_eq!(store.clear_count(), 0);

        let backend = InMemoryBackend::new();
        assert!(session.submit(&backend).is_ok());
        assert_eq!(session.status(), LifecycleStatus::Completed);
    }

    #[test]
    fn test_empty_receipt_id_is_a_failure() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        walk_to_review(&mut session);
        session.update_field(Field::TermsAccepted, true.into());

        session.begin_submit().unwrap();
        let result = session.finish_submit(Ok(SubmissionReceipt { id: " ".to_string() }));
        assert!(matches!(
            result,
            Err(SubmitError::Sink(SubmissionError::InvalidResponse(_)))
        ));
        assert_eq!(session.status(), LifecycleStatus::Editing);
        assert!(session.submission_id().is_none());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let store = MemoryDraftStore::new();
        let backend = InMemoryBackend::new();
        let mut session = session_with(&store);
        walk_to_review(&mut session);
        session.update_field(Field::TermsAccepted, true.into());
        session.submit(&backend).unwrap();

        session.reset();
        assert_eq!(session.current_step(), 0);
        assert_eq!(session.status(), LifecycleStatus::Editing);
        assert!(session.submission_id().is_none());
        assert!(session.errors().is_empty());
        assert_eq!(session.fields(), &FormData::default());
        assert_eq!(store.clear_count(), 2);
    }

    #[test]
    fn test_autosave_waits_for_debounce() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        session.update_field(Field::FirstName, "John".into());

        let now = Instant::now();
        assert!(!session.tick(now));
        assert!(store.snapshot().is_none());

        assert!(session.tick(now + DELAY));
        let saved = store.snapshot().unwrap();
        assert_eq!(saved.fields.text(Field::FirstName), "John");
        assert_eq!(saved.current_step, 0);
        assert!(session.last_saved().is_some());
        assert_eq!(session.status(), LifecycleStatus::Editing);
    }

    #[test]
    fn test_autosave_skipped_without_identity() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        session.update_field(Field::LastName, "Doe".into());

        assert!(!session.tick(Instant::now() + DELAY));
        assert_eq!(store.save_count(), 0);
        assert!(session.last_saved().is_none());
    }

    #[test]
    fn test_autosave_failure_is_retried() {
        let store = MemoryDraftStore::new();
        store.fail_saves(true);
        let mut session = session_with(&store);
        session.update_field(Field::Email, "john@x.com".into());

        let first = Instant::now() + DELAY;
        assert!(!session.tick(first));
        assert!(session.autosave_due_in(first).is_some());

        store.fail_saves(false);
        assert!(session.tick(first + DELAY));
        assert!(store.snapshot().is_some());
    }

    #[test]
    fn test_navigation_is_captured_by_next_autosave() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        fill_personal(&mut session);
        assert!(session.advance());

        assert!(session.tick(Instant::now() + DELAY));
        assert_eq!(store.snapshot().unwrap().current_step, 1);
    }

    #[test]
    fn test_restore_rehydrates_from_draft() {
        let store = MemoryDraftStore::new();
        let mut original = session_with(&store);
        fill_personal(&mut original);
        assert!(original.advance());
        original.save_draft().unwrap();

        let restored = FormSession::restore(Box::new(store.clone()), DELAY);
        assert_eq!(restored.current_step(), 1);
        assert_eq!(restored.fields().text(Field::Email), "john@x.com");
    }

    #[test]
    fn test_restore_clamps_out_of_range_step() {
        let store = MemoryDraftStore::new();
        store
            .save(&DraftSnapshot {
                fields: FormData::default(),
                current_step: 17,
            })
            .unwrap();

        let restored = FormSession::restore(Box::new(store.clone()), DELAY);
        assert_eq!(restored.current_step(), REVIEW_STEP);
    }

    #[test]
    fn test_attachments_are_appended_and_removed() {
        let store = MemoryDraftStore::new();
        let mut session = session_with(&store);
        let attachment = AttachmentDescriptor {
            url: "memory://1".to_string(),
            name: "a.png".to_string(),
            size: 3,
            mime_type: "image/png".to_string(),
        };
        session.add_attachment(attachment.clone());
        assert_eq!(session.fields().attachments(), &[attachment.clone()]);

        assert_eq!(session.remove_attachment(0), Some(attachment));
        assert!(session.remove_attachment(0).is_none());
    }

    #[test]
    fn test_late_attachment_after_completion_is_ignored() {
        let store = MemoryDraftStore::new();
        let backend = InMemoryBackend::new();
        let mut session = session_with(&store);
        walk_to_review(&mut session);
        session.update_field(Field::TermsAccepted, true.into());
        session.submit(&backend).unwrap();

        session.add_attachment(AttachmentDescriptor {
            url: "memory://late".to_string(),
            name: "late.pdf".to_string(),
            size: 1,
            mime_type: "application/pdf".to_string(),
        });
        assert!(session.fields().attachments().is_empty());
        assert_eq!(session.autosave_due_in(Instant::now()), None);
        assert_eq!(session.status(), LifecycleStatus::Completed);
    }
}
