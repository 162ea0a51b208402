use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_SUBMITTED: &str = "submitted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
}

impl ChoiceOption {
    const fn new(value: &'static str, label: &'static str) -> Self {
        Self { value, label }
    }
}

pub const SUBMISSION_TYPES: &[ChoiceOption] = &[
    ChoiceOption::new("personal", "Personal"),
    ChoiceOption::new("business", "Business"),
    ChoiceOption::new("partnership", "Partnership"),
];

pub const COMPANY_SIZES: &[ChoiceOption] = &[
    ChoiceOption::new("1-10", "1-10 employees"),
    ChoiceOption::new("11-50", "11-50 employees"),
    ChoiceOption::new("51-200", "51-200 employees"),
    ChoiceOption::new("201-500", "201-500 employees"),
    ChoiceOption::new("500+", "500+ employees"),
];

pub const INDUSTRIES: &[ChoiceOption] = &[
    ChoiceOption::new("technology", "Technology"),
    ChoiceOption::new("healthcare", "Healthcare"),
    ChoiceOption::new("finance", "Finance"),
    ChoiceOption::new("education", "Education"),
    ChoiceOption::new("retail", "Retail"),
    ChoiceOption::new("manufacturing", "Manufacturing"),
    ChoiceOption::new("other", "Other"),
];

pub const PRIORITIES: &[ChoiceOption] = &[
    ChoiceOption::new("low", "Low"),
    ChoiceOption::new("medium", "Medium"),
    ChoiceOption::new("high", "High"),
    ChoiceOption::new("urgent", "Urgent"),
];

/// Looks up the display label for an option value.
pub fn option_label(options: &[ChoiceOption], value: &str) -> Option<&'static str> {
    options.iter().find(|o| o.value == value).map(|o| o.label)
}

/// Category of a submission, selected on the type step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionType {
    Personal,
    Business,
    Partnership,
}

impl SubmissionType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "personal" => Some(Self::Personal),
            "business" => Some(Self::Business),
            "partnership" => Some(Self::Partnership),
            _ => None,
        }
    }

    /// Whether the company block (name, size, industry) is shown.
    pub fn shows_company(self) -> bool {
        matches!(self, Self::Business | Self::Partnership)
    }

    /// Whether a company name must be provided.
    pub fn requires_company_name(self) -> bool {
        matches!(self, Self::Business)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    LongText,
    Date,
    Choice(&'static [ChoiceOption]),
    Flag,
    Attachments,
}

/// Named form field. The name is the field's identity in drafts and records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    DateOfBirth,
    SubmissionType,
    CompanyName,
    CompanySize,
    Industry,
    Message,
    Priority,
    Attachments,
    Newsletter,
    TermsAccepted,
    Status,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::FirstName,
        Field::LastName,
        Field::Email,
        Field::Phone,
        Field::DateOfBirth,
        Field::SubmissionType,
        Field::CompanyName,
        Field::CompanySize,
        Field::Industry,
        Field::Message,
        Field::Priority,
        Field::Attachments,
        Field::Newsletter,
        Field::TermsAccepted,
        Field::Status,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::DateOfBirth => "date_of_birth",
            Field::SubmissionType => "submission_type",
            Field::CompanyName => "company_name",
            Field::CompanySize => "company_size",
            Field::Industry => "industry",
            Field::Message => "message",
            Field::Priority => "priority",
            Field::Attachments => "attachments",
            Field::Newsletter => "newsletter",
            Field::TermsAccepted => "terms_accepted",
            Field::Status => "status",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::FirstName => "First Name",
            Field::LastName => "Last Name",
            Field::Email => "Email Address",
            Field::Phone => "Phone Number",
            Field::DateOfBirth => "Date of Birth",
            Field::SubmissionType => "Submission Type",
            Field::CompanyName => "Company Name",
            Field::CompanySize => "Company Size",
            Field::Industry => "Industry",
            Field::Message => "Message",
            Field::Priority => "Priority Level",
            Field::Attachments => "Attachments",
            Field::Newsletter => "Subscribe to newsletter",
            Field::TermsAccepted => "I accept the terms and conditions",
            Field::Status => "Status",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::DateOfBirth => FieldKind::Date,
            Field::Message => FieldKind::LongText,
            Field::SubmissionType => FieldKind::Choice(SUBMISSION_TYPES),
            Field::CompanySize => FieldKind::Choice(COMPANY_SIZES),
            Field::Industry => FieldKind::Choice(INDUSTRIES),
            Field::Priority => FieldKind::Choice(PRIORITIES),
            Field::Attachments => FieldKind::Attachments,
            Field::Newsletter | Field::TermsAccepted => FieldKind::Flag,
            _ => FieldKind::Text,
        }
    }

    pub fn default_value(self) -> FieldValue {
        match self {
            Field::Priority => FieldValue::Text("medium".to_string()),
            Field::Status => FieldValue::Text(STATUS_DRAFT.to_string()),
            Field::Attachments => FieldValue::Attachments(Vec::new()),
            Field::Newsletter | Field::TermsAccepted => FieldValue::Flag(false),
            _ => FieldValue::Text(String::new()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| DomainError::UnknownField(s.to_string()))
    }
}

/// Metadata for an uploaded file. Produced by the attachment store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    pub url: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

impl AttachmentDescriptor {
    pub fn kind(&self) -> FileKind {
        FileKind::from_mime(&self.mime_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Other,
}

impl FileKind {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            FileKind::Image
        } else if mime_type.contains("pdf") {
            FileKind::Pdf
        } else {
            FileKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    Attachments(Vec<AttachmentDescriptor>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_attachments(&self) -> Option<&[AttachmentDescriptor]> {
        match self {
            FieldValue::Attachments(list) => Some(list),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<Vec<AttachmentDescriptor>> for FieldValue {
    fn from(value: Vec<AttachmentDescriptor>) -> Self {
        FieldValue::Attachments(value)
    }
}

/// The field values of one form session.
///
/// Every field of [`Field::ALL`] is always present. Deserializing a partial
/// map fills the missing fields with their defaults, so drafts written by an
/// older field set still load.
///
/// # Examples
///
/// ```
/// use stepform::domain::{Field, FormData};
///
/// let mut data = FormData::default();
/// assert_eq!(data.text(Field::Priority), "medium");
///
/// data.set(Field::FirstName, "Ada".into());
/// assert_eq!(data.text(Field::FirstName), "Ada");
/// assert!(data.has_identity());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Field, FieldValue>", into = "BTreeMap<Field, FieldValue>")]
pub struct FormData {
    values: BTreeMap<Field, FieldValue>,
}

impl Default for FormData {
    fn default() -> Self {
        Self {
            values: Field::ALL
                .iter()
                .map(|field| (*field, field.default_value()))
                .collect(),
        }
    }
}

impl From<BTreeMap<Field, FieldValue>> for FormData {
    fn from(values: BTreeMap<Field, FieldValue>) -> Self {
        let mut data = FormData::default();
        data.values.extend(values);
        data
    }
}

impl From<FormData> for BTreeMap<Field, FieldValue> {
    fn from(data: FormData) -> Self {
        data.values
    }
}

impl FormData {
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// Text content of a field, or `""` when it holds no text.
    pub fn text(&self, field: Field) -> &str {
        self.get(field).and_then(FieldValue::as_text).unwrap_or("")
    }

    pub fn flag(&self, field: Field) -> bool {
        self.get(field).and_then(FieldValue::as_flag).unwrap_or(false)
    }

    pub fn attachments(&self) -> &[AttachmentDescriptor] {
        self.get(Field::Attachments)
            .and_then(FieldValue::as_attachments)
            .unwrap_or(&[])
    }

    pub fn submission_type(&self) -> Option<SubmissionType> {
        SubmissionType::parse(self.text(Field::SubmissionType))
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn push_attachment(&mut self, attachment: AttachmentDescriptor) {
        let slot = self
            .values
            .entry(Field::Attachments)
            .or_insert_with(|| FieldValue::Attachments(Vec::new()));
        match slot {
            FieldValue::Attachments(list) => list.push(attachment),
            other => *other = FieldValue::Attachments(vec![attachment]),
        }
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<AttachmentDescriptor> {
        match self.values.get_mut(&Field::Attachments) {
            Some(FieldValue::Attachments(list)) if index < list.len() => Some(list.remove(index)),
            _ => None,
        }
    }

    /// True once the user has entered something that identifies them.
    /// Drafts are only written after this point.
    pub fn has_identity(&self) -> bool {
        !self.text(Field::FirstName).is_empty() || !self.text(Field::Email).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.values.iter().map(|(field, value)| (*field, value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub fields: &'static [Field],
}

pub const STEPS: [StepInfo; 4] = [
    StepInfo {
        id: "personal",
        title: "Personal Info",
        subtitle: "Basic details",
        fields: &[
            Field::FirstName,
            Field::LastName,
            Field::Email,
            Field::Phone,
            Field::DateOfBirth,
        ],
    },
    StepInfo {
        id: "type",
        title: "Submission Type",
        subtitle: "Category selection",
        fields: &[
            Field::SubmissionType,
            Field::CompanyName,
            Field::CompanySize,
            Field::Industry,
        ],
    },
    StepInfo {
        id: "details",
        title: "Details",
        subtitle: "Additional info",
        fields: &[Field::Message, Field::Priority, Field::Attachments],
    },
    StepInfo {
        id: "review",
        title: "Review",
        subtitle: "Confirm & submit",
        fields: &[Field::Newsletter, Field::TermsAccepted],
    },
];

pub const STEP_COUNT: usize = STEPS.len();
pub const REVIEW_STEP: usize = STEP_COUNT - 1;

/// Fraction of the progress bar filled at `step`.
pub fn progress_ratio(step: usize) -> f64 {
    (step.min(REVIEW_STEP) as f64) / (REVIEW_STEP as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationDirection {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleStatus {
    #[default]
    Editing,
    Saving,
    Submitting,
    Completed,
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleStatus::Editing => "editing",
            LifecycleStatus::Saving => "saving",
            LifecycleStatus::Submitting => "submitting",
            LifecycleStatus::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Persisted draft: the committed fields plus the step the user was on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub fields: FormData,
    pub current_step: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str) -> AttachmentDescriptor {
        AttachmentDescriptor {
            url: format!("memory://{name}"),
            name: name.to_string(),
            size: 10,
            mime_type: "application/pdf".to_string(),
        }
    }

    #[test]
    fn test_defaults_match_initial_form() {
        let data = FormData::default();
        assert_eq!(data.text(Field::FirstName), "");
        assert_eq!(data.text(Field::Priority), "medium");
        assert_eq!(data.text(Field::Status), STATUS_DRAFT);
        assert!(!data.flag(Field::TermsAccepted));
        assert!(data.attachments().is_empty());
        assert_eq!(data.iter().count(), Field::ALL.len());
    }

    #[test]
    fn test_field_names_round_trip_through_from_str() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>().unwrap(), field);
        }
        assert_eq!(
            "nickname".parse::<Field>(),
            Err(DomainError::UnknownField("nickname".to_string()))
        );
    }

    #[test]
    fn test_identity_requires_first_name_or_email() {
        let mut data = FormData::default();
        data.set(Field::LastName, "Doe".into());
        assert!(!data.has_identity());

        data.set(Field::Email, "j@x.com".into());
        assert!(data.has_identity());
    }

    #[test]
    fn test_attachments_append_and_remove_by_index() {
        let mut data = FormData::default();
        data.push_attachment(attachment("a.pdf"));
        data.push_attachment(attachment("b.pdf"));
        data.push_attachment(attachment("c.pdf"));

        let removed = data.remove_attachment(1).unwrap();
        assert_eq!(removed.name, "b.pdf");
        let names: Vec<_> = data.attachments().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "c.pdf"]);
        assert!(data.remove_attachment(5).is_none());
    }

    #[test]
    fn test_partial_json_fills_missing_fields() {
        let json = r#"{"first_name":"Ada","newsletter":true}"#;
        let data: FormData = serde_json::from_str(json).unwrap();
        assert_eq!(data.text(Field::FirstName), "Ada");
        assert!(data.flag(Field::Newsletter));
        assert_eq!(data.text(Field::Priority), "medium");
    }

    #[test]
    fn test_unknown_field_in_json_is_rejected() {
        let json = r#"{"favourite_colour":"blue"}"#;
        assert!(serde_json::from_str::<FormData>(json).is_err());
    }

    #[test]
    fn test_submission_type_rules() {
        assert!(SubmissionType::Business.requires_company_name());
        assert!(!SubmissionType::Partnership.requires_company_name());
        assert!(SubmissionType::Partnership.shows_company());
        assert!(!SubmissionType::Personal.shows_company());
        assert_eq!(SubmissionType::parse("enterprise"), None);
    }

    #[test]
    fn test_progress_ratio() {
        assert_eq!(progress_ratio(0), 0.0);
        assert_eq!(progress_ratio(REVIEW_STEP), 1.0);
        assert!((progress_ratio(1) - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_file_kind_from_mime() {
        assert_eq!(FileKind::from_mime("image/png"), FileKind::Image);
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_mime("application/msword"), FileKind::Other);
    }
}
