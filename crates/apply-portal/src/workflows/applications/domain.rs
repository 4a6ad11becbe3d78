use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for application choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationChoiceId(pub u64);

impl std::fmt::Display for ApplicationChoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single application choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Unsubmitted,
    AwaitingProviderDecision,
    Inactive,
    Interviewing,
    Offer,
    PendingConditions,
    Recruited,
    OfferDeferred,
    ConditionsNotMet,
    Rejected,
    Declined,
    Withdrawn,
    OfferWithdrawn,
    ApplicationNotSent,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Unsubmitted => "unsubmitted",
            ApplicationStatus::AwaitingProviderDecision => "awaiting_provider_decision",
            ApplicationStatus::Inactive => "inactive",
            ApplicationStatus::Interviewing => "interviewing",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::PendingConditions => "pending_conditions",
            ApplicationStatus::Recruited => "recruited",
            ApplicationStatus::OfferDeferred => "offer_deferred",
            ApplicationStatus::ConditionsNotMet => "conditions_not_met",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Declined => "declined",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::OfferWithdrawn => "offer_withdrawn",
            ApplicationStatus::ApplicationNotSent => "application_not_sent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    FullTime,
    PartTime,
}

impl StudyMode {
    pub const fn label(self) -> &'static str {
        match self {
            StudyMode::FullTime => "full_time",
            StudyMode::PartTime => "part_time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Primary,
    Secondary,
    FurtherEducation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VacancyStatus {
    Vacancies,
    NoVacancies,
}

/// Training provider as published in the course catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: u64,
    pub code: String,
    pub name: String,
}

/// Course listing snapshot consulted by the wizards and eligibility checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    pub provider_id: u64,
    pub code: String,
    pub name: String,
    pub level: CourseLevel,
    #[serde(default)]
    pub subject_codes: Vec<String>,
    pub recruitment_cycle_year: i32,
    pub applications_open_from: NaiveDate,
    pub exposed_in_find: bool,
}

impl Course {
    pub fn opens_for_applications_by(&self, today: NaiveDate) -> bool {
        self.applications_open_from <= today
    }
}

/// One bookable combination of course, site and study mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOption {
    pub id: u64,
    pub course_id: u64,
    pub site_id: u64,
    pub site_name: String,
    pub study_mode: StudyMode,
    pub vacancy_status: VacancyStatus,
    pub site_still_valid: bool,
}

impl CourseOption {
    /// Has vacancies at a site that is still offered.
    pub fn is_available(&self) -> bool {
        self.vacancy_status == VacancyStatus::Vacancies && self.site_still_valid
    }
}

/// Sections of the application form a candidate must complete before submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormSection {
    PersonalInformation,
    ContactInformation,
    WorkHistory,
    VolunteeringExperience,
    Degrees,
    MathsGcse,
    EnglishGcse,
    ScienceGcse,
    OtherQualifications,
    PersonalStatement,
    InterviewAvailability,
    References,
    Safeguarding,
}

impl FormSection {
    pub const ALWAYS_REQUIRED: [FormSection; 12] = [
        FormSection::PersonalInformation,
        FormSection::ContactInformation,
        FormSection::WorkHistory,
        FormSection::VolunteeringExperience,
        FormSection::Degrees,
        FormSection::MathsGcse,
        FormSection::EnglishGcse,
        FormSection::OtherQualifications,
        FormSection::PersonalStatement,
        FormSection::InterviewAvailability,
        FormSection::References,
        FormSection::Safeguarding,
    ];
}

/// Completion flags for the candidate's application form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFormSnapshot {
    pub id: u64,
    #[serde(default)]
    pub completed_sections: BTreeSet<FormSection>,
}

impl ApplicationFormSnapshot {
    pub fn is_completed(&self, section: FormSection) -> bool {
        self.completed_sections.contains(&section)
    }

    /// Sections still outstanding for a course at `level`, in form order.
    pub fn incomplete_sections(&self, level: CourseLevel) -> Vec<FormSection> {
        let mut required = FormSection::ALWAYS_REQUIRED.to_vec();
        if level == CourseLevel::Primary {
            required.push(FormSection::ScienceGcse);
        }
        required.sort();
        required
            .into_iter()
            .filter(|section| !self.is_completed(*section))
            .collect()
    }
}

/// Persisted application choice as the provider and candidate see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationChoice {
    pub id: ApplicationChoiceId,
    pub application_form_id: u64,
    pub provider_id: u64,
    pub course_id: u64,
    pub course_option_id: u64,
    pub status: ApplicationStatus,
    pub current_recruitment_cycle_year: i32,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sent_to_provider_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reject_by_default_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_by_default: bool,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejection_feedback_given: bool,
}

/// Output of the course selection wizard, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplicationChoice {
    pub application_form_id: u64,
    pub provider_id: u64,
    pub course_id: u64,
    pub course_option_id: u64,
    pub recruitment_cycle_year: i32,
}

/// Everything the submission checks read, assembled by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationChoiceSnapshot {
    pub id: ApplicationChoiceId,
    pub status: ApplicationStatus,
    pub course: Course,
    pub course_option: CourseOption,
    /// Every option of the course, used to decide whether it is full.
    pub course_options: Vec<CourseOption>,
    pub application_form: ApplicationFormSnapshot,
}

impl ApplicationChoiceSnapshot {
    pub fn course_full(&self) -> bool {
        !self
            .course_options
            .iter()
            .any(|option| option.vacancy_status == VacancyStatus::Vacancies)
    }
}
