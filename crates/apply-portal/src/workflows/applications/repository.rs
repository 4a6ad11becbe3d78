use serde::Serialize;

use super::domain::{
    ApplicationChoice, ApplicationChoiceId, ApplicationFormSnapshot, Course, CourseOption,
    NewApplicationChoice, Provider, StudyMode,
};
use super::prioritisation::{PrioritisedApplication, TaskViewGroup};
use crate::workflows::wizard::WizardError;

/// Storage abstraction for application choices.
pub trait ApplicationChoiceRepository: Send + Sync {
    fn insert(&self, choice: NewApplicationChoice) -> Result<ApplicationChoice, RepositoryError>;
    fn update(&self, choice: ApplicationChoice) -> Result<(), RepositoryError>;
    fn fetch(&self, id: ApplicationChoiceId) -> Result<Option<ApplicationChoice>, RepositoryError>;
    fn for_provider(&self, provider_id: u64) -> Result<Vec<ApplicationChoice>, RepositoryError>;
    fn application_form(
        &self,
        application_form_id: u64,
    ) -> Result<Option<ApplicationFormSnapshot>, RepositoryError>;
}

/// Read-only view of published providers, courses and their options.
pub trait CourseCatalog: Send + Sync {
    fn provider(&self, provider_id: u64) -> Result<Option<Provider>, RepositoryError>;
    fn course(&self, course_id: u64) -> Result<Option<Course>, RepositoryError>;
    fn course_options(&self, course_id: u64) -> Result<Vec<CourseOption>, RepositoryError>;

    fn course_option(
        &self,
        course_id: u64,
        option_id: u64,
    ) -> Result<Option<CourseOption>, RepositoryError> {
        Ok(self
            .course_options(course_id)?
            .into_iter()
            .find(|option| option.id == option_id))
    }

    /// Options a candidate could still pick, optionally narrowed to one study mode.
    fn available_options(
        &self,
        course_id: u64,
        study_mode: Option<StudyMode>,
    ) -> Result<Vec<CourseOption>, RepositoryError> {
        Ok(self
            .course_options(course_id)?
            .into_iter()
            .filter(CourseOption::is_available)
            .filter(|option| study_mode.map_or(true, |mode| option.study_mode == mode))
            .collect())
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<RepositoryError> for WizardError {
    fn from(value: RepositoryError) -> Self {
        WizardError::Lookup(value.to_string())
    }
}

/// Sanitized task-view row returned to provider users.
#[derive(Debug, Clone, Serialize)]
pub struct TaskViewRow {
    pub application_choice_id: ApplicationChoiceId,
    pub bucket: u16,
    pub group: Option<&'static str>,
    pub status: &'static str,
    pub course_id: u64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_by_default_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&PrioritisedApplication> for TaskViewRow {
    fn from(value: &PrioritisedApplication) -> Self {
        Self {
            application_choice_id: value.application.id,
            bucket: value.bucket,
            group: value.group.map(TaskViewGroup::label),
            status: value.application.status.label(),
            course_id: value.application.course_id,
            updated_at: value.application.updated_at,
            reject_by_default_at: value.application.reject_by_default_at,
        }
    }
}
