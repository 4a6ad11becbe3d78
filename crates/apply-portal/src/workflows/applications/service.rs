use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{
    ApplicationChoice, ApplicationChoiceId, ApplicationChoiceSnapshot, ApplicationStatus,
    NewApplicationChoice,
};
use super::prioritisation::{PrioritisationContext, PrioritisedApplication, TaskViewLadder};
use super::repository::{ApplicationChoiceRepository, CourseCatalog, RepositoryError};
use super::submission::{CycleTimetable, EligibilityError, SubmissionContext, SubmissionRules};
use crate::config::CycleConfig;

/// Policy knobs the service needs from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationPolicy {
    pub timetable: CycleTimetable,
    pub current_cycle_year: i32,
    pub reject_by_default_warning_days: u32,
    pub submission_rules: SubmissionRules,
    pub task_view_ladder: TaskViewLadder,
}

impl ApplicationPolicy {
    pub fn from_cycle(cycle: &CycleConfig) -> Self {
        Self {
            timetable: cycle.timetable(),
            current_cycle_year: cycle.current_year,
            reject_by_default_warning_days: cycle.reject_by_default_warning_days,
            submission_rules: SubmissionRules::default(),
            task_view_ladder: TaskViewLadder::default(),
        }
    }
}

/// Service composing the repositories with the submission and task-view rules.
pub struct ApplicationChoiceService<R, C> {
    repository: Arc<R>,
    catalog: Arc<C>,
    policy: Arc<ApplicationPolicy>,
}

impl<R, C> ApplicationChoiceService<R, C>
where
    R: ApplicationChoiceRepository + 'static,
    C: CourseCatalog + 'static,
{
    pub fn new(repository: Arc<R>, catalog: Arc<C>, policy: ApplicationPolicy) -> Self {
        Self {
            repository,
            catalog,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &ApplicationPolicy {
        &self.policy
    }

    /// Persist the output of a completed course selection.
    pub fn create_from_selection(
        &self,
        selection: NewApplicationChoice,
    ) -> Result<ApplicationChoice, ApplicationServiceError> {
        let option = self
            .catalog
            .course_option(selection.course_id, selection.course_option_id)?
            .ok_or_else(|| {
                ApplicationServiceError::Precondition(format!(
                    "course option {} does not belong to course {}",
                    selection.course_option_id, selection.course_id
                ))
            })?;
        if !option.is_available() {
            return Err(ApplicationServiceError::Precondition(format!(
                "course option {} is no longer available",
                option.id
            )));
        }

        let choice = self.repository.insert(selection)?;
        info!(application_choice_id = %choice.id, course_id = choice.course_id, "application choice created");
        Ok(choice)
    }

    pub fn get(&self, id: ApplicationChoiceId) -> Result<ApplicationChoice, ApplicationServiceError> {
        let choice = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(choice)
    }

    /// Assemble the record the submission checks read. Missing referential data
    /// is a precondition violation, never a validation error.
    pub fn snapshot(
        &self,
        choice: &ApplicationChoice,
    ) -> Result<ApplicationChoiceSnapshot, ApplicationServiceError> {
        let course = self.catalog.course(choice.course_id)?.ok_or_else(|| {
            ApplicationServiceError::Precondition(format!(
                "application choice {} references missing course {}",
                choice.id, choice.course_id
            ))
        })?;
        let course_options = self.catalog.course_options(course.id)?;
        let course_option = course_options
            .iter()
            .find(|option| option.id == choice.course_option_id)
            .cloned()
            .ok_or_else(|| {
                ApplicationServiceError::Precondition(format!(
                    "application choice {} references missing course option {}",
                    choice.id, choice.course_option_id
                ))
            })?;
        let application_form = self
            .repository
            .application_form(choice.application_form_id)?
            .ok_or_else(|| {
                ApplicationServiceError::Precondition(format!(
                    "application choice {} references missing application form {}",
                    choice.id, choice.application_form_id
                ))
            })?;

        Ok(ApplicationChoiceSnapshot {
            id: choice.id,
            status: choice.status,
            course,
            course_option,
            course_options,
            application_form,
        })
    }

    /// The single reason the choice cannot be submitted today, if any.
    pub fn submission_errors(
        &self,
        id: ApplicationChoiceId,
        now: DateTime<Utc>,
    ) -> Result<Option<EligibilityError>, ApplicationServiceError> {
        let choice = self.get(id)?;
        let snapshot = self.snapshot(&choice)?;
        Ok(self
            .policy
            .submission_rules
            .evaluate(&snapshot, &self.submission_context(now)))
    }

    /// Send the choice to the provider when no check blocks it.
    pub fn submit(
        &self,
        id: ApplicationChoiceId,
        now: DateTime<Utc>,
    ) -> Result<ApplicationChoice, ApplicationServiceError> {
        let mut choice = self.get(id)?;
        let snapshot = self.snapshot(&choice)?;
        if let Some(error) = self
            .policy
            .submission_rules
            .evaluate(&snapshot, &self.submission_context(now))
        {
            return Err(ApplicationServiceError::Ineligible(error));
        }

        choice.status = ApplicationStatus::AwaitingProviderDecision;
        choice.sent_to_provider_at = Some(now);
        choice.updated_at = now;
        self.repository.update(choice.clone())?;

        info!(application_choice_id = %choice.id, "application choice submitted");
        Ok(choice)
    }

    /// Provider task view: every choice for the provider, bucketed and ordered.
    pub fn task_view(
        &self,
        provider_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<PrioritisedApplication>, ApplicationServiceError> {
        let choices = self.repository.for_provider(provider_id)?;
        let context = PrioritisationContext {
            now,
            current_cycle_year: self.policy.current_cycle_year,
            reject_by_default_warning_days: self.policy.reject_by_default_warning_days,
        };
        Ok(self.policy.task_view_ladder.prioritise(choices, &context))
    }

    fn submission_context(&self, now: DateTime<Utc>) -> SubmissionContext {
        SubmissionContext {
            today: now.date_naive(),
            timetable: self.policy.timetable,
        }
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Ineligible(EligibilityError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("application precondition violated: {0}")]
    Precondition(String),
}
