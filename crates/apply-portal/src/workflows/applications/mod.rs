//! Application choices: submission eligibility, provider task-view ordering,
//! and the service and HTTP router that expose them.

pub mod domain;
pub mod prioritisation;
pub mod repository;
pub mod router;
pub mod service;
pub mod submission;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationChoice, ApplicationChoiceId, ApplicationChoiceSnapshot, ApplicationFormSnapshot,
    ApplicationStatus, Course, CourseLevel, CourseOption, FormSection, NewApplicationChoice,
    Provider, StudyMode, VacancyStatus,
};
pub use prioritisation::{
    add_business_days, PrioritisationContext, PrioritisedApplication, TaskViewGroup,
    TaskViewLadder, UNGROUPED_BUCKET,
};
pub use repository::{ApplicationChoiceRepository, CourseCatalog, RepositoryError, TaskViewRow};
pub use router::application_router;
pub use service::{ApplicationChoiceService, ApplicationPolicy, ApplicationServiceError};
pub use submission::{
    govuk_date, CycleTimetable, EligibilityError, Remedy, SubmissionCheck, SubmissionContext,
    SubmissionRules,
};
