//! Ordered submission eligibility checks. At most one blocking reason is
//! reported per evaluation: the first check in declared order that fails.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{ApplicationChoiceId, ApplicationChoiceSnapshot, ApplicationStatus, FormSection};

/// Window during which candidates may submit in the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTimetable {
    pub apply_opens: NaiveDate,
    pub apply_deadline: NaiveDate,
}

impl CycleTimetable {
    pub fn can_submit(&self, today: NaiveDate) -> bool {
        self.apply_opens <= today && today <= self.apply_deadline
    }

    /// Next date submissions open: this cycle's opening, or next year's once
    /// the deadline has passed.
    pub fn reopens_on(&self, today: NaiveDate) -> NaiveDate {
        if today <= self.apply_deadline {
            return self.apply_opens;
        }
        self.apply_opens
            .with_year(self.apply_opens.year() + 1)
            .unwrap_or(self.apply_opens)
    }
}

/// Inputs shared by every check that are not part of the application itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionContext {
    pub today: NaiveDate,
    pub timetable: CycleTimetable,
}

/// GOV.UK style date, e.g. `4 August 2023`.
pub fn govuk_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// Action offered next to a blocking reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Remedy {
    WaitUntil { date: NaiveDate },
    RemoveApplication { application_choice_id: ApplicationChoiceId },
    CompleteDetails { sections: Vec<FormSection> },
    AddScienceGcse,
}

impl Remedy {
    pub fn label(&self) -> &'static str {
        match self {
            Remedy::WaitUntil { .. } => "Wait until applications open",
            Remedy::RemoveApplication { .. } => "Remove this application",
            Remedy::CompleteDetails { .. } => "Complete your details",
            Remedy::AddScienceGcse => "Add your science GCSE grade",
        }
    }
}

/// The single reason a submission is blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityError {
    pub key: SubmissionCheck,
    pub message: String,
    pub remedy: Remedy,
}

impl std::fmt::Display for EligibilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key.key(), self.message)
    }
}

impl std::error::Error for EligibilityError {}

/// Named disqualifying condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionCheck {
    ApplicationsClosed,
    CourseUnavailable,
    IncompleteDetails,
    AlreadySubmitted,
}

impl SubmissionCheck {
    pub const fn key(self) -> &'static str {
        match self {
            SubmissionCheck::ApplicationsClosed => "applications_closed",
            SubmissionCheck::CourseUnavailable => "course_unavailable",
            SubmissionCheck::IncompleteDetails => "incomplete_details",
            SubmissionCheck::AlreadySubmitted => "already_submitted",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "applications_closed" => Some(SubmissionCheck::ApplicationsClosed),
            "course_unavailable" => Some(SubmissionCheck::CourseUnavailable),
            "incomplete_details" => Some(SubmissionCheck::IncompleteDetails),
            "already_submitted" => Some(SubmissionCheck::AlreadySubmitted),
            _ => None,
        }
    }

    pub fn evaluate(
        self,
        choice: &ApplicationChoiceSnapshot,
        context: &SubmissionContext,
    ) -> Option<EligibilityError> {
        match self {
            SubmissionCheck::ApplicationsClosed => applications_closed(choice, context),
            SubmissionCheck::CourseUnavailable => course_unavailable(choice),
            SubmissionCheck::IncompleteDetails => incomplete_details(choice),
            SubmissionCheck::AlreadySubmitted => already_submitted(choice),
        }
    }
}

fn applications_closed(
    choice: &ApplicationChoiceSnapshot,
    context: &SubmissionContext,
) -> Option<EligibilityError> {
    let apply_open = context.timetable.can_submit(context.today);
    let course_open = choice.course.opens_for_applications_by(context.today);
    let course_opens = choice.course.applications_open_from;

    let date = match (apply_open, course_open) {
        (true, true) => return None,
        (true, false) => course_opens,
        (false, true) => context.timetable.reopens_on(context.today),
        (false, false) => context.timetable.reopens_on(context.today).max(course_opens),
    };

    Some(EligibilityError {
        key: SubmissionCheck::ApplicationsClosed,
        message: format!(
            "This course is not yet open to applications. You'll be able to submit your application on {}.",
            govuk_date(date)
        ),
        remedy: Remedy::WaitUntil { date },
    })
}

fn course_unavailable(choice: &ApplicationChoiceSnapshot) -> Option<EligibilityError> {
    if !choice.course_full()
        && choice.course_option.site_still_valid
        && choice.course.exposed_in_find
    {
        return None;
    }

    Some(EligibilityError {
        key: SubmissionCheck::CourseUnavailable,
        message: "You cannot submit this application as the course is no longer available. \
                  Remove this application and search for other courses."
            .to_string(),
        remedy: Remedy::RemoveApplication {
            application_choice_id: choice.id,
        },
    })
}

fn incomplete_details(choice: &ApplicationChoiceSnapshot) -> Option<EligibilityError> {
    let missing = choice
        .application_form
        .incomplete_sections(choice.course.level);

    match missing.as_slice() {
        [] => None,
        [FormSection::ScienceGcse] => Some(EligibilityError {
            key: SubmissionCheck::IncompleteDetails,
            message: "To apply for a Primary course, you need a GCSE in science at grade 4 (C) \
                      or above, or equivalent. Add your science GCSE grade (or equivalent). \
                      Your application will be saved as a draft while you finish adding your details."
                .to_string(),
            remedy: Remedy::AddScienceGcse,
        }),
        _ => Some(EligibilityError {
            key: SubmissionCheck::IncompleteDetails,
            message: "You cannot submit this application until you complete your details. \
                      Your application will be saved as a draft while you finish adding your details."
                .to_string(),
            remedy: Remedy::CompleteDetails { sections: missing },
        }),
    }
}

fn already_submitted(choice: &ApplicationChoiceSnapshot) -> Option<EligibilityError> {
    if choice.status == ApplicationStatus::Unsubmitted {
        return None;
    }

    Some(EligibilityError {
        key: SubmissionCheck::AlreadySubmitted,
        message: format!(
            "You cannot submit this application because it has already been submitted (status: {}).",
            choice.status.label()
        ),
        remedy: Remedy::RemoveApplication {
            application_choice_id: choice.id,
        },
    })
}

/// Ordered check list. Order is priority: earlier checks hide later ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRules {
    checks: Vec<SubmissionCheck>,
}

impl Default for SubmissionRules {
    fn default() -> Self {
        Self {
            checks: vec![
                SubmissionCheck::ApplicationsClosed,
                SubmissionCheck::CourseUnavailable,
                SubmissionCheck::IncompleteDetails,
                SubmissionCheck::AlreadySubmitted,
            ],
        }
    }
}

impl SubmissionRules {
    /// Custom order. Repeated checks keep their first position.
    pub fn new(checks: impl IntoIterator<Item = SubmissionCheck>) -> Self {
        let mut ordered = Vec::new();
        for check in checks {
            if !ordered.contains(&check) {
                ordered.push(check);
            }
        }
        Self { checks: ordered }
    }

    pub fn checks(&self) -> &[SubmissionCheck] {
        &self.checks
    }

    /// First failing check, if any. Later checks are never evaluated.
    pub fn evaluate(
        &self,
        choice: &ApplicationChoiceSnapshot,
        context: &SubmissionContext,
    ) -> Option<EligibilityError> {
        let error = self
            .checks
            .iter()
            .find_map(|check| check.evaluate(choice, context))?;

        info!(
            application_choice_id = %choice.id,
            check = error.key.key(),
            "submission blocked"
        );
        Some(error)
    }
}
