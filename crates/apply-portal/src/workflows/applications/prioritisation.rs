//! Task-view bucketing for the provider interface.
//!
//! Each application is matched against a ladder of named predicates; the
//! 1-based position of the first match is its bucket. Applications matching
//! nothing fall into [`UNGROUPED_BUCKET`]. Classification is pure.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationChoice, ApplicationStatus};

/// Bucket for applications that match no group.
pub const UNGROUPED_BUCKET: u16 = 999;

/// Rejected-by-default applications before this date never asked for feedback.
pub fn reject_by_default_feedback_launch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 11, 17).unwrap_or(NaiveDate::MIN)
}

/// Inputs that are not part of the application itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritisationContext {
    pub now: DateTime<Utc>,
    pub current_cycle_year: i32,
    pub reject_by_default_warning_days: u32,
}

impl PrioritisationContext {
    fn previous_cycle_year(&self) -> i32 {
        self.current_cycle_year - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskViewGroup {
    DeferredOffersPendingReconfirmation,
    AboutToBeRejectedAutomatically,
    AwaitingProviderDecision,
    Inactive,
    GiveFeedbackForRejectedByDefault,
    Interviewing,
    PendingConditionsPreviousCycle,
    WaitingOnCandidate,
    PendingConditionsCurrentCycle,
    SuccessfulCandidates,
    DeferredOffersCurrentCycle,
}

impl TaskViewGroup {
    pub const fn label(self) -> &'static str {
        match self {
            TaskViewGroup::DeferredOffersPendingReconfirmation => {
                "deferred_offers_pending_reconfirmation"
            }
            TaskViewGroup::AboutToBeRejectedAutomatically => "about_to_be_rejected_automatically",
            TaskViewGroup::AwaitingProviderDecision => "awaiting_provider_decision",
            TaskViewGroup::Inactive => "inactive",
            TaskViewGroup::GiveFeedbackForRejectedByDefault => "give_feedback_for_rbd",
            TaskViewGroup::Interviewing => "interviewing",
            TaskViewGroup::PendingConditionsPreviousCycle => "pending_conditions_previous_cycle",
            TaskViewGroup::WaitingOnCandidate => "waiting_on_candidate",
            TaskViewGroup::PendingConditionsCurrentCycle => "pending_conditions_current_cycle",
            TaskViewGroup::SuccessfulCandidates => "successful_candidates",
            TaskViewGroup::DeferredOffersCurrentCycle => "deferred_offers_current_cycle",
        }
    }

    pub fn matches(self, choice: &ApplicationChoice, context: &PrioritisationContext) -> bool {
        let year = choice.current_recruitment_cycle_year;
        let current = year == context.current_cycle_year;
        let previous = year == context.previous_cycle_year();

        match self {
            TaskViewGroup::DeferredOffersPendingReconfirmation => {
                choice.status == ApplicationStatus::OfferDeferred && previous
            }
            TaskViewGroup::AboutToBeRejectedAutomatically => {
                choice.status == ApplicationStatus::AwaitingProviderDecision
                    && choice.reject_by_default_at.is_some_and(|deadline| {
                        deadline.date_naive()
                            <= add_business_days(
                                context.now.date_naive(),
                                context.reject_by_default_warning_days,
                            )
                    })
            }
            TaskViewGroup::AwaitingProviderDecision => {
                choice.status == ApplicationStatus::AwaitingProviderDecision
            }
            TaskViewGroup::Inactive => choice.status == ApplicationStatus::Inactive,
            TaskViewGroup::GiveFeedbackForRejectedByDefault => {
                choice.status == ApplicationStatus::Rejected
                    && choice.rejected_by_default
                    && !choice.rejection_feedback_given
                    && choice.rejected_at.is_some_and(|rejected_at| {
                        rejected_at.date_naive() >= reject_by_default_feedback_launch()
                    })
            }
            TaskViewGroup::Interviewing => choice.status == ApplicationStatus::Interviewing,
            TaskViewGroup::PendingConditionsPreviousCycle => {
                choice.status == ApplicationStatus::PendingConditions && previous
            }
            TaskViewGroup::WaitingOnCandidate => {
                choice.status == ApplicationStatus::Offer && current
            }
            TaskViewGroup::PendingConditionsCurrentCycle => {
                choice.status == ApplicationStatus::PendingConditions && current
            }
            TaskViewGroup::SuccessfulCandidates => {
                choice.status == ApplicationStatus::Recruited && current
            }
            TaskViewGroup::DeferredOffersCurrentCycle => {
                choice.status == ApplicationStatus::OfferDeferred && current
            }
        }
    }
}

/// `days` working days after `from`, skipping weekends.
pub fn add_business_days(from: NaiveDate, days: u32) -> NaiveDate {
    let mut date = from;
    let mut remaining = days;
    while remaining > 0 {
        date = date.checked_add_days(Days::new(1)).unwrap_or(date);
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    date
}

/// An application annotated with its task-view bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrioritisedApplication {
    pub bucket: u16,
    pub group: Option<TaskViewGroup>,
    pub application: ApplicationChoice,
}

/// Ordered predicate ladder. Earlier groups sort first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskViewLadder {
    groups: Vec<TaskViewGroup>,
}

impl Default for TaskViewLadder {
    fn default() -> Self {
        Self {
            groups: vec![
                TaskViewGroup::DeferredOffersPendingReconfirmation,
                TaskViewGroup::AboutToBeRejectedAutomatically,
                TaskViewGroup::AwaitingProviderDecision,
                TaskViewGroup::Inactive,
                TaskViewGroup::GiveFeedbackForRejectedByDefault,
                TaskViewGroup::Interviewing,
                TaskViewGroup::PendingConditionsPreviousCycle,
                TaskViewGroup::WaitingOnCandidate,
                TaskViewGroup::PendingConditionsCurrentCycle,
                TaskViewGroup::SuccessfulCandidates,
                TaskViewGroup::DeferredOffersCurrentCycle,
            ],
        }
    }
}

impl TaskViewLadder {
    pub fn new(groups: impl IntoIterator<Item = TaskViewGroup>) -> Self {
        let mut ordered = Vec::new();
        for group in groups {
            if !ordered.contains(&group) {
                ordered.push(group);
            }
        }
        Self { groups: ordered }
    }

    pub fn groups(&self) -> &[TaskViewGroup] {
        &self.groups
    }

    pub fn classify(
        &self,
        choice: &ApplicationChoice,
        context: &PrioritisationContext,
    ) -> (u16, Option<TaskViewGroup>) {
        self.groups
            .iter()
            .zip(1u16..)
            .find(|(group, _)| group.matches(choice, context))
            .map(|(group, bucket)| (bucket, Some(*group)))
            .unwrap_or((UNGROUPED_BUCKET, None))
    }

    /// Bucket every application and order them for display.
    pub fn prioritise(
        &self,
        choices: impl IntoIterator<Item = ApplicationChoice>,
        context: &PrioritisationContext,
    ) -> Vec<PrioritisedApplication> {
        let mut prioritised: Vec<PrioritisedApplication> = choices
            .into_iter()
            .map(|application| {
                let (bucket, group) = self.classify(&application, context);
                PrioritisedApplication {
                    bucket,
                    group,
                    application,
                }
            })
            .collect();

        prioritised.sort_by(compare_prioritised);
        prioritised
    }
}

fn compare_prioritised(left: &PrioritisedApplication, right: &PrioritisedApplication) -> Ordering {
    left.bucket
        .cmp(&right.bucket)
        .then_with(|| {
            match (
                left.application.reject_by_default_at,
                right.application.reject_by_default_at,
            ) {
                (Some(left), Some(right)) => left.cmp(&right),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
        .then_with(|| right.application.updated_at.cmp(&left.application.updated_at))
        .then_with(|| left.application.id.cmp(&right.application.id))
}
