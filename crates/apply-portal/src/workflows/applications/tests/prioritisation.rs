use super::common::*;

use crate::workflows::applications::domain::ApplicationStatus;
use crate::workflows::applications::prioritisation::{
    add_business_days, PrioritisationContext, TaskViewGroup, TaskViewLadder, UNGROUPED_BUCKET,
};

fn context() -> PrioritisationContext {
    // Wednesday
    PrioritisationContext {
        now: at(2024, 3, 6),
        current_cycle_year: CURRENT_YEAR,
        reject_by_default_warning_days: 5,
    }
}

#[test]
fn business_days_skip_weekends() {
    // Friday plus one working day lands on Monday.
    assert_eq!(add_business_days(date(2024, 3, 8), 1), date(2024, 3, 11));
    assert_eq!(add_business_days(date(2024, 3, 6), 5), date(2024, 3, 13));
    assert_eq!(add_business_days(date(2024, 3, 6), 0), date(2024, 3, 6));
}

#[test]
fn deferred_offer_from_previous_cycle_outranks_awaiting_decision() {
    let mut deferred = choice(1, ApplicationStatus::OfferDeferred);
    deferred.current_recruitment_cycle_year = CURRENT_YEAR - 1;
    let awaiting = choice(2, ApplicationStatus::AwaitingProviderDecision);

    let ladder = TaskViewLadder::default();
    let (deferred_bucket, deferred_group) = ladder.classify(&deferred, &context());
    let (awaiting_bucket, _) = ladder.classify(&awaiting, &context());

    assert_eq!(
        deferred_group,
        Some(TaskViewGroup::DeferredOffersPendingReconfirmation)
    );
    assert!(deferred_bucket < awaiting_bucket);

    let ordered = ladder.prioritise(vec![awaiting, deferred], &context());
    assert_eq!(ordered[0].application.id.0, 1);
}

#[test]
fn imminent_reject_by_default_gets_its_own_bucket() {
    let mut imminent = choice(1, ApplicationStatus::AwaitingProviderDecision);
    imminent.reject_by_default_at = Some(at(2024, 3, 12));
    let mut distant = choice(2, ApplicationStatus::AwaitingProviderDecision);
    distant.reject_by_default_at = Some(at(2024, 4, 30));

    let ladder = TaskViewLadder::default();
    assert_eq!(
        ladder.classify(&imminent, &context()),
        (2, Some(TaskViewGroup::AboutToBeRejectedAutomatically))
    );
    assert_eq!(
        ladder.classify(&distant, &context()),
        (3, Some(TaskViewGroup::AwaitingProviderDecision))
    );
}

#[test]
fn rejected_by_default_needs_feedback_only_after_launch() {
    let mut recent = choice(1, ApplicationStatus::Rejected);
    recent.rejected_by_default = true;
    recent.rejected_at = Some(at(2024, 2, 1));

    let mut historic = recent.clone();
    historic.rejected_at = Some(at(2020, 11, 16));

    let mut answered = recent.clone();
    answered.rejection_feedback_given = true;

    let ladder = TaskViewLadder::default();
    assert_eq!(
        ladder.classify(&recent, &context()).1,
        Some(TaskViewGroup::GiveFeedbackForRejectedByDefault)
    );
    assert_eq!(ladder.classify(&historic, &context()).0, UNGROUPED_BUCKET);
    assert_eq!(ladder.classify(&answered, &context()).0, UNGROUPED_BUCKET);
}

#[test]
fn cycle_year_splits_pending_conditions_and_deferrals() {
    let mut previous = choice(1, ApplicationStatus::PendingConditions);
    previous.current_recruitment_cycle_year = CURRENT_YEAR - 1;
    let current = choice(2, ApplicationStatus::PendingConditions);
    let deferred_now = choice(3, ApplicationStatus::OfferDeferred);

    let ladder = TaskViewLadder::default();
    assert_eq!(
        ladder.classify(&previous, &context()).1,
        Some(TaskViewGroup::PendingConditionsPreviousCycle)
    );
    assert_eq!(
        ladder.classify(&current, &context()).1,
        Some(TaskViewGroup::PendingConditionsCurrentCycle)
    );
    assert_eq!(ladder.classify(&deferred_now, &context()).0, 11);
}

#[test]
fn closed_outcomes_fall_to_the_sentinel_bucket() {
    let ladder = TaskViewLadder::default();
    for status in [
        ApplicationStatus::Withdrawn,
        ApplicationStatus::Declined,
        ApplicationStatus::ConditionsNotMet,
        ApplicationStatus::Unsubmitted,
    ] {
        assert_eq!(
            ladder.classify(&choice(1, status), &context()),
            (UNGROUPED_BUCKET, None),
            "{status:?}"
        );
    }
}

#[test]
fn ties_order_by_deadline_then_most_recent_update() {
    let mut no_deadline_recent = choice(1, ApplicationStatus::Interviewing);
    no_deadline_recent.updated_at = at(2024, 3, 5);
    let mut no_deadline_older = choice(2, ApplicationStatus::Interviewing);
    no_deadline_older.updated_at = at(2024, 2, 1);
    let mut late_deadline = choice(3, ApplicationStatus::Interviewing);
    late_deadline.reject_by_default_at = Some(at(2024, 5, 1));
    let mut early_deadline = choice(4, ApplicationStatus::Interviewing);
    early_deadline.reject_by_default_at = Some(at(2024, 4, 1));

    let ordered = TaskViewLadder::default().prioritise(
        vec![no_deadline_older, late_deadline, no_deadline_recent, early_deadline],
        &context(),
    );

    let ids: Vec<u64> = ordered.iter().map(|row| row.application.id.0).collect();
    assert_eq!(ids, vec![4, 3, 1, 2]);
}

#[test]
fn custom_ladder_reorders_buckets() {
    let ladder = TaskViewLadder::new([
        TaskViewGroup::Interviewing,
        TaskViewGroup::AwaitingProviderDecision,
    ]);

    let ordered = ladder.prioritise(
        vec![
            choice(1, ApplicationStatus::AwaitingProviderDecision),
            choice(2, ApplicationStatus::Interviewing),
            choice(3, ApplicationStatus::Offer),
        ],
        &context(),
    );

    let buckets: Vec<(u64, u16)> = ordered
        .iter()
        .map(|row| (row.application.id.0, row.bucket))
        .collect();
    assert_eq!(buckets, vec![(2, 1), (1, 2), (3, UNGROUPED_BUCKET)]);
}

mod properties {
    use proptest::prelude::*;

    use super::*;

    const STATUSES: [ApplicationStatus; 8] = [
        ApplicationStatus::AwaitingProviderDecision,
        ApplicationStatus::Inactive,
        ApplicationStatus::Interviewing,
        ApplicationStatus::Offer,
        ApplicationStatus::PendingConditions,
        ApplicationStatus::Recruited,
        ApplicationStatus::OfferDeferred,
        ApplicationStatus::Withdrawn,
    ];

    proptest! {
        #[test]
        fn ordering_is_sorted_and_stable_under_input_permutation(
            rows in prop::collection::vec((0usize..8, 0i32..2, 0i64..60), 0..20),
        ) {
            let choices: Vec<_> = rows
                .iter()
                .enumerate()
                .map(|(index, (status, year_offset, hours))| {
                    let mut row = choice(index as u64 + 1, STATUSES[*status]);
                    row.current_recruitment_cycle_year = CURRENT_YEAR - year_offset;
                    row.updated_at = at(2024, 3, 1) + chrono::Duration::hours(*hours);
                    row
                })
                .collect();

            let ladder = TaskViewLadder::default();
            let forward = ladder.prioritise(choices.clone(), &context());
            let mut reversed_input = choices;
            reversed_input.reverse();
            let backward = ladder.prioritise(reversed_input, &context());

            prop_assert_eq!(&forward, &backward);
            prop_assert!(forward.windows(2).all(|pair| pair[0].bucket <= pair[1].bucket));
        }
    }
}
