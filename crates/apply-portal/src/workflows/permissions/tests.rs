use serde_json::{json, Value};

use super::*;
use crate::workflows::testing::params;
use crate::workflows::wizard::{
    Advance, Entry, InMemoryWizardStore, Saved, StepTarget, Visit, Wizard,
};

fn relationship(id: u64, training: &str) -> ProviderRelationship {
    ProviderRelationship {
        id,
        training_provider_name: training.to_string(),
        ratifying_provider_name: "Beech University".to_string(),
    }
}

fn context() -> PermissionsSetupContext {
    PermissionsSetupContext {
        relationships: vec![
            relationship(3, "Gorse SCITT"),
            relationship(4, "Oak Academy"),
            relationship(5, "Elm Teaching School"),
        ],
    }
}

fn start<'a>(
    store: &'a InMemoryWizardStore,
    context: &'a PermissionsSetupContext,
) -> Wizard<'a, PermissionsSetupWizard> {
    Wizard::open(store, PermissionsSetupWizard::store_key(8, 1), context, Entry::Start)
        .expect("wizard opens")
}

fn advance(
    wizard: &mut Wizard<'_, PermissionsSetupWizard>,
    step: PermissionsSetupStep,
    value: Value,
) -> Advance<PermissionsSetupStep> {
    assert_eq!(wizard.visit(step).expect("visit"), Visit::Show(step));
    wizard.advance(&params(value)).expect("advance")
}

fn next(step: PermissionsSetupStep) -> Advance<PermissionsSetupStep> {
    Advance::Next(StepTarget::Step(step))
}

fn both() -> Value {
    json!({
        "make_decisions": ["training_provider", "ratifying_provider"],
        "view_safeguarding_information": ["training_provider"],
        "view_diversity_information": ["", "ratifying_provider"],
    })
}

#[test]
fn store_key_is_scoped_to_user_and_provider() {
    assert_eq!(
        PermissionsSetupWizard::store_key(8, 1).as_str(),
        "provider_relationship_permissions_setup_wizard_store_8_1"
    );
}

#[test]
fn walks_one_permissions_page_per_selected_relationship() {
    let store = InMemoryWizardStore::default();
    let context = context();
    let mut wizard = start(&store, &context);

    assert_eq!(
        advance(
            &mut wizard,
            PermissionsSetupStep::ProviderRelationships,
            json!({ "provider_relationships": [4, 3] })
        ),
        next(PermissionsSetupStep::Info)
    );
    assert_eq!(
        advance(&mut wizard, PermissionsSetupStep::Info, json!({})),
        next(PermissionsSetupStep::Permissions(4))
    );
    assert_eq!(
        advance(&mut wizard, PermissionsSetupStep::Permissions(4), both()),
        next(PermissionsSetupStep::Permissions(3))
    );
    assert_eq!(
        wizard.previous_step().expect("previous"),
        StepTarget::Step(PermissionsSetupStep::Info)
    );
    assert_eq!(
        advance(&mut wizard, PermissionsSetupStep::Permissions(3), both()),
        next(PermissionsSetupStep::Check)
    );
    assert_eq!(
        wizard.previous_step().expect("previous"),
        StepTarget::Step(PermissionsSetupStep::Permissions(4))
    );

    assert_eq!(
        wizard.visit(PermissionsSetupStep::Check).expect("visit"),
        Visit::Show(PermissionsSetupStep::Check)
    );
    assert_eq!(
        wizard.previous_step().expect("previous"),
        StepTarget::Step(PermissionsSetupStep::Permissions(3))
    );

    let setups = match wizard.save().expect("save") {
        Saved::Created(setups) => setups,
        Saved::Skipped => panic!("expected permissions"),
    };
    let ids: Vec<u64> = setups.iter().map(|setup| setup.relationship_id).collect();
    assert_eq!(ids, vec![4, 3]);
    let first = &setups[0];
    assert!(first.allows(Permission::MakeDecisions, OrganisationType::TrainingProvider));
    assert!(first.allows(Permission::MakeDecisions, OrganisationType::RatifyingProvider));
    assert!(!first.allows(
        Permission::ViewSafeguardingInformation,
        OrganisationType::RatifyingProvider
    ));
    assert_eq!(
        first.permissions[&Permission::ViewDiversityInformation].len(),
        1,
        "blank organisation entries are dropped"
    );
    assert!(store.is_empty());
}

#[test]
fn answers_are_stored_per_relationship() {
    let store = InMemoryWizardStore::default();
    let context = context();
    let mut wizard = start(&store, &context);
    advance(
        &mut wizard,
        PermissionsSetupStep::ProviderRelationships,
        json!({ "provider_relationships": [3, 4] }),
    );
    advance(&mut wizard, PermissionsSetupStep::Permissions(3), both());

    let stored = &wizard.attributes().provider_relationship_permissions;
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[&3]["make_decisions"],
        vec!["training_provider", "ratifying_provider"]
    );
    assert!(!stored.contains_key(&4));
}

#[test]
fn every_permission_needs_an_organisation() {
    let store = InMemoryWizardStore::default();
    let context = context();
    let mut wizard = start(&store, &context);
    advance(
        &mut wizard,
        PermissionsSetupStep::ProviderRelationships,
        json!({ "provider_relationships": [3] }),
    );

    match advance(
        &mut wizard,
        PermissionsSetupStep::Permissions(3),
        json!({
            "make_decisions": [""],
            "view_safeguarding_information": ["training_provider"],
            "view_diversity_information": ["governing_body"],
        }),
    ) {
        Advance::Invalid(errors) => {
            assert_eq!(
                errors.get("make_decisions"),
                ["Select which organisations can make decisions"]
            );
            assert!(!errors.contains("view_safeguarding_information"));
            assert_eq!(
                errors.get("view_diversity_information"),
                ["Select which organisations can view diversity information"]
            );
        }
        other => panic!("expected invalid, got {other:?}"),
    }
}

#[test]
fn relationships_must_be_chosen_from_those_awaiting_setup() {
    let store = InMemoryWizardStore::default();
    let context = context();
    let mut wizard = start(&store, &context);

    match advance(
        &mut wizard,
        PermissionsSetupStep::ProviderRelationships,
        json!({ "provider_relationships": [] }),
    ) {
        Advance::Invalid(errors) => assert!(errors.contains("provider_relationships")),
        other => panic!("expected invalid, got {other:?}"),
    }
    match wizard
        .advance(&params(json!({ "provider_relationships": [3, 99] })))
        .expect("advance")
    {
        Advance::Invalid(errors) => assert_eq!(
            errors.get("provider_relationships"),
            ["Unknown provider relationship 99"]
        ),
        other => panic!("expected invalid, got {other:?}"),
    }
}

#[test]
fn checking_answers_returns_to_the_check_page_or_the_next_gap() {
    let store = InMemoryWizardStore::default();
    let context = context();
    let mut wizard = start(&store, &context);
    advance(
        &mut wizard,
        PermissionsSetupStep::ProviderRelationships,
        json!({ "provider_relationships": [3, 4] }),
    );
    advance(&mut wizard, PermissionsSetupStep::Permissions(3), both());
    advance(&mut wizard, PermissionsSetupStep::Permissions(4), both());

    let mut change = both();
    change["checking_answers"] = json!(true);
    change["make_decisions"] = json!(["ratifying_provider"]);
    assert_eq!(
        advance(&mut wizard, PermissionsSetupStep::Permissions(3), change),
        next(PermissionsSetupStep::Check)
    );
    assert_eq!(
        wizard.previous_step().expect("previous"),
        StepTarget::Step(PermissionsSetupStep::Check)
    );

    assert_eq!(
        advance(
            &mut wizard,
            PermissionsSetupStep::ProviderRelationships,
            json!({ "provider_relationships": [3, 4, 5] })
        ),
        next(PermissionsSetupStep::Permissions(5))
    );
    assert_eq!(
        wizard.visit(PermissionsSetupStep::Check).expect("visit"),
        Visit::Redirect(PermissionsSetupStep::Permissions(5))
    );
}

#[test]
fn check_page_with_a_gap_is_not_complete() {
    let store = InMemoryWizardStore::default();
    let context = context();
    let mut wizard = start(&store, &context);
    advance(
        &mut wizard,
        PermissionsSetupStep::ProviderRelationships,
        json!({ "provider_relationships": [3] }),
    );

    assert_eq!(
        wizard.visit(PermissionsSetupStep::Check).expect("visit"),
        Visit::Redirect(PermissionsSetupStep::Permissions(3))
    );
    assert_eq!(wizard.save().expect("save"), Saved::Skipped);
}

#[test]
fn stored_step_marker_round_trips_the_relationship_id() {
    let store = InMemoryWizardStore::default();
    let context = context();
    {
        let mut wizard = start(&store, &context);
        advance(
            &mut wizard,
            PermissionsSetupStep::ProviderRelationships,
            json!({ "provider_relationships": [3] }),
        );
        advance(&mut wizard, PermissionsSetupStep::Permissions(3), both());
    }

    let resumed: Wizard<'_, PermissionsSetupWizard> = Wizard::open(
        &store,
        PermissionsSetupWizard::store_key(8, 1),
        &context,
        Entry::Resume,
    )
    .expect("wizard opens");
    assert_eq!(resumed.current_step(), PermissionsSetupStep::Permissions(3));
}

#[test]
fn relationship_ticked_twice_gets_one_permissions_page() {
    let store = InMemoryWizardStore::default();
    let context = context();
    let mut wizard = start(&store, &context);

    assert_eq!(
        advance(
            &mut wizard,
            PermissionsSetupStep::ProviderRelationships,
            json!({ "provider_relationships": [3, 4, 3] })
        ),
        next(PermissionsSetupStep::Info)
    );
    assert_eq!(wizard.attributes().provider_relationships, vec![3, 4]);

    advance(&mut wizard, PermissionsSetupStep::Permissions(3), both());
    assert_eq!(
        advance(&mut wizard, PermissionsSetupStep::Permissions(4), both()),
        next(PermissionsSetupStep::Check)
    );
    assert_eq!(
        wizard.visit(PermissionsSetupStep::Check).expect("visit"),
        Visit::Show(PermissionsSetupStep::Check)
    );
}

#[test]
fn stored_duplicate_relationships_redirect_to_the_selection_page() {
    let store = InMemoryWizardStore::default();
    let context = context();
    let key = PermissionsSetupWizard::store_key(8, 1);
    store.put_raw(
        &key,
        json!({
            "version": 1,
            "current_step": { "permissions": 3 },
            "attributes": {
                "provider_relationships": [3, 3],
                "provider_relationship_permissions": { "3": both() },
            },
        })
        .to_string(),
    );

    let mut wizard: Wizard<'_, PermissionsSetupWizard> =
        Wizard::open(&store, key, &context, Entry::Resume).expect("wizard opens");
    assert_eq!(wizard.current_step(), PermissionsSetupStep::Permissions(3));
    assert_eq!(
        wizard.visit(PermissionsSetupStep::Check).expect("visit"),
        Visit::Redirect(PermissionsSetupStep::ProviderRelationships)
    );
    wizard
        .visit(PermissionsSetupStep::ProviderRelationships)
        .expect("visit");
    assert_eq!(
        wizard.errors().expect("errors").get("provider_relationships"),
        ["Provider relationship 3 is selected more than once"]
    );
}
