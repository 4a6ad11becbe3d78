//! Provider wizard for setting up which organisation in a training/ratifying
//! partnership may make decisions and view sensitive information.
//!
//! The user picks the relationships to set up, reads an explainer, then sees
//! one permissions page per relationship before checking their answers.

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflows::wizard::{
    Presence, StateMap, Step, StepTarget, StoreKey, ValidationErrors, WizardDefinition,
    WizardError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    MakeDecisions,
    ViewSafeguardingInformation,
    ViewDiversityInformation,
}

impl Permission {
    pub const ALL: [Permission; 3] = [
        Permission::MakeDecisions,
        Permission::ViewSafeguardingInformation,
        Permission::ViewDiversityInformation,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Permission::MakeDecisions => "make_decisions",
            Permission::ViewSafeguardingInformation => "view_safeguarding_information",
            Permission::ViewDiversityInformation => "view_diversity_information",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|permission| permission.key() == key)
    }

    fn humanize(self) -> &'static str {
        match self {
            Permission::MakeDecisions => "make decisions",
            Permission::ViewSafeguardingInformation => "view safeguarding information",
            Permission::ViewDiversityInformation => "view diversity information",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganisationType {
    TrainingProvider,
    RatifyingProvider,
}

impl OrganisationType {
    fn from_key(key: &str) -> Option<Self> {
        match key.trim() {
            "training_provider" => Some(OrganisationType::TrainingProvider),
            "ratifying_provider" => Some(OrganisationType::RatifyingProvider),
            _ => None,
        }
    }
}

/// A training/ratifying partnership awaiting permissions setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRelationship {
    pub id: u64,
    pub training_provider_name: String,
    pub ratifying_provider_name: String,
}

/// Form-shaped permissions: permission key to the organisation types ticked.
pub type PermissionAnswers = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsSetupAttributes {
    pub provider_relationships: Vec<u64>,
    pub provider_relationship_permissions: BTreeMap<u64, PermissionAnswers>,
    /// Set when the user returns from the check page to change an answer.
    pub checking_answers: bool,
}

impl PermissionsSetupAttributes {
    fn answers(&self, relationship_id: u64) -> Option<&PermissionAnswers> {
        self.provider_relationship_permissions.get(&relationship_id)
    }

    fn neighbour(&self, relationship_id: u64, offset: isize) -> Option<u64> {
        let position = self
            .provider_relationships
            .iter()
            .position(|id| *id == relationship_id)?;
        let neighbour = position.checked_add_signed(offset)?;
        self.provider_relationships.get(neighbour).copied()
    }

    /// First selected relationship whose permissions are missing or invalid.
    pub fn next_needing_setup(&self) -> Option<u64> {
        self.provider_relationships.iter().copied().find(|id| {
            self.answers(*id)
                .map_or(true, |answers| !permission_errors(answers).is_empty())
        })
    }
}

pub struct PermissionsSetupContext {
    pub relationships: Vec<ProviderRelationship>,
}

impl PermissionsSetupContext {
    pub fn relationship(&self, id: u64) -> Option<&ProviderRelationship> {
        self.relationships.iter().find(|relationship| relationship.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionsSetupStep {
    ProviderRelationships,
    Info,
    Permissions(u64),
    Check,
}

use PermissionsSetupStep::*;

fn permission_errors(answers: &PermissionAnswers) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for permission in Permission::ALL {
        let ticked = answers
            .get(permission.key())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let chosen: Vec<&String> = ticked.iter().filter(|value| value.is_present()).collect();
        if chosen.is_empty()
            || chosen
                .iter()
                .any(|value| OrganisationType::from_key(value).is_none())
        {
            errors.add(
                permission.key(),
                format!("Select which organisations can {}", permission.humanize()),
            );
        }
    }
    errors
}

impl Step for PermissionsSetupStep {
    type Attributes = PermissionsSetupAttributes;
    type Context = PermissionsSetupContext;

    fn name(&self) -> &'static str {
        match self {
            ProviderRelationships => "provider_relationships",
            Info => "info",
            Permissions(_) => "permissions",
            Check => "check",
        }
    }

    fn permitted_params(&self) -> &'static [&'static str] {
        match self {
            ProviderRelationships => &["provider_relationships", "checking_answers"],
            Info => &[],
            Permissions(_) => &[
                "make_decisions",
                "view_safeguarding_information",
                "view_diversity_information",
                "checking_answers",
            ],
            Check => &[],
        }
    }

    fn validate(
        &self,
        attributes: &PermissionsSetupAttributes,
        context: &PermissionsSetupContext,
    ) -> Result<ValidationErrors, WizardError> {
        let mut errors = ValidationErrors::new();
        match self {
            ProviderRelationships => {
                if attributes.provider_relationships.is_empty() {
                    errors.add(
                        "provider_relationships",
                        "Select the organisations you want to set up permissions for",
                    );
                }
                let mut seen = BTreeSet::new();
                for id in &attributes.provider_relationships {
                    if context.relationship(*id).is_none() {
                        errors.add(
                            "provider_relationships",
                            format!("Unknown provider relationship {id}"),
                        );
                    } else if !seen.insert(*id) {
                        errors.add(
                            "provider_relationships",
                            format!("Provider relationship {id} is selected more than once"),
                        );
                    }
                }
            }
            Permissions(id) => {
                let empty = PermissionAnswers::new();
                errors.merge(permission_errors(attributes.answers(*id).unwrap_or(&empty)));
            }
            Info | Check => {}
        }
        Ok(errors)
    }

    fn next_step(
        &self,
        attributes: &PermissionsSetupAttributes,
        _context: &PermissionsSetupContext,
    ) -> Result<StepTarget<Self>, WizardError> {
        let target = match self {
            ProviderRelationships => Info,
            Info => attributes
                .provider_relationships
                .first()
                .copied()
                .map_or(Check, Permissions),
            Permissions(id) => attributes.neighbour(*id, 1).map_or(Check, Permissions),
            Check => return Ok(StepTarget::Exit),
        };
        Ok(StepTarget::Step(target))
    }

    /// While checking answers, a submitted page goes to the first relationship
    /// still needing setup, or straight back to the check page.
    fn next_after_submit(
        &self,
        attributes: &PermissionsSetupAttributes,
        context: &PermissionsSetupContext,
    ) -> Result<StepTarget<Self>, WizardError> {
        if attributes.checking_answers && !matches!(self, Check) {
            return Ok(StepTarget::Step(
                attributes.next_needing_setup().map_or(Check, Permissions),
            ));
        }
        self.next_step(attributes, context)
    }

    fn previous_step(
        &self,
        attributes: &PermissionsSetupAttributes,
        _context: &PermissionsSetupContext,
    ) -> Result<StepTarget<Self>, WizardError> {
        if attributes.checking_answers && !matches!(self, Check) {
            return Ok(StepTarget::Step(Check));
        }
        let target = match self {
            ProviderRelationships => return Ok(StepTarget::Exit),
            Info => ProviderRelationships,
            Permissions(id) => attributes.neighbour(*id, -1).map_or(Info, Permissions),
            Check => attributes
                .provider_relationships
                .last()
                .copied()
                .map_or(Info, Permissions),
        };
        Ok(StepTarget::Step(target))
    }

    fn completed(
        &self,
        attributes: &PermissionsSetupAttributes,
        _context: &PermissionsSetupContext,
    ) -> Result<bool, WizardError> {
        Ok(matches!(self, Check) && attributes.next_needing_setup().is_none())
    }

    /// Permission answers are filed under the relationship this page is for.
    /// A relationship ticked twice is kept once, in its first position.
    fn assign(&self, attributes: &mut StateMap, name: &str, value: Value) {
        let Permissions(relationship_id) = self else {
            let value = match (name, value) {
                ("provider_relationships", Value::Array(ids)) => {
                    let mut unique = Vec::with_capacity(ids.len());
                    for id in ids {
                        if !unique.contains(&id) {
                            unique.push(id);
                        }
                    }
                    Value::Array(unique)
                }
                (_, value) => value,
            };
            attributes.insert(name.to_string(), value);
            return;
        };
        if Permission::from_key(name).is_none() {
            attributes.insert(name.to_string(), value);
            return;
        }

        let all = attributes
            .entry("provider_relationship_permissions".to_string())
            .or_insert_with(|| Value::Object(StateMap::new()));
        if !all.is_object() {
            *all = Value::Object(StateMap::new());
        }
        if let Value::Object(all) = all {
            let answers = all
                .entry(relationship_id.to_string())
                .or_insert_with(|| Value::Object(StateMap::new()));
            if !answers.is_object() {
                *answers = Value::Object(StateMap::new());
            }
            if let Value::Object(answers) = answers {
                answers.insert(name.to_string(), value);
            }
        }
    }
}

/// Permissions agreed for one relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipPermissionsSetup {
    pub relationship_id: u64,
    pub permissions: BTreeMap<Permission, BTreeSet<OrganisationType>>,
}

impl RelationshipPermissionsSetup {
    pub fn allows(&self, permission: Permission, organisation: OrganisationType) -> bool {
        self.permissions
            .get(&permission)
            .is_some_and(|organisations| organisations.contains(&organisation))
    }
}

pub struct PermissionsSetupWizard;

impl PermissionsSetupWizard {
    pub fn store_key(provider_user_id: u64, provider_id: u64) -> StoreKey {
        StoreKey::new(Self::NAME, provider_user_id, provider_id)
    }
}

impl WizardDefinition for PermissionsSetupWizard {
    const NAME: &'static str = "provider_relationship_permissions_setup_wizard";
    const STEPS: &'static [&'static str] = &["provider_relationships", "info", "permissions", "check"];

    type Attributes = PermissionsSetupAttributes;
    type Context = PermissionsSetupContext;
    type Step = PermissionsSetupStep;
    type Output = Vec<RelationshipPermissionsSetup>;

    fn first_step(_context: &PermissionsSetupContext) -> PermissionsSetupStep {
        ProviderRelationships
    }

    fn materialize(
        attributes: &PermissionsSetupAttributes,
        context: &PermissionsSetupContext,
    ) -> Result<Vec<RelationshipPermissionsSetup>, WizardError> {
        attributes
            .provider_relationships
            .iter()
            .map(|id| {
                if context.relationship(*id).is_none() {
                    return Err(WizardError::Precondition(format!(
                        "provider relationship {id} is not available for setup"
                    )));
                }
                let answers = attributes.answers(*id).ok_or_else(|| {
                    WizardError::Precondition(format!(
                        "provider relationship {id} has no permissions"
                    ))
                })?;
                let permissions = Permission::ALL
                    .into_iter()
                    .map(|permission| {
                        let organisations = answers
                            .get(permission.key())
                            .into_iter()
                            .flatten()
                            .filter_map(|value| OrganisationType::from_key(value))
                            .collect();
                        (permission, organisations)
                    })
                    .collect();
                Ok(RelationshipPermissionsSetup {
                    relationship_id: *id,
                    permissions,
                })
            })
            .collect()
    }
}
