//! Provider wizard for recording structured reasons when rejecting an
//! application, or giving feedback on one that was rejected by default.

pub mod catalog;


use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Feature, FeatureFlags};
use crate::workflows::wizard::{
    Entry, Presence, Step, StepTarget, StoreKey, ValidationErrors, Wizard, WizardDefinition,
    WizardError, WizardStateStore,
};

pub use catalog::{DetailsTemplate, ReasonTemplate, RejectionReasonCatalog};

/// Longest free-text explanation accepted for a single reason.
pub const MAX_DETAILS_WORDS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RejectionAttributes {
    /// Top-level reason ids.
    pub selected_reasons: Vec<String>,
    /// Parent reason id to the nested reason ids chosen under it.
    pub selected_sub_reasons: BTreeMap<String, Vec<String>>,
    /// Details field id to the text entered.
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionStep {
    New,
    Check,
}

pub struct RejectionsContext {
    pub catalog: Arc<RejectionReasonCatalog>,
    pub features: FeatureFlags,
    /// Rejected by default and still waiting for feedback.
    pub rejected_by_default_without_feedback: bool,
}

impl Step for RejectionStep {
    type Attributes = RejectionAttributes;
    type Context = RejectionsContext;

    fn name(&self) -> &'static str {
        match self {
            RejectionStep::New => "new",
            RejectionStep::Check => "check",
        }
    }

    fn permitted_params(&self) -> &'static [&'static str] {
        match self {
            RejectionStep::New => &["selected_reasons", "selected_sub_reasons", "details"],
            RejectionStep::Check => &[],
        }
    }

    fn validate(
        &self,
        attributes: &RejectionAttributes,
        context: &RejectionsContext,
    ) -> Result<ValidationErrors, WizardError> {
        // The check page re-validates so a stale store cannot be committed.
        Ok(validate_reasons(attributes, &context.catalog))
    }

    fn next_step(
        &self,
        _attributes: &RejectionAttributes,
        _context: &RejectionsContext,
    ) -> Result<StepTarget<Self>, WizardError> {
        Ok(match self {
            RejectionStep::New => StepTarget::Step(RejectionStep::Check),
            RejectionStep::Check => StepTarget::Exit,
        })
    }

    fn previous_step(
        &self,
        _attributes: &RejectionAttributes,
        _context: &RejectionsContext,
    ) -> Result<StepTarget<Self>, WizardError> {
        Ok(match self {
            RejectionStep::New => StepTarget::Exit,
            RejectionStep::Check => StepTarget::Step(RejectionStep::New),
        })
    }

    fn completed(
        &self,
        _attributes: &RejectionAttributes,
        _context: &RejectionsContext,
    ) -> Result<bool, WizardError> {
        Ok(matches!(self, RejectionStep::Check))
    }
}

fn validate_reasons(
    attributes: &RejectionAttributes,
    catalog: &RejectionReasonCatalog,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let selected: Vec<&String> = attributes
        .selected_reasons
        .iter()
        .filter(|id| id.is_present())
        .collect();

    if selected.is_empty() {
        errors.add("selected_reasons", "Select at least one reason");
        return errors;
    }

    for id in selected {
        let Some(reason) = catalog.reason(id) else {
            errors.add("selected_reasons", format!("Unknown rejection reason `{id}`"));
            continue;
        };

        if reason.sub_reasons.is_empty() {
            check_details(reason, attributes, &mut errors);
            continue;
        }

        let field = format!("{}_selected_reasons", reason.id);
        let chosen = attributes
            .selected_sub_reasons
            .get(reason.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        if !chosen.iter().any(|sub| sub.is_present()) {
            errors.add(
                field.as_str(),
                format!("Select reasons related to {}", reason.label.to_lowercase()),
            );
            continue;
        }
        for sub_id in chosen.iter().filter(|sub| sub.is_present()) {
            match reason.sub_reason(sub_id) {
                Some(sub_reason) => check_details(sub_reason, attributes, &mut errors),
                None => errors.add(field.as_str(), format!("Unknown rejection reason `{sub_id}`")),
            }
        }
    }

    errors
}

fn check_details(
    reason: &ReasonTemplate,
    attributes: &RejectionAttributes,
    errors: &mut ValidationErrors,
) {
    let Some(details) = &reason.details else {
        return;
    };
    match attributes.details.get(&details.id) {
        Some(text) if text.is_present() => {
            if text.split_whitespace().count() > MAX_DETAILS_WORDS {
                errors.add(
                    details.id.as_str(),
                    format!("{} must be {MAX_DETAILS_WORDS} words or fewer", details.label),
                );
            }
        }
        _ => errors.add(details.id.as_str(), format!("Enter {}", details.label.to_lowercase())),
    }
}

/// A reason as recorded against the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedReason {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_reasons: Vec<SelectedReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    RejectApplication,
    RejectByDefaultFeedback,
}

/// Output of the wizard, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredRejectionReasons {
    pub kind: RejectionKind,
    pub selected_reasons: Vec<SelectedReason>,
}

impl StructuredRejectionReasons {
    pub fn success_message(&self) -> &'static str {
        match self.kind {
            RejectionKind::RejectApplication => "Application rejected",
            RejectionKind::RejectByDefaultFeedback => "Feedback sent",
        }
    }
}

fn selected(template: &ReasonTemplate, attributes: &RejectionAttributes) -> SelectedReason {
    let chosen = attributes
        .selected_sub_reasons
        .get(template.id)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    SelectedReason {
        id: template.id.to_string(),
        label: template.label.to_string(),
        details: template
            .details
            .as_ref()
            .and_then(|details| attributes.details.get(&details.id))
            .map(|text| text.trim().to_string()),
        selected_reasons: template
            .sub_reasons
            .iter()
            .filter(|sub| chosen.iter().any(|id| id == sub.id))
            .map(|sub| selected(sub, attributes))
            .collect(),
    }
}

pub struct RejectionsWizard;

impl RejectionsWizard {
    pub fn store_key(provider_user_id: u64, application_choice_id: u64) -> StoreKey {
        StoreKey::new(Self::NAME, provider_user_id, application_choice_id)
    }

    /// Opens the wizard, refusing when structured reasons are switched off.
    pub fn open<'a>(
        store: &'a dyn WizardStateStore,
        key: StoreKey,
        context: &'a RejectionsContext,
        entry: Entry,
    ) -> Result<Wizard<'a, Self>, WizardError> {
        if !context.features.is_active(Feature::StructuredRejectionReasons) {
            debug!(key = %key, "structured rejection reasons disabled");
            return Err(WizardError::Precondition(format!(
                "feature `{}` is not active",
                Feature::StructuredRejectionReasons.key()
            )));
        }
        Wizard::open(store, key, context, entry)
    }
}

impl WizardDefinition for RejectionsWizard {
    const NAME: &'static str = "rejections_wizard";
    const STEPS: &'static [&'static str] = &["new", "check"];

    type Attributes = RejectionAttributes;
    type Context = RejectionsContext;
    type Step = RejectionStep;
    type Output = StructuredRejectionReasons;

    fn first_step(_context: &RejectionsContext) -> RejectionStep {
        RejectionStep::New
    }

    fn materialize(
        attributes: &RejectionAttributes,
        context: &RejectionsContext,
    ) -> Result<StructuredRejectionReasons, WizardError> {
        let errors = validate_reasons(attributes, &context.catalog);
        if !errors.is_empty() {
            return Err(WizardError::Precondition(format!(
                "rejection reasons incomplete: {}",
                errors.fields().collect::<Vec<_>>().join(", ")
            )));
        }

        let selected_reasons = context
            .catalog
            .reasons()
            .iter()
            .filter(|reason| attributes.selected_reasons.iter().any(|id| id == reason.id))
            .map(|reason| selected(reason, attributes))
            .collect();

        let kind = if context.rejected_by_default_without_feedback {
            RejectionKind::RejectByDefaultFeedback
        } else {
            RejectionKind::RejectApplication
        };

        Ok(StructuredRejectionReasons {
            kind,
            selected_reasons,
        })
    }
}
