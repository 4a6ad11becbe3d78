//! Provider wizard for making or changing an offer.
//!
//! Course, study mode and location follow the course selection skip rules.
//! Subject knowledge enhancement (SKE) pages only appear when the `ske_offers`
//! flag is on and the chosen course teaches an SKE subject.

mod steps;


use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{Feature, FeatureFlags};
use crate::workflows::applications::{Course, CourseCatalog, StudyMode};
use crate::workflows::course_selection::CourseShape;
use crate::workflows::wizard::{StoreKey, WizardDefinition, WizardError};

pub use steps::OfferStep;

/// Subjects whose offers may carry an SKE condition.
pub const SKE_SUBJECT_CODES: [&str; 8] = ["G1", "F3", "F1", "C1", "11", "DT", "Q3", "V6"];

/// Accepted SKE course lengths in weeks.
pub const SKE_LENGTHS: [u32; 6] = [8, 12, 16, 20, 24, 28];

pub const MAX_FURTHER_CONDITIONS: usize = 18;

pub const MAX_CONDITION_LENGTH: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeReason {
    DifferentDegree,
    OutdatedDegree,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferAttributes {
    pub provider_id: Option<u64>,
    pub course_id: Option<u64>,
    pub study_mode: Option<StudyMode>,
    pub course_option_id: Option<u64>,
    pub ske_required: Option<bool>,
    pub ske_reason: Option<SkeReason>,
    pub ske_length: Option<u32>,
    pub further_conditions: Vec<String>,
}

#[derive(Clone)]
pub struct OfferContext {
    pub catalog: Arc<dyn CourseCatalog>,
    pub features: FeatureFlags,
    pub application_choice_id: u64,
    /// Providers the user may make decisions for.
    pub provider_ids: Vec<u64>,
}

impl OfferContext {
    pub(crate) fn shape(&self, attributes: &OfferAttributes) -> Result<CourseShape, WizardError> {
        let (Some(provider_id), Some(course_id)) = (attributes.provider_id, attributes.course_id)
        else {
            return Err(WizardError::Precondition(
                "offer is missing provider or course".to_string(),
            ));
        };
        CourseShape::load(self.catalog.as_ref(), provider_id, course_id)?.ok_or_else(|| {
            WizardError::Precondition(format!(
                "course {course_id} is not offered by provider {provider_id}"
            ))
        })
    }

    pub fn ske_applies(&self, course: &Course) -> bool {
        self.features.is_active(Feature::SkeOffers)
            && course
                .subject_codes
                .iter()
                .any(|code| SKE_SUBJECT_CODES.contains(&code.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeCondition {
    pub reason: SkeReason,
    pub length_weeks: u32,
}

/// Offer ready to be sent to the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDraft {
    pub application_choice_id: u64,
    pub provider_id: u64,
    pub course_id: u64,
    pub course_option_id: u64,
    pub ske_condition: Option<SkeCondition>,
    pub further_conditions: Vec<String>,
}

pub struct OfferWizard;

impl OfferWizard {
    pub fn store_key(provider_user_id: u64, application_choice_id: u64) -> StoreKey {
        StoreKey::new(Self::NAME, provider_user_id, application_choice_id)
    }
}

impl WizardDefinition for OfferWizard {
    const NAME: &'static str = "offer_wizard";
    const STEPS: &'static [&'static str] = &[
        "select_provider",
        "select_course",
        "select_study_mode",
        "select_location",
        "ske_requirements",
        "ske_reason",
        "ske_length",
        "conditions",
        "check",
    ];

    type Attributes = OfferAttributes;
    type Context = OfferContext;
    type Step = OfferStep;
    type Output = OfferDraft;

    fn first_step(_context: &OfferContext) -> OfferStep {
        OfferStep::SelectProvider
    }

    fn materialize(
        attributes: &OfferAttributes,
        context: &OfferContext,
    ) -> Result<OfferDraft, WizardError> {
        let shape = context.shape(attributes)?;
        let option = shape
            .pick(attributes.study_mode, attributes.course_option_id)
            .ok_or_else(|| {
                WizardError::Precondition(format!(
                    "course {} has no available option for the offer",
                    shape.course.id
                ))
            })?;

        let ske_condition = if context.ske_applies(&shape.course)
            && attributes.ske_required == Some(true)
        {
            match (attributes.ske_reason, attributes.ske_length) {
                (Some(reason), Some(length_weeks)) => Some(SkeCondition {
                    reason,
                    length_weeks,
                }),
                _ => {
                    return Err(WizardError::Precondition(
                        "SKE condition is missing a reason or length".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        Ok(OfferDraft {
            application_choice_id: context.application_choice_id,
            provider_id: shape.course.provider_id,
            course_id: shape.course.id,
            course_option_id: option.id,
            ske_condition,
            further_conditions: attributes
                .further_conditions
                .iter()
                .map(|condition| condition.trim().to_string())
                .collect(),
        })
    }
}
