use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    OfferAttributes, OfferContext, MAX_CONDITION_LENGTH, MAX_FURTHER_CONDITIONS, SKE_LENGTHS,
};
use crate::workflows::course_selection::CourseShape;
use crate::workflows::wizard::{Presence, StateMap, Step, StepTarget, ValidationErrors, WizardError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStep {
    SelectProvider,
    SelectCourse,
    SelectStudyMode,
    SelectLocation,
    SkeRequirements,
    SkeReason,
    SkeLength,
    Conditions,
    Check,
}

use OfferStep::*;

/// Answers tied to the course they were given for.
const COURSE_DEPENDENT: [&str; 5] = [
    "study_mode",
    "course_option_id",
    "ske_required",
    "ske_reason",
    "ske_length",
];

/// First page after the course option is settled.
fn after_location(shape: &CourseShape, context: &OfferContext) -> OfferStep {
    if context.ske_applies(&shape.course) {
        SkeRequirements
    } else {
        Conditions
    }
}

/// Last course page the user actually saw.
fn last_course_step(shape: &CourseShape, attributes: &OfferAttributes) -> OfferStep {
    if shape.multiple_sites(attributes.study_mode) {
        SelectLocation
    } else if shape.multiple_study_modes() {
        SelectStudyMode
    } else {
        SelectCourse
    }
}

impl Step for OfferStep {
    type Attributes = OfferAttributes;
    type Context = OfferContext;

    fn name(&self) -> &'static str {
        match self {
            SelectProvider => "select_provider",
            SelectCourse => "select_course",
            SelectStudyMode => "select_study_mode",
            SelectLocation => "select_location",
            SkeRequirements => "ske_requirements",
            SkeReason => "ske_reason",
            SkeLength => "ske_length",
            Conditions => "conditions",
            Check => "check",
        }
    }

    fn permitted_params(&self) -> &'static [&'static str] {
        match self {
            SelectProvider => &["provider_id"],
            SelectCourse => &["course_id"],
            SelectStudyMode => &["study_mode"],
            SelectLocation => &["course_option_id"],
            SkeRequirements => &["ske_required"],
            SkeReason => &["ske_reason"],
            SkeLength => &["ske_length"],
            Conditions => &["further_conditions"],
            Check => &[],
        }
    }

    fn validate(
        &self,
        attributes: &OfferAttributes,
        context: &OfferContext,
    ) -> Result<ValidationErrors, WizardError> {
        let mut errors = ValidationErrors::new();
        match self {
            SelectProvider => match attributes.provider_id {
                None => errors.add("provider_id", "Select a training provider"),
                Some(provider_id) => {
                    if !context.provider_ids.contains(&provider_id)
                        || context.catalog.provider(provider_id)?.is_none()
                    {
                        errors.add("provider_id", "Select a training provider from the list");
                    }
                }
            },
            SelectCourse => {
                let (Some(provider_id), Some(course_id)) =
                    (attributes.provider_id, attributes.course_id)
                else {
                    errors.add("course_id", "Select a course");
                    return Ok(errors);
                };
                match CourseShape::load(context.catalog.as_ref(), provider_id, course_id)? {
                    None => errors.add("course_id", "Select a course from the list"),
                    Some(shape) if shape.available.is_empty() => {
                        errors.add("course_id", "This course has no locations with vacancies")
                    }
                    Some(_) => {}
                }
            }
            SelectStudyMode => match attributes.study_mode {
                None => errors.add("study_mode", "Select full time or part time"),
                Some(mode) => {
                    if !context.shape(attributes)?.study_modes().contains(&mode) {
                        errors.add("study_mode", "This study mode is not available for this course");
                    }
                }
            },
            SelectLocation => match attributes.course_option_id {
                None => errors.add("course_option_id", "Select a location"),
                Some(option_id) => {
                    let shape = context.shape(attributes)?;
                    if shape.pick(attributes.study_mode, Some(option_id)).is_none() {
                        errors.add("course_option_id", "Select a location from the list");
                    }
                }
            },
            SkeRequirements => {
                if attributes.ske_required.is_none() {
                    errors.add(
                        "ske_required",
                        "Select whether the candidate needs to take a subject knowledge enhancement course",
                    );
                }
            }
            SkeReason => {
                if attributes.ske_reason.is_none() {
                    errors.add("ske_reason", "Select why the candidate needs to take a course");
                }
            }
            SkeLength => match attributes.ske_length {
                Some(weeks) if SKE_LENGTHS.contains(&weeks) => {}
                _ => errors.add("ske_length", "Select how long the course must be"),
            },
            Conditions => validate_conditions(&attributes.further_conditions, &mut errors),
            Check => {}
        }
        Ok(errors)
    }

    fn next_step(
        &self,
        attributes: &OfferAttributes,
        context: &OfferContext,
    ) -> Result<StepTarget<Self>, WizardError> {
        let target = match self {
            SelectProvider => SelectCourse,
            SelectCourse => {
                let shape = context.shape(attributes)?;
                if shape.multiple_study_modes() {
                    SelectStudyMode
                } else if shape.multiple_sites(None) {
                    SelectLocation
                } else {
                    after_location(&shape, context)
                }
            }
            SelectStudyMode => {
                let shape = context.shape(attributes)?;
                if shape.multiple_sites(attributes.study_mode) {
                    SelectLocation
                } else {
                    after_location(&shape, context)
                }
            }
            SelectLocation => after_location(&context.shape(attributes)?, context),
            SkeRequirements => {
                if attributes.ske_required == Some(true) {
                    SkeReason
                } else {
                    Conditions
                }
            }
            SkeReason => SkeLength,
            SkeLength => Conditions,
            Conditions => Check,
            Check => return Ok(StepTarget::Exit),
        };
        Ok(StepTarget::Step(target))
    }

    fn previous_step(
        &self,
        attributes: &OfferAttributes,
        context: &OfferContext,
    ) -> Result<StepTarget<Self>, WizardError> {
        let target = match self {
            SelectProvider => return Ok(StepTarget::Exit),
            SelectCourse => SelectProvider,
            SelectStudyMode => SelectCourse,
            SelectLocation => {
                if context.shape(attributes)?.multiple_study_modes() {
                    SelectStudyMode
                } else {
                    SelectCourse
                }
            }
            SkeRequirements => last_course_step(&context.shape(attributes)?, attributes),
            SkeReason => SkeRequirements,
            SkeLength => SkeReason,
            Conditions => {
                let shape = context.shape(attributes)?;
                if !context.ske_applies(&shape.course) {
                    last_course_step(&shape, attributes)
                } else if attributes.ske_required == Some(true) {
                    SkeLength
                } else {
                    SkeRequirements
                }
            }
            Check => Conditions,
        };
        Ok(StepTarget::Step(target))
    }

    fn completed(
        &self,
        _attributes: &OfferAttributes,
        _context: &OfferContext,
    ) -> Result<bool, WizardError> {
        Ok(matches!(self, Check))
    }

    /// A different provider or course invalidates every answer that depends on it.
    fn assign(&self, attributes: &mut StateMap, name: &str, value: Value) {
        let changed = matches!(name, "provider_id" | "course_id")
            && attributes.get(name).is_some_and(|current| *current != value);
        if changed {
            if name == "provider_id" {
                attributes.remove("course_id");
            }
            for dependent in COURSE_DEPENDENT {
                attributes.remove(dependent);
            }
        }
        attributes.insert(name.to_string(), value);
    }
}

fn validate_conditions(conditions: &[String], errors: &mut ValidationErrors) {
    if conditions.len() > MAX_FURTHER_CONDITIONS {
        errors.add(
            "further_conditions",
            format!("You cannot add more than {MAX_FURTHER_CONDITIONS} further conditions"),
        );
    }
    for (index, condition) in conditions.iter().enumerate() {
        let field = format!("further_conditions_{index}");
        if !condition.is_present() {
            errors.add(field, format!("Enter condition {}", index + 1));
        } else if condition.trim().chars().count() > MAX_CONDITION_LENGTH {
            errors.add(
                field,
                format!(
                    "Condition {} must be {MAX_CONDITION_LENGTH} characters or fewer",
                    index + 1
                ),
            );
        }
    }
}
