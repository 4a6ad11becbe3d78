use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CourseKnown, CourseSelectionAttributes, CourseSelectionContext, CourseShape};
use crate::workflows::wizard::{StateMap, Step, StepTarget, ValidationErrors, WizardError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseSelectionStep {
    DoYouKnowTheCourse,
    GoToFindExplanation,
    ProviderSelection,
    WhichCourseAreYouApplyingTo,
    CourseStudyMode,
    CourseSite,
    CourseReview,
}

use CourseSelectionStep::*;

/// Answers that only make sense for the course they were given for.
const COURSE_DEPENDENT: [&str; 2] = ["study_mode", "course_option_id"];

impl Step for CourseSelectionStep {
    type Attributes = CourseSelectionAttributes;
    type Context = CourseSelectionContext;

    fn name(&self) -> &'static str {
        match self {
            DoYouKnowTheCourse => "do_you_know_the_course",
            GoToFindExplanation => "go_to_find_explanation",
            ProviderSelection => "provider_selection",
            WhichCourseAreYouApplyingTo => "which_course_are_you_applying_to",
            CourseStudyMode => "course_study_mode",
            CourseSite => "course_site",
            CourseReview => "course_review",
        }
    }

    fn permitted_params(&self) -> &'static [&'static str] {
        match self {
            DoYouKnowTheCourse => &["answer"],
            ProviderSelection => &["provider_id"],
            WhichCourseAreYouApplyingTo => &["provider_id", "course_id"],
            CourseStudyMode => &["study_mode"],
            CourseSite => &["course_option_id"],
            GoToFindExplanation | CourseReview => &[],
        }
    }

    fn validate(
        &self,
        attributes: &CourseSelectionAttributes,
        context: &CourseSelectionContext,
    ) -> Result<ValidationErrors, WizardError> {
        let mut errors = ValidationErrors::new();
        match self {
            DoYouKnowTheCourse => {
                if attributes.answer.is_none() {
                    errors.add("answer", "Select if you know which course you want to apply to");
                }
            }
            ProviderSelection => match attributes.provider_id {
                None => errors.add("provider_id", "Select a training provider"),
                Some(provider_id) => {
                    if context.catalog.provider(provider_id)?.is_none() {
                        errors.add("provider_id", "Select a training provider from the list");
                    }
                }
            },
            WhichCourseAreYouApplyingTo => {
                if attributes.provider_id.is_none() {
                    errors.add("provider_id", "Select a training provider");
                }
                let (Some(provider_id), Some(course_id)) =
                    (attributes.provider_id, attributes.course_id)
                else {
                    if attributes.course_id.is_none() {
                        errors.add("course_id", "Select a course");
                    }
                    return Ok(errors);
                };
                match CourseShape::load(context.catalog.as_ref(), provider_id, course_id)? {
                    None => errors.add("course_id", "Select a course from the list"),
                    Some(shape) if shape.available.is_empty() => {
                        errors.add("course_id", "You cannot apply to this course as it is full")
                    }
                    Some(_) => {}
                }
            }
            CourseStudyMode => match attributes.study_mode {
                None => errors.add("study_mode", "Select full time or part time"),
                Some(mode) => {
                    let shape = CourseShape::require(attributes, context)?;
                    if !shape.study_modes().contains(&mode) {
                        errors.add("study_mode", "This study mode is not available for this course");
                    }
                }
            },
            CourseSite => match attributes.course_option_id {
                None => errors.add("course_option_id", "Select a location"),
                Some(_) => {
                    let shape = CourseShape::require(attributes, context)?;
                    if shape.resolve_option(attributes).is_none() {
                        errors.add("course_option_id", "Select a location from the list");
                    }
                }
            },
            GoToFindExplanation | CourseReview => {}
        }
        Ok(errors)
    }

    fn next_step(
        &self,
        attributes: &CourseSelectionAttributes,
        context: &CourseSelectionContext,
    ) -> Result<StepTarget<Self>, WizardError> {
        let target = match self {
            DoYouKnowTheCourse => match attributes.answer {
                Some(CourseKnown::Yes) => ProviderSelection,
                Some(CourseKnown::No) => GoToFindExplanation,
                None => {
                    return Err(WizardError::Precondition(
                        "do_you_know_the_course has no answer".to_string(),
                    ))
                }
            },
            GoToFindExplanation | CourseReview => return Ok(StepTarget::Exit),
            ProviderSelection => WhichCourseAreYouApplyingTo,
            WhichCourseAreYouApplyingTo => {
                let shape = CourseShape::require(attributes, context)?;
                if shape.multiple_study_modes() {
                    CourseStudyMode
                } else if shape.multiple_sites(None) {
                    CourseSite
                } else {
                    CourseReview
                }
            }
            CourseStudyMode => {
                let shape = CourseShape::require(attributes, context)?;
                if shape.multiple_sites(attributes.study_mode) {
                    CourseSite
                } else {
                    CourseReview
                }
            }
            CourseSite => CourseReview,
        };
        Ok(StepTarget::Step(target))
    }

    fn previous_step(
        &self,
        attributes: &CourseSelectionAttributes,
        context: &CourseSelectionContext,
    ) -> Result<StepTarget<Self>, WizardError> {
        let target = match self {
            DoYouKnowTheCourse => return Ok(StepTarget::Exit),
            GoToFindExplanation | ProviderSelection => DoYouKnowTheCourse,
            WhichCourseAreYouApplyingTo => ProviderSelection,
            CourseStudyMode => WhichCourseAreYouApplyingTo,
            CourseSite => {
                let shape = CourseShape::require(attributes, context)?;
                if shape.multiple_study_modes() {
                    CourseStudyMode
                } else {
                    WhichCourseAreYouApplyingTo
                }
            }
            CourseReview => {
                let shape = CourseShape::require(attributes, context)?;
                if shape.multiple_sites(attributes.study_mode) {
                    CourseSite
                } else if shape.multiple_study_modes() {
                    CourseStudyMode
                } else {
                    WhichCourseAreYouApplyingTo
                }
            }
        };
        Ok(StepTarget::Step(target))
    }

    fn completed(
        &self,
        attributes: &CourseSelectionAttributes,
        context: &CourseSelectionContext,
    ) -> Result<bool, WizardError> {
        match self {
            WhichCourseAreYouApplyingTo => {
                let shape = CourseShape::require(attributes, context)?;
                Ok(!shape.multiple_study_modes() && !shape.multiple_sites(None))
            }
            CourseStudyMode => {
                let Some(mode) = attributes.study_mode else {
                    return Ok(false);
                };
                let shape = CourseShape::require(attributes, context)?;
                Ok(!shape.multiple_sites(Some(mode)))
            }
            CourseSite => {
                if attributes.course_option_id.is_none() {
                    return Ok(false);
                }
                let shape = CourseShape::require(attributes, context)?;
                Ok(shape.resolve_option(attributes).is_some())
            }
            CourseReview => Ok(true),
            DoYouKnowTheCourse | GoToFindExplanation | ProviderSelection => Ok(false),
        }
    }

    /// Picking a different provider or course drops the mode and site chosen for
    /// the old one. A stale course id is caught by validation instead.
    fn assign(&self, attributes: &mut StateMap, name: &str, value: Value) {
        let changed = matches!(name, "provider_id" | "course_id")
            && attributes.get(name).is_some_and(|current| *current != value);
        if changed {
            for dependent in COURSE_DEPENDENT {
                attributes.remove(dependent);
            }
        }
        attributes.insert(name.to_string(), value);
    }
}
