//! Candidate wizard for adding a course choice to an application.
//!
//! The study mode and site steps only appear when the chosen course offers
//! more than one of them; a course with a single available option goes
//! straight from course choice to review.

mod steps;


use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::workflows::applications::{
    Course, CourseCatalog, CourseOption, NewApplicationChoice, StudyMode,
};
use crate::workflows::wizard::{StoreKey, WizardDefinition, WizardError};

pub use steps::CourseSelectionStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseKnown {
    Yes,
    No,
}

/// Answers collected across the course selection steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseSelectionAttributes {
    pub answer: Option<CourseKnown>,
    pub provider_id: Option<u64>,
    pub course_id: Option<u64>,
    pub study_mode: Option<StudyMode>,
    pub course_option_id: Option<u64>,
}

/// Collaborators the steps consult while routing.
#[derive(Clone)]
pub struct CourseSelectionContext {
    pub catalog: Arc<dyn CourseCatalog>,
    pub application_form_id: u64,
}

pub struct CourseSelectionWizard;

impl CourseSelectionWizard {
    pub fn store_key(candidate_id: u64, application_form_id: u64) -> StoreKey {
        StoreKey::new(Self::NAME, candidate_id, application_form_id)
    }
}

impl WizardDefinition for CourseSelectionWizard {
    const NAME: &'static str = "course_selection";
    const STEPS: &'static [&'static str] = &[
        "do_you_know_the_course",
        "go_to_find_explanation",
        "provider_selection",
        "which_course_are_you_applying_to",
        "course_study_mode",
        "course_site",
        "course_review",
    ];

    type Attributes = CourseSelectionAttributes;
    type Context = CourseSelectionContext;
    type Step = CourseSelectionStep;
    type Output = NewApplicationChoice;

    fn first_step(_context: &CourseSelectionContext) -> CourseSelectionStep {
        CourseSelectionStep::DoYouKnowTheCourse
    }

    fn materialize(
        attributes: &CourseSelectionAttributes,
        context: &CourseSelectionContext,
    ) -> Result<NewApplicationChoice, WizardError> {
        let shape = CourseShape::require(attributes, context)?;
        let option = shape.resolve_option(attributes).ok_or_else(|| {
            WizardError::Precondition(format!(
                "course {} has no available option for the selection",
                shape.course.id
            ))
        })?;

        Ok(NewApplicationChoice {
            application_form_id: context.application_form_id,
            provider_id: shape.course.provider_id,
            course_id: shape.course.id,
            course_option_id: option.id,
            recruitment_cycle_year: shape.course.recruitment_cycle_year,
        })
    }
}

/// A provider's course together with the options a candidate can still pick.
pub(crate) struct CourseShape {
    pub(crate) course: Course,
    pub(crate) available: Vec<CourseOption>,
}

impl CourseShape {
    /// `None` when the course is unknown or belongs to another provider.
    pub(crate) fn load(
        catalog: &dyn CourseCatalog,
        provider_id: u64,
        course_id: u64,
    ) -> Result<Option<Self>, WizardError> {
        let Some(course) = catalog.course(course_id)? else {
            return Ok(None);
        };
        if course.provider_id != provider_id {
            return Ok(None);
        }
        let available = catalog.available_options(course.id, None)?;
        Ok(Some(Self { course, available }))
    }

    pub(crate) fn require(
        attributes: &CourseSelectionAttributes,
        context: &CourseSelectionContext,
    ) -> Result<Self, WizardError> {
        let (Some(provider_id), Some(course_id)) = (attributes.provider_id, attributes.course_id)
        else {
            return Err(WizardError::Precondition(
                "course selection is missing provider or course".to_string(),
            ));
        };
        Self::load(context.catalog.as_ref(), provider_id, course_id)?.ok_or_else(|| {
            WizardError::Precondition(format!(
                "course {course_id} is not offered by provider {provider_id}"
            ))
        })
    }

    pub(crate) fn study_modes(&self) -> BTreeSet<StudyMode> {
        self.available.iter().map(|option| option.study_mode).collect()
    }

    pub(crate) fn multiple_study_modes(&self) -> bool {
        self.study_modes().len() > 1
    }

    pub(crate) fn options_for(&self, study_mode: Option<StudyMode>) -> Vec<&CourseOption> {
        self.available
            .iter()
            .filter(|option| study_mode.map_or(true, |mode| option.study_mode == mode))
            .collect()
    }

    pub(crate) fn multiple_sites(&self, study_mode: Option<StudyMode>) -> bool {
        let sites: BTreeSet<u64> = self
            .options_for(study_mode)
            .into_iter()
            .map(|option| option.site_id)
            .collect();
        sites.len() > 1
    }

    pub(crate) fn resolve_option(
        &self,
        attributes: &CourseSelectionAttributes,
    ) -> Option<&CourseOption> {
        self.pick(attributes.study_mode, attributes.course_option_id)
    }

    /// Explicit site choice when given, else the first available option for the mode.
    pub(crate) fn pick(
        &self,
        study_mode: Option<StudyMode>,
        course_option_id: Option<u64>,
    ) -> Option<&CourseOption> {
        let candidates = self.options_for(study_mode);
        match course_option_id {
            Some(option_id) => candidates.into_iter().find(|option| option.id == option_id),
            None => candidates.into_iter().next(),
        }
    }
}
