use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::applications::domain::{
    ApplicationChoice, ApplicationChoiceId, ApplicationChoiceSnapshot, ApplicationFormSnapshot,
    ApplicationStatus, Course, CourseLevel, CourseOption, FormSection, NewApplicationChoice,
    Provider, StudyMode, VacancyStatus,
};
use crate::workflows::applications::repository::{
    ApplicationChoiceRepository, CourseCatalog, RepositoryError,
};
use crate::workflows::applications::service::{ApplicationChoiceService, ApplicationPolicy};
use crate::workflows::applications::submission::{CycleTimetable, SubmissionContext};

pub(super) const CURRENT_YEAR: i32 = 2024;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn timetable() -> CycleTimetable {
    CycleTimetable {
        apply_opens: date(2023, 10, 10),
        apply_deadline: date(2024, 9, 17),
    }
}

pub(super) fn open_context() -> SubmissionContext {
    SubmissionContext {
        today: date(2024, 1, 15),
        timetable: timetable(),
    }
}

pub(super) fn policy() -> ApplicationPolicy {
    ApplicationPolicy {
        timetable: timetable(),
        current_cycle_year: CURRENT_YEAR,
        reject_by_default_warning_days: 5,
        submission_rules: Default::default(),
        task_view_ladder: Default::default(),
    }
}

pub(super) fn provider() -> Provider {
    Provider {
        id: 1,
        code: "1TZ".to_string(),
        name: "Gorse SCITT".to_string(),
    }
}

pub(super) fn course() -> Course {
    Course {
        id: 5,
        provider_id: 1,
        code: "2XT2".to_string(),
        name: "Mathematics".to_string(),
        level: CourseLevel::Secondary,
        subject_codes: vec!["G1".to_string()],
        recruitment_cycle_year: CURRENT_YEAR,
        applications_open_from: date(2023, 10, 10),
        exposed_in_find: true,
    }
}

pub(super) fn option(id: u64, site_id: u64, study_mode: StudyMode) -> CourseOption {
    CourseOption {
        id,
        course_id: 5,
        site_id,
        site_name: format!("Site {site_id}"),
        study_mode,
        vacancy_status: VacancyStatus::Vacancies,
        site_still_valid: true,
    }
}

pub(super) fn complete_form() -> ApplicationFormSnapshot {
    let mut completed_sections: BTreeSet<FormSection> =
        FormSection::ALWAYS_REQUIRED.into_iter().collect();
    completed_sections.insert(FormSection::ScienceGcse);
    ApplicationFormSnapshot {
        id: 77,
        completed_sections,
    }
}

pub(super) fn snapshot() -> ApplicationChoiceSnapshot {
    let course_option = option(10, 100, StudyMode::FullTime);
    ApplicationChoiceSnapshot {
        id: ApplicationChoiceId(3),
        status: ApplicationStatus::Unsubmitted,
        course: course(),
        course_options: vec![course_option.clone()],
        course_option,
        application_form: complete_form(),
    }
}

pub(super) fn choice(id: u64, status: ApplicationStatus) -> ApplicationChoice {
    ApplicationChoice {
        id: ApplicationChoiceId(id),
        application_form_id: 77,
        provider_id: 1,
        course_id: 5,
        course_option_id: 10,
        status,
        current_recruitment_cycle_year: CURRENT_YEAR,
        updated_at: at(2024, 3, 1),
        sent_to_provider_at: None,
        reject_by_default_at: None,
        rejected_by_default: false,
        rejected_at: None,
        rejection_feedback_given: false,
    }
}

pub(super) fn selection() -> NewApplicationChoice {
    NewApplicationChoice {
        application_form_id: 77,
        provider_id: 1,
        course_id: 5,
        course_option_id: 10,
        recruitment_cycle_year: CURRENT_YEAR,
    }
}

#[derive(Default)]
pub(super) struct MemoryCatalog {
    providers: Vec<Provider>,
    courses: Vec<Course>,
    options: Vec<CourseOption>,
}

impl MemoryCatalog {
    pub(super) fn standard() -> Self {
        Self {
            providers: vec![provider()],
            courses: vec![course()],
            options: vec![option(10, 100, StudyMode::FullTime)],
        }
    }

    pub(super) fn with_course(mut self, course: Course) -> Self {
        self.courses.retain(|existing| existing.id != course.id);
        self.courses.push(course);
        self
    }

    pub(super) fn with_options(mut self, options: Vec<CourseOption>) -> Self {
        self.options = options;
        self
    }
}

impl CourseCatalog for MemoryCatalog {
    fn provider(&self, provider_id: u64) -> Result<Option<Provider>, RepositoryError> {
        Ok(self.providers.iter().find(|p| p.id == provider_id).cloned())
    }

    fn course(&self, course_id: u64) -> Result<Option<Course>, RepositoryError> {
        Ok(self.courses.iter().find(|c| c.id == course_id).cloned())
    }

    fn course_options(&self, course_id: u64) -> Result<Vec<CourseOption>, RepositoryError> {
        Ok(self
            .options
            .iter()
            .filter(|o| o.course_id == course_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    choices: Arc<Mutex<HashMap<ApplicationChoiceId, ApplicationChoice>>>,
    forms: Arc<Mutex<HashMap<u64, ApplicationFormSnapshot>>>,
}

impl MemoryRepository {
    pub(super) fn with_form(form: ApplicationFormSnapshot) -> Self {
        let repository = Self::default();
        repository
            .forms
            .lock()
            .expect("lock")
            .insert(form.id, form);
        repository
    }

    pub(super) fn put(&self, choice: ApplicationChoice) {
        self.choices
            .lock()
            .expect("lock")
            .insert(choice.id, choice);
    }

    pub(super) fn stored(&self, id: u64) -> Option<ApplicationChoice> {
        self.choices
            .lock()
            .expect("lock")
            .get(&ApplicationChoiceId(id))
            .cloned()
    }
}

impl ApplicationChoiceRepository for MemoryRepository {
    fn insert(&self, choice: NewApplicationChoice) -> Result<ApplicationChoice, RepositoryError> {
        let mut guard = self.choices.lock().expect("lock");
        let id = ApplicationChoiceId(guard.len() as u64 + 1);
        let record = ApplicationChoice {
            id,
            application_form_id: choice.application_form_id,
            provider_id: choice.provider_id,
            course_id: choice.course_id,
            course_option_id: choice.course_option_id,
            status: ApplicationStatus::Unsubmitted,
            current_recruitment_cycle_year: choice.recruitment_cycle_year,
            updated_at: at(2024, 1, 10),
            sent_to_provider_at: None,
            reject_by_default_at: None,
            rejected_by_default: false,
            rejected_at: None,
            rejection_feedback_given: false,
        };
        guard.insert(id, record.clone());
        Ok(record)
    }

    fn update(&self, choice: ApplicationChoice) -> Result<(), RepositoryError> {
        let mut guard = self.choices.lock().expect("lock");
        if !guard.contains_key(&choice.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(choice.id, choice);
        Ok(())
    }

    fn fetch(&self, id: ApplicationChoiceId) -> Result<Option<ApplicationChoice>, RepositoryError> {
        Ok(self.choices.lock().expect("lock").get(&id).cloned())
    }

    fn for_provider(&self, provider_id: u64) -> Result<Vec<ApplicationChoice>, RepositoryError> {
        Ok(self
            .choices
            .lock()
            .expect("lock")
            .values()
            .filter(|choice| choice.provider_id == provider_id)
            .cloned()
            .collect())
    }

    fn application_form(
        &self,
        application_form_id: u64,
    ) -> Result<Option<ApplicationFormSnapshot>, RepositoryError> {
        Ok(self
            .forms
            .lock()
            .expect("lock")
            .get(&application_form_id)
            .cloned())
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationChoiceRepository for UnavailableRepository {
    fn insert(&self, _choice: NewApplicationChoice) -> Result<ApplicationChoice, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _choice: ApplicationChoice) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: ApplicationChoiceId) -> Result<Option<ApplicationChoice>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_provider(&self, _provider_id: u64) -> Result<Vec<ApplicationChoice>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn application_form(&self, _id: u64) -> Result<Option<ApplicationFormSnapshot>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    ApplicationChoiceService<MemoryRepository, MemoryCatalog>,
    MemoryRepository,
) {
    build_service_with(MemoryCatalog::standard())
}

pub(super) fn build_service_with(
    catalog: MemoryCatalog,
) -> (
    ApplicationChoiceService<MemoryRepository, MemoryCatalog>,
    MemoryRepository,
) {
    let repository = MemoryRepository::with_form(complete_form());
    let service =
        ApplicationChoiceService::new(Arc::new(repository.clone()), Arc::new(catalog), policy());
    (service, repository)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) fn json_request(method: &str, uri: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}
