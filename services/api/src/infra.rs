use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use apply_portal::error::AppError;
use apply_portal::workflows::applications::{
    ApplicationChoice, ApplicationChoiceId, ApplicationChoiceRepository, ApplicationFormSnapshot,
    ApplicationStatus, Course, CourseCatalog, CourseOption, NewApplicationChoice, Provider,
    RepositoryError,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
}

#[derive(Default)]
pub(crate) struct InMemoryApplicationRepository {
    choices: Mutex<BTreeMap<ApplicationChoiceId, ApplicationChoice>>,
    forms: Mutex<HashMap<u64, ApplicationFormSnapshot>>,
}

impl InMemoryApplicationRepository {
    pub(crate) fn seed(
        choices: Vec<ApplicationChoice>,
        forms: Vec<ApplicationFormSnapshot>,
    ) -> Self {
        Self {
            choices: Mutex::new(choices.into_iter().map(|choice| (choice.id, choice)).collect()),
            forms: Mutex::new(forms.into_iter().map(|form| (form.id, form)).collect()),
        }
    }
}

impl ApplicationChoiceRepository for InMemoryApplicationRepository {
    fn insert(&self, choice: NewApplicationChoice) -> Result<ApplicationChoice, RepositoryError> {
        let mut guard = lock(&self.choices)?;
        let duplicate = guard.values().any(|existing| {
            existing.application_form_id == choice.application_form_id
                && existing.course_option_id == choice.course_option_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let id = ApplicationChoiceId(guard.keys().next_back().map_or(1, |last| last.0 + 1));
        let record = ApplicationChoice {
            id,
            application_form_id: choice.application_form_id,
            provider_id: choice.provider_id,
            course_id: choice.course_id,
            course_option_id: choice.course_option_id,
            status: ApplicationStatus::Unsubmitted,
            current_recruitment_cycle_year: choice.recruitment_cycle_year,
            updated_at: Utc::now(),
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
        let mut guard = lock(&self.choices)?;
        match guard.get_mut(&choice.id) {
            Some(existing) => {
                *existing = choice;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: ApplicationChoiceId) -> Result<Option<ApplicationChoice>, RepositoryError> {
        Ok(lock(&self.choices)?.get(&id).cloned())
    }

    fn for_provider(&self, provider_id: u64) -> Result<Vec<ApplicationChoice>, RepositoryError> {
        Ok(lock(&self.choices)?
            .values()
            .filter(|choice| choice.provider_id == provider_id)
            .cloned()
            .collect())
    }

    fn application_form(
        &self,
        application_form_id: u64,
    ) -> Result<Option<ApplicationFormSnapshot>, RepositoryError> {
        Ok(lock(&self.forms)?.get(&application_form_id).cloned())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryCatalog {
    providers: Vec<Provider>,
    courses: Vec<Course>,
    options: Vec<CourseOption>,
}

impl CourseCatalog for InMemoryCatalog {
    fn provider(&self, provider_id: u64) -> Result<Option<Provider>, RepositoryError> {
        Ok(self
            .providers
            .iter()
            .find(|provider| provider.id == provider_id)
            .cloned())
    }

    fn course(&self, course_id: u64) -> Result<Option<Course>, RepositoryError> {
        Ok(self.courses.iter().find(|course| course.id == course_id).cloned())
    }

    fn course_options(&self, course_id: u64) -> Result<Vec<CourseOption>, RepositoryError> {
        Ok(self
            .options
            .iter()
            .filter(|option| option.course_id == course_id)
            .cloned()
            .collect())
    }
}

/// Seed data for the in-memory stores, read from a JSON file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Fixture {
    pub(crate) providers: Vec<Provider>,
    pub(crate) courses: Vec<Course>,
    pub(crate) course_options: Vec<CourseOption>,
    pub(crate) application_forms: Vec<ApplicationFormSnapshot>,
    pub(crate) application_choices: Vec<ApplicationChoice>,
}

impl Fixture {
    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub(crate) fn into_stores(self) -> (InMemoryApplicationRepository, InMemoryCatalog) {
        let repository =
            InMemoryApplicationRepository::seed(self.application_choices, self.application_forms);
        let catalog = InMemoryCatalog {
            providers: self.providers,
            courses: self.courses,
            options: self.course_options,
        };
        (repository, catalog)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
