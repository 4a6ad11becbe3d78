//! Catalog and store fixtures shared by the wizard test modules.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::applications::{
    Course, CourseCatalog, CourseLevel, CourseOption, Provider, RepositoryError, StudyMode,
    VacancyStatus,
};
use crate::workflows::wizard::StateMap;

pub(crate) const MATHS: u64 = 5;
pub(crate) const PHYSICS: u64 = 6;
pub(crate) const ENGLISH: u64 = 7;
pub(crate) const HISTORY: u64 = 8;
pub(crate) const OAK_CHEMISTRY: u64 = 9;
pub(crate) const GEOGRAPHY: u64 = 10;

/// Two providers and a spread of course shapes:
/// maths has one option, physics both modes with two full time sites,
/// english two sites in one mode, history no vacancies, geography one
/// option in a subject without enhancement courses.
pub(crate) struct FixtureCatalog {
    providers: Vec<Provider>,
    courses: Vec<Course>,
    options: Vec<CourseOption>,
}

fn course(id: u64, provider_id: u64, name: &str, subject: &str) -> Course {
    Course {
        id,
        provider_id,
        code: format!("C{id:03}"),
        name: name.to_string(),
        level: CourseLevel::Secondary,
        subject_codes: vec![subject.to_string()],
        recruitment_cycle_year: 2024,
        applications_open_from: NaiveDate::from_ymd_opt(2023, 10, 10).expect("valid date"),
        exposed_in_find: true,
    }
}

fn option(id: u64, course_id: u64, site_id: u64, study_mode: StudyMode) -> CourseOption {
    CourseOption {
        id,
        course_id,
        site_id,
        site_name: format!("Site {site_id}"),
        study_mode,
        vacancy_status: VacancyStatus::Vacancies,
        site_still_valid: true,
    }
}

impl FixtureCatalog {
    pub(crate) fn standard() -> Self {
        let mut full = option(80, HISTORY, 100, StudyMode::FullTime);
        full.vacancy_status = VacancyStatus::NoVacancies;

        Self {
            providers: vec![
                Provider {
                    id: 1,
                    code: "1TZ".to_string(),
                    name: "Gorse SCITT".to_string(),
                },
                Provider {
                    id: 2,
                    code: "2AB".to_string(),
                    name: "Oak Academy".to_string(),
                },
            ],
            courses: vec![
                course(MATHS, 1, "Mathematics", "G1"),
                course(PHYSICS, 1, "Physics", "F3"),
                course(ENGLISH, 1, "English", "Q3"),
                course(HISTORY, 1, "History", "V1"),
                course(OAK_CHEMISTRY, 2, "Chemistry", "F1"),
                course(GEOGRAPHY, 1, "Geography", "F8"),
            ],
            options: vec![
                option(50, MATHS, 100, StudyMode::FullTime),
                option(60, PHYSICS, 100, StudyMode::FullTime),
                option(61, PHYSICS, 101, StudyMode::FullTime),
                option(62, PHYSICS, 100, StudyMode::PartTime),
                option(70, ENGLISH, 100, StudyMode::FullTime),
                option(71, ENGLISH, 101, StudyMode::FullTime),
                full,
                option(90, OAK_CHEMISTRY, 200, StudyMode::FullTime),
                option(110, GEOGRAPHY, 100, StudyMode::FullTime),
            ],
        }
    }

    pub(crate) fn shared() -> Arc<dyn CourseCatalog> {
        Arc::new(Self::standard())
    }
}

impl CourseCatalog for FixtureCatalog {
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

/// Catalog whose backing service is down.
pub(crate) struct OfflineCatalog;

impl CourseCatalog for OfflineCatalog {
    fn provider(&self, _provider_id: u64) -> Result<Option<Provider>, RepositoryError> {
        Err(RepositoryError::Unavailable("catalog offline".to_string()))
    }

    fn course(&self, _course_id: u64) -> Result<Option<Course>, RepositoryError> {
        Err(RepositoryError::Unavailable("catalog offline".to_string()))
    }

    fn course_options(&self, _course_id: u64) -> Result<Vec<CourseOption>, RepositoryError> {
        Err(RepositoryError::Unavailable("catalog offline".to_string()))
    }
}

pub(crate) fn params(value: Value) -> StateMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object params, got {other}"),
    }
}
