use std::path::{Path, PathBuf};
use std::sync::Arc;

use apply_portal::config::AppConfig;
use apply_portal::error::AppError;
use apply_portal::workflows::applications::{
    govuk_date, ApplicationChoiceId, ApplicationChoiceService, ApplicationPolicy,
    EligibilityError, TaskViewRow,
};
use chrono::{Local, NaiveDate};
use clap::Args;

use crate::infra::{start_of_day, Fixture, InMemoryApplicationRepository, InMemoryCatalog};

#[derive(Args, Debug)]
pub(crate) struct TaskViewArgs {
    /// JSON fixture with providers, courses, options, forms and choices
    #[arg(long)]
    pub(crate) fixture: PathBuf,
    /// Provider whose task view should be printed
    #[arg(long)]
    pub(crate) provider_id: u64,
    /// Evaluation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print rows as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CheckSubmissionArgs {
    /// JSON fixture with providers, courses, options, forms and choices
    #[arg(long)]
    pub(crate) fixture: PathBuf,
    /// Application choice to check
    #[arg(long)]
    pub(crate) application_choice_id: u64,
    /// Evaluation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

type FixtureService = ApplicationChoiceService<InMemoryApplicationRepository, InMemoryCatalog>;

fn load_service(fixture: &Path) -> Result<FixtureService, AppError> {
    let config = AppConfig::load()?;
    let (repository, catalog) = Fixture::from_path(fixture)?.into_stores();
    Ok(ApplicationChoiceService::new(
        Arc::new(repository),
        Arc::new(catalog),
        ApplicationPolicy::from_cycle(&config.cycle),
    ))
}

pub(crate) fn run_task_view(args: TaskViewArgs) -> Result<(), AppError> {
    let TaskViewArgs {
        fixture,
        provider_id,
        today,
        json,
    } = args;

    let service = load_service(&fixture)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let rows: Vec<TaskViewRow> = service
        .task_view(provider_id, start_of_day(today))?
        .iter()
        .map(TaskViewRow::from)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("Task view for provider {provider_id} on {}", govuk_date(today));
        for line in render_rows(&rows) {
            println!("{line}");
        }
    }
    Ok(())
}

pub(crate) fn run_check_submission(args: CheckSubmissionArgs) -> Result<(), AppError> {
    let CheckSubmissionArgs {
        fixture,
        application_choice_id,
        today,
    } = args;

    let service = load_service(&fixture)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let error = service
        .submission_errors(ApplicationChoiceId(application_choice_id), start_of_day(today))?;
    println!("{}", describe_submission(application_choice_id, error.as_ref()));
    Ok(())
}

fn render_rows(rows: &[TaskViewRow]) -> Vec<String> {
    if rows.is_empty() {
        return vec!["  No applications".to_string()];
    }
    rows.iter()
        .map(|row| {
            let deadline = row
                .reject_by_default_at
                .map(|at| format!(" (rejected by default on {})", govuk_date(at.date_naive())))
                .unwrap_or_default();
            format!(
                "  [{:>3}] #{} {} {}{}",
                row.bucket,
                row.application_choice_id,
                row.group.unwrap_or("ungrouped"),
                row.status,
                deadline
            )
        })
        .collect()
}

fn describe_submission(application_choice_id: u64, error: Option<&EligibilityError>) -> String {
    match error {
        None => format!("Application choice {application_choice_id} can be submitted"),
        Some(error) => format!(
            "Application choice {application_choice_id} cannot be submitted ({}): {}\n  Next step: {}",
            error.key.key(),
            error.message,
            error.remedy.label()
        ),
    }
}
