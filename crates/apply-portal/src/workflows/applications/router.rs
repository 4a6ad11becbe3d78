use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::json;

use super::domain::ApplicationChoiceId;
use super::repository::{ApplicationChoiceRepository, CourseCatalog, RepositoryError, TaskViewRow};
use super::service::{ApplicationChoiceService, ApplicationServiceError};

/// Router builder exposing submission and task-view endpoints.
pub fn application_router<R, C>(service: Arc<ApplicationChoiceService<R, C>>) -> Router
where
    R: ApplicationChoiceRepository + 'static,
    C: CourseCatalog + 'static,
{
    Router::new()
        .route(
            "/api/v1/application-choices/:application_choice_id/submit",
            post(submit_handler::<R, C>),
        )
        .route(
            "/api/v1/application-choices/:application_choice_id/submission-errors",
            get(submission_errors_handler::<R, C>),
        )
        .route(
            "/api/v1/providers/:provider_id/task-view",
            get(task_view_handler::<R, C>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R, C>(
    State(service): State<Arc<ApplicationChoiceService<R, C>>>,
    Path(application_choice_id): Path<u64>,
) -> Response
where
    R: ApplicationChoiceRepository + 'static,
    C: CourseCatalog + 'static,
{
    let id = ApplicationChoiceId(application_choice_id);
    match service.submit(id, Utc::now()) {
        Ok(choice) => {
            let payload = json!({
                "application_choice_id": choice.id,
                "status": choice.status.label(),
                "sent_to_provider_at": choice.sent_to_provider_at,
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(ApplicationServiceError::Ineligible(error)) => {
            let payload = json!({
                "error": error.key.key(),
                "message": error.message,
                "remedy": error.remedy.label(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(id, other),
    }
}

pub(crate) async fn submission_errors_handler<R, C>(
    State(service): State<Arc<ApplicationChoiceService<R, C>>>,
    Path(application_choice_id): Path<u64>,
) -> Response
where
    R: ApplicationChoiceRepository + 'static,
    C: CourseCatalog + 'static,
{
    let id = ApplicationChoiceId(application_choice_id);
    match service.submission_errors(id, Utc::now()) {
        Ok(blocking) => (StatusCode::OK, axum::Json(blocking)).into_response(),
        Err(other) => error_response(id, other),
    }
}

pub(crate) async fn task_view_handler<R, C>(
    State(service): State<Arc<ApplicationChoiceService<R, C>>>,
    Path(provider_id): Path<u64>,
) -> Response
where
    R: ApplicationChoiceRepository + 'static,
    C: CourseCatalog + 'static,
{
    match service.task_view(provider_id, Utc::now()) {
        Ok(prioritised) => {
            let rows: Vec<TaskViewRow> = prioritised.iter().map(TaskViewRow::from).collect();
            (StatusCode::OK, axum::Json(rows)).into_response()
        }
        Err(other) => service_error_response(other),
    }
}

fn error_response(id: ApplicationChoiceId, error: ApplicationServiceError) -> Response {
    match error {
        ApplicationServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({
                "application_choice_id": id,
                "error": "application choice not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        other => service_error_response(other),
    }
}

fn service_error_response(error: ApplicationServiceError) -> Response {
    let status = match &error {
        ApplicationServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
