mod cli;
mod infra;
mod report;
mod routes;
mod server;

use apply_portal::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
