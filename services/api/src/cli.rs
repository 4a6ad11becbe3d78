use std::path::PathBuf;

use apply_portal::error::AppError;
use clap::{Args, Parser, Subcommand};

use crate::report::{run_check_submission, run_task_view, CheckSubmissionArgs, TaskViewArgs};
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "Apply Portal",
    about = "Serve and inspect the teacher training application decision rules",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print a provider's prioritised task view from a fixture file
    TaskView(TaskViewArgs),
    /// Report whether an application choice in a fixture file can be submitted
    CheckSubmission(CheckSubmissionArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the in-memory stores from a JSON fixture
    #[arg(long)]
    pub(crate) fixture: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::TaskView(args) => run_task_view(args),
        Command::CheckSubmission(args) => run_check_submission(args),
    }
}
