mod calculate;
mod cli;
mod infra;
mod pipeline;
mod routes;
mod server;

use agent_incentives::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
