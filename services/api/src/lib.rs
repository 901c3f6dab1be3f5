mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use resale_cert::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
