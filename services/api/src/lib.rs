mod cli;
mod demo;
mod routes;
mod seed;
mod server;
mod state;

use polling::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
