mod capacity;
mod config;
mod data;
mod error;
mod layout;
mod loader;
mod overflow;
mod seating;
mod server;
mod solver;
mod state;
mod timeslots;

use config::PlannerConfig;
use log::error;

#[tokio::main]
async fn main() {
    let config = PlannerConfig::from_env();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();

    if let Err(e) = server::run_server(config).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
