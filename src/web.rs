use flashflashy::{Config, app};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration from the environment, and runs
/// the server until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::load();
    app::run(config).await
}
