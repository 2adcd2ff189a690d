use inkwell::{init_tracing, run_app, Config};
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = match Config::load() {
        Ok(config) => config,
        Err(error) => {
            error!("Error: {:#}", error);
            std::process::exit(1);
        }
    };
    if let Err(error) = run_app(config).await {
        error!("Error: {:#}", error);
        std::process::exit(1);
    }
}
