//! Binary entry point for the relay bot.

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = deploy_relay_bot::run().await {
        tracing::error!("Fatal: {err}");
        std::process::exit(1);
    }
}
