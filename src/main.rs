use youtube_clipper::config::AppConfig;
use youtube_clipper::logging::{init_logging, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_logging(LogFormat::from_env())?;

    let config = AppConfig::from_env_or_default();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        static_dir = ?config.static_dir,
        "Starting youtube-clipper"
    );

    let state = youtube_clipper::build_state(&config).await;
    youtube_clipper::api::serve(&config, state).await?;

    Ok(())
}
