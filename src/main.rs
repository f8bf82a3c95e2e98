use anyhow::Context;
use campus_chat::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = AppConfig::default_path();
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("load config from {}", config_path.display()))?;

    if !config_path.exists() {
        config
            .save(&config_path)
            .with_context(|| format!("write default config to {}", config_path.display()))?;
        log::info!("Wrote default config to {}", config_path.display());
    }

    campus_chat::run(config).await.context("run chat server")?;
    Ok(())
}
