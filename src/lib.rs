pub mod config;
pub mod error;
pub mod services;
pub mod state;

use config::AppConfig;
use error::Result;
use state::AppState;

/// Start the chat server and serve until Ctrl-C.
pub async fn run(config: AppConfig) -> Result<()> {
    std::fs::create_dir_all(&config.storage.data_dir)?;
    let state = AppState::new(config)?;

    if state.directory.is_empty() {
        log::warn!(
            "Student directory is empty; add entries to {} before sending messages",
            state.config.storage.data_dir.join("students.json").display()
        );
    }

    let addr = state
        .chat_server
        .write()
        .await
        .start(state.chat.clone())
        .await?;
    log::info!("Campus chat listening on http://{}", addr);

    tokio::signal::ctrl_c().await?;
    log::info!("Shutdown requested");
    state.chat_server.write().await.stop();
    Ok(())
}
