use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::error::Result;
use crate::services::{ChatServer, ChatService, MessageStore, StudentDirectory};

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub directory: Arc<StudentDirectory>,
    pub chat: Arc<ChatService>,
    pub chat_server: Arc<RwLock<ChatServer>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let data_dir = config.storage.data_dir.clone();
        log::info!(
            "Initializing chat state: data_dir={}, listen={}:{}",
            data_dir.display(),
            config.server.host,
            config.server.port
        );

        // Students and messages share the data directory
        let directory = Arc::new(StudentDirectory::new(&data_dir)?);
        let message_store = MessageStore::new(&data_dir)?;

        let chat = Arc::new(ChatService::new(
            message_store,
            directory.clone(),
            &config.chat,
        ));

        let chat_server = Arc::new(RwLock::new(ChatServer::new(
            &config.server.host,
            config.server.port,
        )?));

        Ok(Self {
            config,
            directory,
            chat,
            chat_server,
        })
    }
}
