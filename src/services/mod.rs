// Service layer - room keys, storage, contact derivation, and the HTTP surface

pub mod chat_contacts;
pub mod chat_message_store;
pub mod chat_room_key;
pub mod chat_server;
pub mod chat_service;
pub mod chat_types;
pub mod directory;

pub use chat_message_store::MessageStore;
pub use chat_room_key::RoomKey;
pub use chat_server::ChatServer;
pub use chat_service::ChatService;
pub use directory::{IdentityDirectory, StudentDirectory};
