//! Core chat orchestrator over room keys, message storage and the directory.

use std::sync::Arc;
use tokio::sync::RwLock;

use super::chat_contacts;
use super::chat_message_store::MessageStore;
use super::chat_room_key::RoomKey;
use super::chat_types::*;
use super::directory::IdentityDirectory;
use crate::config::ChatSettings;
use crate::error::{ChatError, Result};

/// Private conversation service.
pub struct ChatService {
    message_store: RwLock<MessageStore>,
    directory: Arc<dyn IdentityDirectory>,
    /// Max message size in bytes (from ChatSettings)
    max_message_size: usize,
}

impl ChatService {
    pub fn new(
        message_store: MessageStore,
        directory: Arc<dyn IdentityDirectory>,
        chat_settings: &ChatSettings,
    ) -> Self {
        Self {
            message_store: RwLock::new(message_store),
            directory,
            max_message_size: chat_settings.max_message_size,
        }
    }

    // ── Sending ────────────────────────────────────────────────

    /// Store a message under the caller-supplied room key.
    pub async fn send(&self, room_key: &str, request: SendMessageRequest) -> Result<Message> {
        let room_key = RoomKey::parse(room_key)?;

        let sender = Sender {
            id: required("senderId", request.sender_id)?,
            name: required("senderName", request.sender_name)?,
            registration_number: required(
                "senderRegistrationNumber",
                request.sender_registration_number,
            )?,
        };
        let receiver_registration_number = required(
            "receiverRegistrationNumber",
            request.receiver_registration_number,
        )?;
        let body = required("message", request.message)?;
        if body.len() > self.max_message_size {
            return Err(ChatError::validation(
                "message",
                format!(
                    "is {} bytes, limit is {}",
                    body.len(),
                    self.max_message_size
                ),
            ));
        }

        let receiver = self
            .directory
            .resolve_by_registration_number(&receiver_registration_number)
            .await?;

        if receiver.id == sender.id {
            return Err(ChatError::validation(
                "receiverRegistrationNumber",
                "cannot send a message to yourself",
            ));
        }
        if !room_key.joins(&sender.id, &receiver.id) {
            return Err(ChatError::validation(
                "roomKey",
                format!(
                    "'{}' does not join sender {} and receiver {}",
                    room_key, sender.id, receiver.id
                ),
            ));
        }

        let draft = MessageDraft {
            room_key,
            sender,
            receiver,
            body,
        };
        let message = self.message_store.write().await.append(draft)?;
        log::info!(
            "Stored message {} in room {} ({} -> {})",
            message.id,
            message.room_key,
            message.sender_registration_number,
            message.receiver_registration_number
        );
        Ok(message)
    }

    // ── Reading ────────────────────────────────────────────────

    /// Full transcript for a room, merging both addressing directions,
    /// oldest first.
    pub async fn get_conversation(&self, room_key: &str) -> Result<Vec<Message>> {
        let room_key = RoomKey::parse(room_key)?;
        let mirror_key = room_key.mirror();

        let mut conversation = {
            let store = self.message_store.read().await;
            let mut merged = store.find_by_room_key(&room_key);
            merged.extend(store.find_by_room_key(&mirror_key));
            merged
        };
        sort_chronologically(&mut conversation);

        log::debug!(
            "Assembled {} messages for room {} (+ {})",
            conversation.len(),
            room_key,
            mirror_key
        );
        Ok(conversation)
    }

    /// Distinct partners this user has written to.
    pub async fn previous_partners(&self, display_name: &str) -> Result<Vec<ContactSummary>> {
        let display_name = required("senderName", display_name.to_string())?;
        let sent = self
            .message_store
            .read()
            .await
            .find_by_sender_name(&display_name);
        Ok(chat_contacts::previous_partners(&sent))
    }

    /// Distinct partners who wrote to this user and are still awaiting a reply.
    pub async fn unanswered_inbound_partners(
        &self,
        display_name: &str,
    ) -> Result<Vec<ContactSummary>> {
        let display_name = required("receiverName", display_name.to_string())?;
        let (sent, received) = {
            let store = self.message_store.read().await;
            (
                store.find_by_sender_name(&display_name),
                store.find_by_receiver_name(&display_name),
            )
        };
        Ok(chat_contacts::unanswered_inbound_partners(&sent, &received))
    }

    // ── Student lookup ─────────────────────────────────────────

    /// The student a client is about to open a room with.
    pub async fn student_by_registration_number(
        &self,
        registration_number: &str,
    ) -> Result<DirectoryEntry> {
        let registration_number =
            required("registrationNumber", registration_number.to_string())?;
        self.directory
            .resolve_by_registration_number(&registration_number)
            .await
    }

    /// Students sharing a display name; at least one or `NotFound`.
    pub async fn students_by_name(&self, name: &str) -> Result<Vec<DirectoryEntry>> {
        let name = required("name", name.to_string())?;
        let found = self.directory.find_by_name(&name).await?;
        if found.is_empty() {
            return Err(ChatError::NotFound(format!("no student named {}", name)));
        }
        Ok(found)
    }

    pub async fn message_count(&self) -> usize {
        self.message_store.read().await.len()
    }
}

/// Order by creation time, falling back to store insertion order.
pub fn sort_chronologically(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then(a.sequence.cmp(&b.sequence))
    });
}

fn required(field: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        Err(ChatError::validation(field, "is required"))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::directory::MockIdentityDirectory;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(id: &str, name: &str, reg: &str) -> DirectoryEntry {
        DirectoryEntry {
            id: id.to_string(),
            name: name.to_string(),
            registration_number: reg.to_string(),
        }
    }

    fn roster() -> Vec<DirectoryEntry> {
        vec![
            entry("1", "A", "REG001"),
            entry("2", "B", "REG002"),
            entry("3", "C", "REG003"),
        ]
    }

    fn mock_directory() -> MockIdentityDirectory {
        let mut directory = MockIdentityDirectory::new();
        directory
            .expect_resolve_by_registration_number()
            .returning(|reg| {
                roster()
                    .into_iter()
                    .find(|e| e.registration_number == reg)
                    .ok_or_else(|| ChatError::NotFound(reg.to_string()))
            });
        directory.expect_find_by_name().returning(|name| {
            Ok(roster().into_iter().filter(|e| e.name == name).collect())
        });
        directory
    }

    fn service_with(store: MessageStore) -> ChatService {
        ChatService::new(
            store,
            Arc::new(mock_directory()),
            &ChatSettings {
                max_message_size: 32,
            },
        )
    }

    fn service() -> ChatService {
        service_with(MessageStore::in_memory())
    }

    fn request(from: &str, to_reg: &str, text: &str) -> SendMessageRequest {
        let me = roster().into_iter().find(|e| e.id == from).unwrap();
        SendMessageRequest {
            sender_id: me.id,
            sender_name: me.name,
            sender_registration_number: me.registration_number,
            receiver_registration_number: to_reg.to_string(),
            message: text.to_string(),
        }
    }

    fn draft(key: &str, from: &str, to: &str, body: &str) -> MessageDraft {
        let people = roster();
        let sender = people.iter().find(|e| e.id == from).unwrap();
        MessageDraft {
            room_key: RoomKey::parse(key).unwrap(),
            sender: Sender {
                id: sender.id.clone(),
                name: sender.name.clone(),
                registration_number: sender.registration_number.clone(),
            },
            receiver: people.iter().find(|e| e.id == to).unwrap().clone(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_resolves_receiver() {
        let chat = service();
        let msg = chat.send("1.2", request("1", "REG002", "hi")).await.unwrap();
        assert_eq!(msg.receiver_id, "2");
        assert_eq!(msg.receiver_name, "B");
        assert_eq!(msg.sender_name, "A");
        assert_eq!(msg.body, "hi");
        assert_eq!(chat.message_count().await, 1);
    }

    #[tokio::test]
    async fn test_send_unknown_receiver_is_not_found() {
        let chat = service();
        let err = chat
            .send("1.9", request("1", "REG009", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
        assert_eq!(chat.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_send_validation_failures() {
        let chat = service();

        let err = chat
            .send("1.2.3", request("1", "REG002", "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("roomKey"));

        let mut missing = request("1", "REG002", "hi");
        missing.sender_registration_number.clear();
        let err = chat.send("1.2", missing).await.unwrap_err();
        assert_eq!(err.field(), Some("senderRegistrationNumber"));

        let err = chat
            .send("1.2", request("1", "REG002", ""))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("message"));

        let long = "x".repeat(33);
        let err = chat
            .send("1.2", request("1", "REG002", &long))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("message"));

        let err = chat
            .send("1.2", request("1", "REG001", "me"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("receiverRegistrationNumber"));

        // Key must name both parties
        let err = chat
            .send("1.3", request("1", "REG002", "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("roomKey"));
        assert_eq!(chat.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_conversation_visible_from_both_keys() {
        let chat = service();
        chat.send("1.2", request("1", "REG002", "hi")).await.unwrap();

        for key in ["1.2", "2.1"] {
            let conv = chat.get_conversation(key).await.unwrap();
            assert_eq!(conv.len(), 1);
            assert_eq!(conv[0].body, "hi");
        }
    }

    #[tokio::test]
    async fn test_conversation_merges_directions_in_send_order() {
        let chat = service();
        chat.send("1.2", request("1", "REG002", "first")).await.unwrap();
        chat.send("2.1", request("2", "REG001", "second")).await.unwrap();
        chat.send("1.2", request("1", "REG002", "third")).await.unwrap();

        let bodies: Vec<String> = chat
            .get_conversation("1.2")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_conversation_orders_by_created_at_not_storage_key() {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let mut store = MessageStore::in_memory();
        // Appended out of chronological order across both keys
        store
            .append_at(draft("2.1", "2", "1", "t3"), base + Duration::minutes(3))
            .unwrap();
        store
            .append_at(draft("1.2", "1", "2", "t1"), base + Duration::minutes(1))
            .unwrap();
        store
            .append_at(draft("2.1", "2", "1", "t0"), base)
            .unwrap();
        store
            .append_at(draft("1.2", "1", "2", "t2"), base + Duration::minutes(2))
            .unwrap();
        let chat = service_with(store);

        let conv = chat.get_conversation("2.1").await.unwrap();
        let bodies: Vec<&str> = conv.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["t0", "t1", "t2", "t3"]);
        assert!(conv.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_equal_timestamps_fall_back_to_insertion_order() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let mut store = MessageStore::in_memory();
        store.append_at(draft("2.1", "2", "1", "one"), at).unwrap();
        store.append_at(draft("1.2", "1", "2", "two"), at).unwrap();
        store.append_at(draft("2.1", "2", "1", "three"), at).unwrap();
        let chat = service_with(store);

        let bodies: Vec<String> = chat
            .get_conversation("1.2")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_empty_and_malformed_conversations() {
        let chat = service();
        assert!(chat.get_conversation("1.3").await.unwrap().is_empty());
        assert!(matches!(
            chat.get_conversation("13").await,
            Err(ChatError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_previous_partners_one_entry_per_partner() {
        let chat = service();
        chat.send("1.2", request("1", "REG002", "b1")).await.unwrap();
        chat.send("1.2", request("1", "REG002", "b2")).await.unwrap();
        chat.send("1.3", request("1", "REG003", "c1")).await.unwrap();

        let partners = chat.previous_partners("A").await.unwrap();
        assert_eq!(partners.len(), 2);
        let names: Vec<&str> = partners.iter().map(|p| p.receiver_name.as_str()).collect();
        assert!(names.contains(&"B"));
        assert!(names.contains(&"C"));
    }

    #[tokio::test]
    async fn test_unanswered_inbound_tracks_replies() {
        let chat = service();
        chat.send("2.1", request("2", "REG001", "hello A")).await.unwrap();

        let pending = chat.unanswered_inbound_partners("A").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].sender_name, "B");

        chat.send("1.2", request("1", "REG002", "hello B")).await.unwrap();
        assert!(chat
            .unanswered_inbound_partners("A")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_student_lookup() {
        let chat = service();
        let found = chat.student_by_registration_number("REG003").await.unwrap();
        assert_eq!(found.name, "C");
        assert!(matches!(
            chat.student_by_registration_number("REG404").await,
            Err(ChatError::NotFound(_))
        ));

        let named = chat.students_by_name("B").await.unwrap();
        assert_eq!(named, vec![entry("2", "B", "REG002")]);
        assert!(matches!(
            chat.students_by_name("Z").await,
            Err(ChatError::NotFound(_))
        ));

        let err = chat.students_by_name("  ").await.unwrap_err();
        assert_eq!(err.field(), Some("name"));
        let err = chat.student_by_registration_number("").await.unwrap_err();
        assert_eq!(err.field(), Some("registrationNumber"));
    }

    #[tokio::test]
    async fn test_blank_display_name_rejected() {
        let chat = service();
        assert!(chat.previous_partners(" ").await.is_err());
        assert!(chat.unanswered_inbound_partners("").await.is_err());
    }
}
