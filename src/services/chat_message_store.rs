use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::chat_room_key::RoomKey;
use super::chat_types::{Message, MessageDraft};
use crate::error::{ChatError, Result};

/// Append-only message storage, one JSON file per room key.
///
/// Layout:
///   {base}/messages/{initiator}.{counterpart}.json  – array of messages
///
/// Each token is percent-encoded in the file name, so distinct keys never
/// share a file.
pub struct MessageStore {
    rooms: HashMap<RoomKey, Vec<Message>>,
    next_sequence: u64,
    base_dir: Option<PathBuf>,
}

impl MessageStore {
    pub fn new(base_dir: &Path) -> Result<Self> {
        let messages_dir = base_dir.join("messages");
        std::fs::create_dir_all(&messages_dir)
            .map_err(|e| ChatError::Storage(format!("Create messages dir: {}", e)))?;

        let mut rooms: HashMap<RoomKey, Vec<Message>> = HashMap::new();

        if let Ok(entries) = std::fs::read_dir(&messages_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "json") {
                    match std::fs::read_to_string(&path) {
                        Ok(data) => match serde_json::from_str::<Vec<Message>>(&data) {
                            Ok(messages) => {
                                for message in messages {
                                    rooms
                                        .entry(message.room_key.clone())
                                        .or_default()
                                        .push(message);
                                }
                            }
                            Err(e) => {
                                log::warn!("Failed to parse room file {:?}: {}", path, e);
                            }
                        },
                        Err(e) => {
                            log::warn!("Failed to read room file {:?}: {}", path, e);
                        }
                    }
                }
            }
        }

        for messages in rooms.values_mut() {
            messages.sort_by_key(|m| m.sequence);
            // Same room saved under an older file name
            messages.dedup_by(|a, b| a.id == b.id);
        }
        let next_sequence = rooms
            .values()
            .flatten()
            .map(|m| m.sequence + 1)
            .max()
            .unwrap_or(0);

        log::info!(
            "Loaded {} messages in {} rooms from disk",
            rooms.values().map(Vec::len).sum::<usize>(),
            rooms.len()
        );
        Ok(Self {
            rooms,
            next_sequence,
            base_dir: Some(base_dir.to_path_buf()),
        })
    }

    /// A store that keeps messages in memory only.
    pub fn in_memory() -> Self {
        Self {
            rooms: HashMap::new(),
            next_sequence: 0,
            base_dir: None,
        }
    }

    /// Append a new message stamped with the current time.
    pub fn append(&mut self, draft: MessageDraft) -> Result<Message> {
        self.append_at(draft, Utc::now())
    }

    /// Append a new message with an explicit creation time.
    pub fn append_at(&mut self, draft: MessageDraft, created_at: DateTime<Utc>) -> Result<Message> {
        validate_draft(&draft)?;

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            room_key: draft.room_key,
            sender_id: draft.sender.id,
            sender_name: draft.sender.name,
            sender_registration_number: draft.sender.registration_number,
            receiver_id: draft.receiver.id,
            receiver_name: draft.receiver.name,
            receiver_registration_number: draft.receiver.registration_number,
            body: draft.body,
            created_at,
            sequence: self.next_sequence,
        };

        let room = self.rooms.entry(message.room_key.clone()).or_default();
        room.push(message.clone());
        if let Err(e) = self.persist_room(&message.room_key) {
            // Keep memory and disk in step
            if let Some(room) = self.rooms.get_mut(&message.room_key) {
                room.pop();
                if room.is_empty() {
                    self.rooms.remove(&message.room_key);
                }
            }
            return Err(e);
        }
        self.next_sequence += 1;
        Ok(message)
    }

    /// Messages stored under exactly this key (not its mirror).
    pub fn find_by_room_key(&self, key: &RoomKey) -> Vec<Message> {
        self.rooms.get(key).cloned().unwrap_or_default()
    }

    /// Messages whose sender display name matches exactly.
    pub fn find_by_sender_name(&self, name: &str) -> Vec<Message> {
        self.scan(|m| m.sender_name == name)
    }

    /// Messages whose receiver display name matches exactly.
    pub fn find_by_receiver_name(&self, name: &str) -> Vec<Message> {
        self.scan(|m| m.receiver_name == name)
    }

    pub fn len(&self) -> usize {
        self.rooms.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn scan<F>(&self, predicate: F) -> Vec<Message>
    where
        F: Fn(&Message) -> bool,
    {
        let mut found: Vec<Message> = self
            .rooms
            .values()
            .flatten()
            .filter(|m| predicate(m))
            .cloned()
            .collect();
        found.sort_by_key(|m| m.sequence);
        found
    }

    fn persist_room(&self, key: &RoomKey) -> Result<()> {
        let Some(base_dir) = &self.base_dir else {
            return Ok(());
        };
        if let Some(messages) = self.rooms.get(key) {
            let path = base_dir.join("messages").join(room_filename(key));
            let data = serde_json::to_string_pretty(messages)
                .map_err(|e| ChatError::Storage(format!("Serialize room {}: {}", key, e)))?;
            std::fs::write(&path, data)
                .map_err(|e| ChatError::Storage(format!("Write room {}: {}", key, e)))?;
        }
        Ok(())
    }
}

fn validate_draft(draft: &MessageDraft) -> Result<()> {
    let required = [
        ("senderId", &draft.sender.id),
        ("senderName", &draft.sender.name),
        ("senderRegistrationNumber", &draft.sender.registration_number),
        ("receiverId", &draft.receiver.id),
        ("receiverName", &draft.receiver.name),
        ("receiverRegistrationNumber", &draft.receiver.registration_number),
        ("message", &draft.body),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ChatError::validation(field, "is required"));
        }
    }
    if draft.sender.id == draft.receiver.id {
        return Err(ChatError::validation(
            "receiverRegistrationNumber",
            "cannot send a message to yourself",
        ));
    }
    Ok(())
}

fn room_filename(key: &RoomKey) -> String {
    format!(
        "{}.{}.json",
        urlencoding::encode(key.initiator()),
        urlencoding::encode(key.counterpart())
    )
}
