use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chat_room_key::RoomKey;

// ── Stored types ───────────────────────────────────────────────

/// A persisted private message. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub room_key: RoomKey,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_registration_number: String,
    pub receiver_id: String,
    pub receiver_name: String,
    pub receiver_registration_number: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Store insertion counter; breaks `created_at` ties.
    #[serde(default)]
    pub sequence: u64,
}

impl Message {
    pub fn contact_summary(&self) -> ContactSummary {
        ContactSummary {
            sender_name: self.sender_name.clone(),
            receiver_name: self.receiver_name.clone(),
            sender_registration_number: self.sender_registration_number.clone(),
            receiver_registration_number: self.receiver_registration_number.clone(),
            receiver_id: self.receiver_id.clone(),
        }
    }
}

/// Validated input for a new message; the store assigns id, time and sequence.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub room_key: RoomKey,
    pub sender: Sender,
    pub receiver: DirectoryEntry,
    pub body: String,
}

// ── Derived types ──────────────────────────────────────────────

/// Projection of a message used to list conversation partners.
/// Equality is structural over all five fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub sender_name: String,
    pub receiver_name: String,
    pub sender_registration_number: String,
    pub receiver_registration_number: String,
    pub receiver_id: String,
}

// ── Identity ───────────────────────────────────────────────────

/// Identity Directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub registration_number: String,
}

/// Author of a message, as supplied by the caller at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    pub id: String,
    pub name: String,
    pub registration_number: String,
}

// ── Wire types ─────────────────────────────────────────────────

/// Body of `POST /chat/{roomKey}`.
///
/// Fields default to empty so missing ones surface as field-level
/// validation errors rather than a body parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendMessageRequest {
    pub sender_id: String,
    pub sender_name: String,
    pub sender_registration_number: String,
    pub receiver_registration_number: String,
    #[serde(alias = "body")]
    pub message: String,
}

/// Body of `POST /api/student/getStudentByRegNum`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentByRegistrationNumberRequest {
    pub registration_number: String,
}

/// Body of `POST /api/student/getStudentByName`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentByNameRequest {
    pub name: String,
}

/// Response to a successful send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub message_id: String,
    pub message: String,
}

/// Envelope used by every successful chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
    pub result: T,
}
