//! Contact lists derived from raw message history.

use std::collections::HashSet;

use super::chat_types::{ContactSummary, Message};

/// Project messages to contact summaries, dropping structural duplicates.
/// First-seen order is kept.
pub fn distinct_contacts(messages: &[Message]) -> Vec<ContactSummary> {
    let mut seen = HashSet::new();
    messages
        .iter()
        .map(Message::contact_summary)
        .filter(|summary| seen.insert(summary.clone()))
        .collect()
}

/// Partners a user has written to, given the messages that user sent.
pub fn previous_partners(sent: &[Message]) -> Vec<ContactSummary> {
    distinct_contacts(sent)
}

/// Partners who wrote to a user that the user has not written back to.
///
/// The replied-to names are collected before filtering so every inbound
/// contact is checked against the full set.
pub fn unanswered_inbound_partners(sent: &[Message], received: &[Message]) -> Vec<ContactSummary> {
    let outbound = distinct_contacts(sent);
    let replied: HashSet<&str> = outbound.iter().map(|c| c.receiver_name.as_str()).collect();

    distinct_contacts(received)
        .into_iter()
        .filter(|c| !replied.contains(c.sender_name.as_str()))
        .collect()
}
