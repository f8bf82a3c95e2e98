//! Two-party room keys.
//!
//! A room key is `"{initiator}.{counterpart}"`, where both tokens are user ids.
//! Each party may address the same conversation with itself listed first, so
//! `a.b` and `b.a` are distinct keys paired by [`RoomKey::mirror`]. They are
//! never collapsed into one canonical form; readers query both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ChatError, Result};

pub const SEPARATOR: char = '.';

const FIELD: &str = "roomKey";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomKey {
    initiator: String,
    counterpart: String,
}

impl RoomKey {
    pub fn new(initiator: &str, counterpart: &str) -> Result<Self> {
        validate_token(initiator)?;
        validate_token(counterpart)?;
        if initiator == counterpart {
            return Err(ChatError::validation(
                FIELD,
                format!("both tokens are '{}'", initiator),
            ));
        }
        Ok(Self {
            initiator: initiator.to_string(),
            counterpart: counterpart.to_string(),
        })
    }

    /// Parse `"a.b"`. Anything other than exactly two tokens is rejected,
    /// including `"a.b.c"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let tokens: Vec<&str> = raw.split(SEPARATOR).collect();
        match tokens.as_slice() {
            [initiator, counterpart] => Self::new(initiator, counterpart),
            [_] => Err(ChatError::validation(
                FIELD,
                format!("'{}' has no '{}' separator", raw, SEPARATOR),
            )),
            _ => Err(ChatError::validation(
                FIELD,
                format!("'{}' has {} tokens, expected 2", raw, tokens.len()),
            )),
        }
    }

    /// The same room addressed from the other party's side.
    pub fn mirror(&self) -> RoomKey {
        RoomKey {
            initiator: self.counterpart.clone(),
            counterpart: self.initiator.clone(),
        }
    }

    pub fn initiator(&self) -> &str {
        &self.initiator
    }

    pub fn counterpart(&self) -> &str {
        &self.counterpart
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.initiator == user_id || self.counterpart == user_id
    }

    /// True when the key names exactly these two users, in either order.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.initiator == a && self.counterpart == b)
            || (self.initiator == b && self.counterpart == a)
    }
}

fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(ChatError::validation(FIELD, "empty user id token"));
    }
    if token.contains(SEPARATOR) {
        return Err(ChatError::validation(
            FIELD,
            format!("user id '{}' contains '{}'", token, SEPARATOR),
        ));
    }
    if token.trim() != token {
        return Err(ChatError::validation(
            FIELD,
            format!("user id '{}' has surrounding whitespace", token),
        ));
    }
    Ok(())
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.initiator, SEPARATOR, self.counterpart)
    }
}

impl FromStr for RoomKey {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomKey {
    type Error = ChatError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RoomKey> for String {
    fn from(key: RoomKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_mirror_swaps_tokens() {
        let key = RoomKey::parse("1.2").unwrap();
        let mirror = key.mirror();
        assert_eq!(mirror.to_string(), "2.1");
        assert_eq!(mirror.initiator(), "2");
        assert_eq!(mirror.counterpart(), "1");
        assert_ne!(key, mirror);
    }

    #[rstest]
    #[case("1.2")]
    #[case("64f1c2.64f1d9")]
    #[case("alice.bob")]
    fn test_mirror_is_an_involution(#[case] raw: &str) {
        let key = RoomKey::parse(raw).unwrap();
        assert_eq!(key.mirror().mirror(), key);
        assert_eq!(key.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("12")]
    #[case(".2")]
    #[case("1.")]
    #[case("1.2.3")]
    #[case("1..2")]
    #[case("7.7")]
    #[case(" 1.2")]
    fn test_malformed_keys_rejected(#[case] raw: &str) {
        let err = RoomKey::parse(raw).unwrap_err();
        assert_eq!(err.field(), Some("roomKey"));
    }

    #[test]
    fn test_extra_tokens_are_not_truncated() {
        let err = RoomKey::parse("1.2.3").unwrap_err();
        assert!(err.to_string().contains("3 tokens"));
    }

    #[test]
    fn test_joins_and_involves() {
        let key = RoomKey::new("a", "b").unwrap();
        assert!(key.joins("a", "b"));
        assert!(key.joins("b", "a"));
        assert!(!key.joins("a", "c"));
        assert!(key.involves("b"));
        assert!(!key.involves("c"));
    }

    #[test]
    fn test_serde_as_plain_string() {
        let key = RoomKey::parse("1.2").unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"1.2\"");
        let back: RoomKey = serde_json::from_str("\"2.1\"").unwrap();
        assert_eq!(back, key.mirror());
        assert!(serde_json::from_str::<RoomKey>("\"1.2.3\"").is_err());
    }
}
