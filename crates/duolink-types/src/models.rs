use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed, time-limited proof of identity exchanged out-of-band to pair two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingToken {
    pub subject_id: String,
    pub issued_at_millis: i64,
    /// Lowercase hex HMAC-SHA256 over `subject_id:issued_at_millis`.
    pub signature: String,
}

/// Two-party conversation. `id` is derived from the sorted participant pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRoom {
    pub id: String,
    pub participants: [String; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageSnapshot>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
}

/// A chat message as stored in the `messages` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(rename = "chatRoomId")]
    pub room_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub original_content: String,
    pub original_language: LanguageCode,
    pub translated_language: LanguageCode,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
    pub is_voice_message: bool,
}

impl Message {
    /// Denormalized copy kept on the room as `lastMessage`.
    pub fn snapshot(&self) -> MessageSnapshot {
        MessageSnapshot {
            sender_id: self.sender_id.clone(),
            receiver_id: self.receiver_id.clone(),
            content: self.content.clone(),
            original_content: self.original_content.clone(),
            original_language: self.original_language,
            translated_language: self.translated_language,
            timestamp: self.timestamp,
            status: self.status,
            is_voice_message: self.is_voice_message,
        }
    }
}

/// Message body without store identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSnapshot {
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub original_content: String,
    pub original_language: LanguageCode,
    pub translated_language: LanguageCode,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
    pub is_voice_message: bool,
}

/// Delivery state. Variants are declared in progression order so `Ord`
/// reflects how far a message has advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    /// Reserved for a transport acknowledgement; nothing sets it yet.
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    /// Status never moves backwards.
    pub fn advance(self, next: MessageStatus) -> MessageStatus {
        self.max(next)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language tags carried on messages. Translation happens elsewhere; these
/// are passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
    Nl,
    Ru,
    Pl,
    Tr,
    Ar,
    Hi,
    Zh,
    Ja,
    Ko,
}

impl LanguageCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::It => "it",
            Self::Pt => "pt",
            Self::Nl => "nl",
            Self::Ru => "ru",
            Self::Pl => "pl",
            Self::Tr => "tr",
            Self::Ar => "ar",
            Self::Hi => "hi",
            Self::Zh => "zh",
            Self::Ja => "ja",
            Self::Ko => "ko",
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_message() -> Message {
        Message {
            id: "m1".into(),
            room_id: "alice_bob".into(),
            sender_id: "alice".into(),
            receiver_id: "bob".into(),
            content: "hola".into(),
            original_content: "hello".into(),
            original_language: LanguageCode::En,
            translated_language: LanguageCode::Es,
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            status: MessageStatus::Sent,
            is_voice_message: true,
        }
    }

    #[test]
    fn message_uses_document_field_names() {
        let value = serde_json::to_value(sample_message()).unwrap();
        assert_eq!(value["chatRoomId"], "alice_bob");
        assert_eq!(value["originalContent"], "hello");
        assert_eq!(value["timestamp"], 1_700_000_000_123i64);
        assert_eq!(value["status"], "sent");
        assert_eq!(value["isVoiceMessage"], true);
        assert_eq!(value["translatedLanguage"], "es");
    }

    #[test]
    fn status_only_moves_forward() {
        assert_eq!(MessageStatus::Sent.advance(MessageStatus::Read), MessageStatus::Read);
        assert_eq!(MessageStatus::Read.advance(MessageStatus::Sent), MessageStatus::Read);
        assert_eq!(
            MessageStatus::Delivered.advance(MessageStatus::Sent),
            MessageStatus::Delivered
        );
        assert!(MessageStatus::Sent < MessageStatus::Delivered);
    }

    #[test]
    fn room_without_last_message_omits_field() {
        let room = ConversationRoom {
            id: "alice_bob".into(),
            participants: ["alice".into(), "bob".into()],
            last_message: None,
            last_activity: Utc.timestamp_millis_opt(5).unwrap(),
        };
        let value = serde_json::to_value(&room).unwrap();
        assert!(value.get("lastMessage").is_none());
        assert_eq!(value["participants"][1], "bob");
    }
}
