//! Collection names and the mapping between models and stored documents.
//! Field names follow the app's existing data (`chatRoomId`, `lastActivity`, ...).

use duolink_db::{Document, DocumentSnapshot, StoreResult, to_document};
use duolink_types::{ConversationRoom, Message, MessageStatus};
use serde_json::Value;

pub const ROOMS: &str = "chatRooms";
pub const MESSAGES: &str = "messages";

pub const FIELD_ROOM_ID: &str = "chatRoomId";
pub const FIELD_RECEIVER_ID: &str = "receiverId";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// Message ids are the document key, not part of the body.
pub fn message_document(message: &Message) -> StoreResult<Document> {
    let mut doc = to_document(message)?;
    doc.remove("id");
    Ok(doc)
}

pub fn decode_message(snapshot: &DocumentSnapshot) -> StoreResult<Message> {
    snapshot.decode_with_id("id")
}

pub fn room_document(room: &ConversationRoom) -> StoreResult<Document> {
    to_document(room)
}

pub fn decode_room(snapshot: &DocumentSnapshot) -> StoreResult<ConversationRoom> {
    snapshot.decode_with_id("id")
}

/// Room fields rewritten alongside every sent message.
pub fn room_summary_patch(message: &Message) -> StoreResult<Document> {
    let mut patch = Document::new();
    patch.insert("lastMessage".into(), serde_json::to_value(message.snapshot())?);
    patch.insert(
        "lastActivity".into(),
        Value::from(message.timestamp.timestamp_millis()),
    );
    Ok(patch)
}

pub fn status_patch(status: MessageStatus) -> Document {
    let mut patch = Document::new();
    patch.insert(FIELD_STATUS.into(), Value::from(status.as_str()));
    patch
}
