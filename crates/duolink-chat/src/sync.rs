//! Message flow inside a room: sending, the live window, read receipts and
//! paging back through older messages.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use duolink_db::{Batch, Direction, DocumentSnapshot, DocumentStore, Filter, Query, Subscription};
use duolink_types::{LanguageCode, Message, MessageStatus};
use tracing::debug;

use crate::clock::Clock;
use crate::documents::{
    self, FIELD_RECEIVER_ID, FIELD_ROOM_ID, FIELD_STATUS, FIELD_TIMESTAMP, MESSAGES, ROOMS,
};
use crate::error::{ChatError, ChatResult};
use crate::on_store;

/// Number of most recent messages a live subscription tracks.
pub const LIVE_WINDOW: u32 = 50;

/// Largest page `history` returns.
pub const MAX_HISTORY_PAGE: u32 = 200;

/// A message as composed by the sender, before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub room_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub original_language: LanguageCode,
    pub translated_language: LanguageCode,
    pub is_voice_message: bool,
}

impl OutgoingMessage {
    pub fn new(
        room_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            content: content.into(),
            original_language: LanguageCode::En,
            translated_language: LanguageCode::En,
            is_voice_message: false,
        }
    }

    pub fn languages(mut self, original: LanguageCode, translated: LanguageCode) -> Self {
        self.original_language = original;
        self.translated_language = translated;
        self
    }

    pub fn voice(mut self, is_voice_message: bool) -> Self {
        self.is_voice_message = is_voice_message;
        self
    }
}

pub struct SyncEngine {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Store the message and refresh the room summary in one batch. If the
    /// room does not exist the batch fails and no message is written.
    pub async fn send(&self, outgoing: OutgoingMessage) -> ChatResult<Message> {
        let message = Message {
            id: self.store.new_id(MESSAGES),
            room_id: outgoing.room_id,
            sender_id: outgoing.sender_id,
            receiver_id: outgoing.receiver_id,
            original_content: outgoing.content.clone(),
            content: outgoing.content,
            original_language: outgoing.original_language,
            translated_language: outgoing.translated_language,
            timestamp: self.clock.now(),
            status: MessageStatus::Sent,
            is_voice_message: outgoing.is_voice_message,
        };

        let mut batch = Batch::new();
        batch
            .set(MESSAGES, &message.id, documents::message_document(&message)?)
            .update(ROOMS, &message.room_id, documents::room_summary_patch(&message)?);
        on_store(&self.store, move |store| store.commit(batch)).await?;

        debug!(room_id = %message.room_id, message_id = %message.id, "message sent");
        Ok(message)
    }

    /// Watch the newest `LIVE_WINDOW` messages of a room, newest first.
    /// `on_update` gets the whole window each time it changes, starting with
    /// the current contents. Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, room_id: &str, on_update: F) -> Subscription
    where
        F: Fn(ChatResult<Vec<Message>>) + Send + Sync + 'static,
    {
        let query = Query::collection(MESSAGES)
            .filter(Filter::eq(FIELD_ROOM_ID, room_id))
            .order_by(FIELD_TIMESTAMP, Direction::Descending)
            .limit(LIVE_WINDOW);

        duolink_db::subscribe(self.store.clone(), query, move |result| {
            on_update(result.map_err(ChatError::from).and_then(|docs| decode_all(&docs)));
        })
    }

    /// Mark every message addressed to `reader_id` in the room as read.
    /// Returns how many changed; zero means nothing was written.
    pub async fn mark_read(&self, room_id: &str, reader_id: &str) -> ChatResult<usize> {
        let query = Query::collection(MESSAGES)
            .filter(Filter::eq(FIELD_ROOM_ID, room_id))
            .filter(Filter::eq(FIELD_RECEIVER_ID, reader_id))
            .filter(Filter::not_eq(FIELD_STATUS, MessageStatus::Read.as_str()));
        let unread = on_store(&self.store, move |store| store.query(&query)).await?;

        if unread.is_empty() {
            return Ok(0);
        }

        let mut batch = Batch::new();
        for message in decode_all(&unread)? {
            let status = message.status.advance(MessageStatus::Read);
            batch.update(MESSAGES, &message.id, documents::status_patch(status));
        }
        on_store(&self.store, move |store| store.commit(batch)).await?;

        debug!(room_id, reader_id, count = unread.len(), "messages marked read");
        Ok(unread.len())
    }

    /// Page back through a room, newest first. With `before`, only messages
    /// strictly older than it are returned. `limit` is clamped to
    /// `1..=MAX_HISTORY_PAGE`.
    pub async fn history(
        &self,
        room_id: &str,
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> ChatResult<Vec<Message>> {
        let mut query = Query::collection(MESSAGES).filter(Filter::eq(FIELD_ROOM_ID, room_id));
        if let Some(before) = before {
            query = query.filter(Filter::lt(FIELD_TIMESTAMP, before.timestamp_millis()));
        }
        let query = query
            .order_by(FIELD_TIMESTAMP, Direction::Descending)
            .limit(limit.clamp(1, MAX_HISTORY_PAGE));

        let docs = on_store(&self.store, move |store| store.query(&query)).await?;
        decode_all(&docs)
    }
}

fn decode_all(docs: &[DocumentSnapshot]) -> ChatResult<Vec<Message>> {
    docs.iter()
        .map(|doc| documents::decode_message(doc).map_err(ChatError::from))
        .collect()
}
