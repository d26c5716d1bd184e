use std::sync::Arc;

use duolink_db::DocumentStore;
use duolink_types::ConversationRoom;
use tracing::debug;

use crate::clock::Clock;
use crate::documents::{self, ROOMS};
use crate::error::{ChatError, ChatResult};
use crate::on_store;

const SEPARATOR: char = '_';

/// Canonical room id for a pair of users: the two ids sorted ascending and
/// joined with `_`, so both sides derive the same id.
pub fn room_id_for(a: &str, b: &str) -> ChatResult<String> {
    let (lo, hi) = ordered_pair(a, b)?;
    Ok(format!("{lo}{SEPARATOR}{hi}"))
}

fn ordered_pair<'a>(a: &'a str, b: &'a str) -> ChatResult<(&'a str, &'a str)> {
    if a.is_empty() || b.is_empty() {
        return Err(ChatError::InvalidParticipants("participant id is empty".into()));
    }
    if a == b {
        return Err(ChatError::InvalidParticipants(format!("{a} cannot pair with themselves")));
    }
    Ok(if a <= b { (a, b) } else { (b, a) })
}

/// Finds or creates the one room shared by two users.
pub struct ConversationDirectory {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl ConversationDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Return the room for `a` and `b`, creating it on first use. An existing
    /// room is returned as stored.
    pub async fn resolve_room(&self, a: &str, b: &str) -> ChatResult<ConversationRoom> {
        let (lo, hi) = ordered_pair(a, b)?;
        let room_id = format!("{lo}{SEPARATOR}{hi}");

        if let Some(room) = self.get_room(&room_id).await? {
            return Ok(room);
        }

        let room = ConversationRoom {
            id: room_id,
            participants: [lo.to_string(), hi.to_string()],
            last_message: None,
            last_activity: self.clock.now(),
        };
        let doc = documents::room_document(&room)?;
        let id = room.id.clone();
        on_store(&self.store, move |store| store.set(ROOMS, &id, doc)).await?;

        debug!(room_id = %room.id, "conversation room created");
        Ok(room)
    }

    pub async fn get_room(&self, room_id: &str) -> ChatResult<Option<ConversationRoom>> {
        let id = room_id.to_string();
        let snapshot = on_store(&self.store, move |store| store.get(ROOMS, &id)).await?;
        Ok(snapshot.map(|s| documents::decode_room(&s)).transpose()?)
    }
}
