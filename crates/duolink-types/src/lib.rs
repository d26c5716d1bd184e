pub mod api;
pub mod models;

pub use api::TokenValidation;
pub use models::{
    ConversationRoom, LanguageCode, Message, MessageSnapshot, MessageStatus, PairingToken,
};
