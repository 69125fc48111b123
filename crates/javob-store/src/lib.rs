//! # javob-store
//!
//! The persisted state of the bot: one JSON document holding users,
//! trigger rules, conversation state, wizard state, message snapshots,
//! and the deletion log. The document is loaded fresh per handler and
//! saved whole after any mutation — the file is the source of truth.

mod document;
mod store;

pub use document::{
    Conversation, DeletedEntry, Document, LastReply, MessageSnapshot, ResponseItem, Rule,
    UserRecord, WizardState, DUPLICATE_WINDOW_MS,
};
pub use store::{now_ms, Store};
