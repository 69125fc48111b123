use serde_json::Value;

/// A normalized inbound Telegram message, regular or business.
///
/// The channel decodes whichever raw update shape arrived into this one
/// struct before it reaches the gateway.
#[derive(Debug, Clone, Default)]
pub struct Inbound {
    pub chat_id: String,
    pub message_id: i64,
    pub from_id: String,
    pub from_name: String,
    /// Message timestamp from the platform, epoch seconds.
    pub date: i64,
    pub text: Option<String>,
    /// Raw Telegram entity objects, passed through untouched.
    pub entities: Option<Vec<Value>>,
    pub photo_file_id: Option<String>,
    pub document_file_id: Option<String>,
    pub sticker_file_id: Option<String>,
    pub voice_file_id: Option<String>,
    pub caption: Option<String>,
    /// Present only for business messages; replies must be routed
    /// through this connection.
    pub business_connection_id: Option<String>,
}

impl Inbound {
    pub fn is_from(&self, user_id: &str) -> bool {
        self.from_id == user_id
    }
}

/// A message-deletion event, normalized at the channel boundary.
///
/// Telegram has no single reliable deletion shape; the probing lives in
/// `javob-channels`, and the core only ever sees this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionSignal {
    pub chat_id: String,
    pub message_id: String,
    pub who: Option<String>,
}

/// Options applied to one outbound send.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Send with HTML parse mode. Ignored when `entities` is set —
    /// entities take precedence to avoid double formatting.
    pub html: bool,
    pub entities: Option<Vec<Value>>,
    pub reply_to: Option<i64>,
    pub business_connection_id: Option<String>,
    /// Raw `reply_markup` object (keyboards for the admin wizard).
    pub reply_markup: Option<Value>,
}

impl SendOptions {
    /// Options for replying within a business conversation.
    pub fn business(connection_id: &str) -> Self {
        Self {
            business_connection_id: Some(connection_id.to_string()),
            ..Self::default()
        }
    }

    /// Options for replying to a specific message.
    pub fn reply_to(message_id: i64) -> Self {
        Self {
            reply_to: Some(message_id),
            ..Self::default()
        }
    }
}
