use serde::Serialize;

use crate::models::{Message, MessageStatus, Reaction, Role, Thread};
use crate::store::reactions::ReactionChange;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Ready {
        #[serde(rename = "userId")]
        user_id: String,
        role: Role,
    },
    ThreadJoined {
        #[serde(rename = "threadId")]
        thread_id: String,
    },
    NewMessage {
        #[serde(rename = "threadId")]
        thread_id: String,
        message: Message,
    },
    ThreadUpdated {
        #[serde(rename = "threadId")]
        thread_id: String,
        thread: Thread,
    },
    MessageUpdated {
        #[serde(rename = "threadId")]
        thread_id: String,
        message: Message,
    },
    MessageDeleted {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "messageId")]
        message_id: String,
        message: Message,
    },
    MessageReacted {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        emoji: String,
        action: ReactionChange,
        reactions: Vec<Reaction>,
    },
    MessageStatusChanged {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "messageIds")]
        message_ids: Vec<String>,
        status: MessageStatus,
        #[serde(rename = "readBy", skip_serializing_if = "Option::is_none")]
        read_by: Option<String>,
    },
    UserTyping {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    UserRecording {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "isRecording")]
        is_recording: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
    },
    UserSelectingFile {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "isSelecting")]
        is_selecting: bool,
        #[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
    UnreadCountUpdate {
        count: i64,
    },
    Error {
        message: String,
    },
}
