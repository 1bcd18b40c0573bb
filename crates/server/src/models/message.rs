use serde::{Deserialize, Serialize};

use inbox_shared::attachment::AttachmentKind;
use inbox_shared::constants::MAX_PREVIEW_LENGTH;

use super::Role;

/// Delivery state of a message. Variants are declared in lifecycle order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 4] = [
        MessageStatus::Sending,
        MessageStatus::Sent,
        MessageStatus::Delivered,
        MessageStatus::Read,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
        }
    }

    /// States a message may be promoted from when moving to `self`.
    pub fn predecessors(self) -> Vec<MessageStatus> {
        Self::ALL.into_iter().filter(|s| *s < self).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AttachmentType {
    File,
    Image,
    Voice,
}

impl AttachmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentType::File => "file",
            AttachmentType::Image => "image",
            AttachmentType::Voice => "voice",
        }
    }
}

impl From<AttachmentKind> for AttachmentType {
    fn from(kind: AttachmentKind) -> Self {
        match kind {
            AttachmentKind::File => AttachmentType::File,
            AttachmentKind::Image => AttachmentType::Image,
            AttachmentKind::Voice => AttachmentType::Voice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[serde(skip)]
    pub message_id: Option<String>,
    #[serde(skip)]
    pub uploader_id: String,
    pub filename: String,
    pub original_name: String,
    pub path: String,
    pub size: i64,
    pub mime_type: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: AttachmentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    #[serde(skip)]
    pub message_id: String,
    pub emoji: String,
    pub user_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardedFrom {
    pub thread_id: String,
    pub message_id: String,
    pub original_sender_id: String,
}

/// A `messages` row before its attachments, reactions and readers are joined in.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: String,
    pub thread_id: String,
    pub sender_id: String,
    pub sender_type: Role,
    pub content: String,
    pub status: MessageStatus,
    pub is_edited: bool,
    pub edited_at: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub reply_to: Option<String>,
    pub forwarded_thread_id: Option<String>,
    pub forwarded_message_id: Option<String>,
    pub forwarded_sender_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub sender_id: String,
    pub sender_type: Role,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub status: MessageStatus,
    pub is_edited: bool,
    pub edited_at: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub reply_to: Option<String>,
    pub forwarded_from: Option<ForwardedFrom>,
    pub reactions: Vec<Reaction>,
    pub read_by: Vec<String>,
    pub created_at: String,
}

impl Message {
    /// Combine a row with its children. Deleted messages never expose their attachments.
    pub fn assemble(
        row: MessageRow,
        attachments: Vec<Attachment>,
        reactions: Vec<Reaction>,
        read_by: Vec<String>,
    ) -> Self {
        let forwarded_from = match (
            row.forwarded_thread_id,
            row.forwarded_message_id,
            row.forwarded_sender_id,
        ) {
            (Some(thread_id), Some(message_id), Some(original_sender_id)) => Some(ForwardedFrom {
                thread_id,
                message_id,
                original_sender_id,
            }),
            _ => None,
        };

        let attachments = if row.is_deleted { Vec::new() } else { attachments };

        Message {
            id: row.id,
            thread_id: row.thread_id,
            sender_id: row.sender_id,
            sender_type: row.sender_type,
            content: row.content,
            attachments,
            status: row.status,
            is_edited: row.is_edited,
            edited_at: row.edited_at,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
            reply_to: row.reply_to,
            forwarded_from,
            reactions,
            read_by,
            created_at: row.created_at,
        }
    }
}

/// Reference to an existing message a new post was forwarded from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardReference {
    pub message_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachment_ids: Vec<String>,
    pub reply_to: Option<String>,
    pub forwarded_from: Option<ForwardReference>,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactRequest {
    pub emoji: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    pub target_thread_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Text shown in thread listings for the latest message.
pub fn message_preview(content: &str, attachments: &[AttachmentType]) -> String {
    let trimmed = content.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(MAX_PREVIEW_LENGTH).collect();
    }
    match attachments.first() {
        Some(AttachmentType::Image) => "Sent an image".into(),
        Some(AttachmentType::Voice) => "Sent a voice message".into(),
        Some(AttachmentType::File) => "Sent a file".into(),
        None => String::new(),
    }
}
