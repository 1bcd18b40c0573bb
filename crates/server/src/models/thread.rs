use serde::{Deserialize, Serialize};

use super::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ThreadType {
    Rfq,
    Message,
    Order,
}

impl ThreadType {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreadType::Rfq => "rfq",
            ThreadType::Message => "message",
            ThreadType::Order => "order",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ThreadStatus {
    Active,
    Archived,
    Resolved,
    Closed,
}

impl ThreadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreadStatus::Active => "active",
            ThreadStatus::Archived => "archived",
            ThreadStatus::Resolved => "resolved",
            ThreadStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub seller_id: String,
    pub buyer_id: String,
    pub subject: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub thread_type: ThreadType,
    pub related_order_id: Option<String>,
    pub related_rfq_id: Option<String>,
    pub status: ThreadStatus,
    pub last_message_at: String,
    pub last_message_preview: String,
    pub seller_unread_count: i64,
    pub buyer_unread_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Thread {
    pub fn participant(&self, role: Role) -> &str {
        match role {
            Role::Seller => &self.seller_id,
            Role::Buyer => &self.buyer_id,
        }
    }

    pub fn participants(&self) -> [&str; 2] {
        [&self.seller_id, &self.buyer_id]
    }

    pub fn role_of(&self, user_id: &str) -> Option<Role> {
        if self.seller_id == user_id {
            Some(Role::Seller)
        } else if self.buyer_id == user_id {
            Some(Role::Buyer)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.role_of(user_id).is_some()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadRequest {
    pub counterparty_id: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub thread_type: Option<ThreadType>,
    pub related_order_id: Option<String>,
    pub related_rfq_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateThreadRequest {
    pub status: Option<ThreadStatus>,
    pub subject: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadListQuery {
    pub status: Option<ThreadStatus>,
    #[serde(rename = "type")]
    pub thread_type: Option<ThreadType>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadViewQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub mark_read: bool,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ThreadStats {
    pub total_threads: i64,
    pub unread_threads: i64,
    pub active_threads: i64,
    pub archived_threads: i64,
}
