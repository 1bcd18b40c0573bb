use std::env;

use inbox_shared::constants::{
    DELIVERY_DELAY_MS, DELIVERY_POLL_MS, MAX_ATTACHMENTS_PER_REQUEST, MAX_ATTACHMENT_BYTES,
};

/// How soft-deleted messages appear in thread listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletedMessagePolicy {
    /// Keep the message in place with its content replaced by a tombstone.
    Tombstone,
    /// Leave the message out of listings entirely.
    Hide,
}

/// What `POST /threads` does when an open thread with the same subject exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateThreadPolicy {
    ReturnExisting,
    Reject,
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub upload_dir: String,
    pub max_upload_bytes: u64,
    pub max_files_per_request: usize,
    pub delivery_delay_ms: u64,
    pub delivery_poll_ms: u64,
    pub deleted_messages: DeletedMessagePolicy,
    pub duplicate_threads: DuplicateThreadPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./inbox.db".into()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into()),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_ATTACHMENT_BYTES),
            max_files_per_request: env::var("MAX_FILES_PER_REQUEST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_ATTACHMENTS_PER_REQUEST),
            delivery_delay_ms: env::var("DELIVERY_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DELIVERY_DELAY_MS),
            delivery_poll_ms: env::var("DELIVERY_POLL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DELIVERY_POLL_MS),
            deleted_messages: match env::var("DELETED_MESSAGES").as_deref() {
                Ok("hide") => DeletedMessagePolicy::Hide,
                _ => DeletedMessagePolicy::Tombstone,
            },
            duplicate_threads: match env::var("DUPLICATE_THREADS").as_deref() {
                Ok("reject") => DuplicateThreadPolicy::Reject,
                _ => DuplicateThreadPolicy::ReturnExisting,
            },
        }
    }

    /// Upper bound for a single request body: every allowed file plus form fields.
    pub fn max_body_bytes(&self) -> usize {
        (self.max_upload_bytes as usize)
            .saturating_mul(self.max_files_per_request.max(1))
            .saturating_add(1_048_576)
    }
}
