pub const APP_NAME: &str = "Inbox";

// Limits
pub const MIN_SUBJECT_LENGTH: usize = 3;
pub const MAX_SUBJECT_LENGTH: usize = 200;
pub const MAX_MESSAGE_LENGTH: usize = 5000;
pub const MAX_PREVIEW_LENGTH: usize = 200;
pub const MAX_EMOJI_LENGTH: usize = 32;
pub const MAX_FILENAME_LENGTH: usize = 255;

// Attachments
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_ATTACHMENTS_PER_REQUEST: usize = 5;

// Pagination
pub const THREAD_PAGE_SIZE: i64 = 20;
pub const MESSAGE_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

// Lifecycle
pub const DELIVERY_DELAY_MS: u64 = 1_500;
pub const DELIVERY_POLL_MS: u64 = 500;
pub const DELIVERY_RETRY_DELAY_MS: u64 = 5_000;

pub const DELETED_MESSAGE_TOMBSTONE: &str = "This message was deleted";
pub const EMPTY_MESSAGE_ERROR: &str = "A message needs text or at least one attachment";
