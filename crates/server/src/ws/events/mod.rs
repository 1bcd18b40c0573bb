mod server_event;

pub use server_event::ServerEvent;

use serde::Deserialize;

// ── Client → Server Events ──

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinThread {
        #[serde(rename = "threadId")]
        thread_id: String,
    },
    LeaveThread {
        #[serde(rename = "threadId")]
        thread_id: String,
    },
    Typing {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    Recording {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "isRecording")]
        is_recording: bool,
        #[serde(default)]
        duration: Option<f64>,
    },
    SelectingFile {
        #[serde(rename = "threadId")]
        thread_id: String,
        #[serde(rename = "isSelecting")]
        is_selecting: bool,
        #[serde(default, rename = "fileName")]
        file_name: Option<String>,
    },
    Ping,
}
