//! Background promotion of `sent` messages to `delivered`.
//!
//! Appends enqueue an outbox row due `DELIVERY_DELAY_MS` later. The worker drains due
//! rows on every tick; a failed row is retried later with its attempt count bumped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use inbox_shared::constants::DELIVERY_RETRY_DELAY_MS;

use crate::db;
use crate::error::ApiResult;
use crate::models::MessageStatus;
use crate::store::lifecycle::{self, PendingDelivery};
use crate::ws::events::ServerEvent;
use crate::ws::fanout::ThreadAudience;
use crate::AppState;

const BATCH_SIZE: i64 = 100;

pub fn spawn_worker(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let poll = Duration::from_millis(state.config.delivery_poll_ms);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = process_due(&state).await {
                tracing::error!("Delivery sweep failed: {}", e);
            }
        }
    })
}

/// Deliver everything due now. Returns how many messages changed status.
pub async fn process_due(state: &AppState) -> ApiResult<usize> {
    let due = lifecycle::due_deliveries(&state.db, &db::now(), BATCH_SIZE).await?;
    let mut promoted = 0;

    for pending in due {
        match lifecycle::complete_delivery(&state.db, &pending.message_id).await {
            Ok(true) => {
                promoted += 1;
                announce_delivered(state, &pending).await;
            }
            Ok(false) => {
                tracing::debug!("Message {} already past delivered", pending.message_id);
            }
            Err(e) => {
                tracing::warn!(
                    "Delivery of {} failed (attempt {}): {}",
                    pending.message_id,
                    pending.attempts + 1,
                    e
                );
                let retry_at = db::timestamp(
                    Utc::now() + chrono::Duration::milliseconds(DELIVERY_RETRY_DELAY_MS as i64),
                );
                lifecycle::defer_delivery(&state.db, &pending.message_id, &retry_at).await?;
            }
        }
    }

    Ok(promoted)
}

async fn announce_delivered(state: &AppState, pending: &PendingDelivery) {
    state
        .fanout
        .publish_thread(
            ThreadAudience {
                thread_id: &pending.thread_id,
                participants: [&pending.seller_id, &pending.buyer_id],
            },
            &ServerEvent::MessageStatusChanged {
                thread_id: pending.thread_id.clone(),
                message_ids: vec![pending.message_id.clone()],
                status: MessageStatus::Delivered,
                read_by: None,
            },
        )
        .await;
}
