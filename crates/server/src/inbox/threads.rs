use serde::Serialize;

use inbox_shared::validation::validate_subject;

use super::{publish_thread_updated, push_unread_total};
use crate::config::DuplicateThreadPolicy;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Caller, CreateThreadRequest, Message, MessageQuery, MessageStatus, Pagination, Role, Thread,
    ThreadListQuery, ThreadStats, ThreadStatus, ThreadType, ThreadViewQuery,
    UpdateThreadRequest,
};
use crate::store::{self, lifecycle, threads::CreateOutcome, threads::NewThread};
use crate::ws::events::ServerEvent;
use crate::ws::fanout::ThreadAudience;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ThreadPage {
    pub threads: Vec<Thread>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ThreadView {
    pub thread: Thread,
    pub messages: Vec<Message>,
    pub pagination: Pagination,
}

pub async fn create_thread(
    state: &AppState,
    caller: &Caller,
    req: CreateThreadRequest,
) -> ApiResult<CreateOutcome> {
    let subject = req.subject.trim();
    validate_subject(subject).map_err(|e| ApiError::invalid_field("subject", e))?;

    if req.counterparty_id == caller.id() {
        return Err(ApiError::invalid_field(
            "counterpartyId",
            "You cannot open a thread with yourself",
        ));
    }

    let counterparty = store::users::find(&state.db, &req.counterparty_id)
        .await?
        .filter(|u| u.role == caller.role.counterpart())
        .ok_or(ApiError::NotFound("Counterparty"))?;

    let (seller_id, buyer_id) = match caller.role {
        Role::Seller => (caller.id(), counterparty.id.as_str()),
        Role::Buyer => (counterparty.id.as_str(), caller.id()),
    };

    let outcome = store::threads::create(
        &state.db,
        NewThread {
            seller_id,
            buyer_id,
            subject,
            thread_type: req.thread_type.unwrap_or(ThreadType::Message),
            related_order_id: req.related_order_id.as_deref(),
            related_rfq_id: req.related_rfq_id.as_deref(),
        },
        caller.role,
    )
    .await?;

    match outcome {
        CreateOutcome::Existing(_)
            if state.config.duplicate_threads == DuplicateThreadPolicy::Reject =>
        {
            Err(ApiError::Conflict(
                "An open thread with this subject already exists".into(),
            ))
        }
        CreateOutcome::Existing(thread) => Ok(CreateOutcome::Existing(thread)),
        CreateOutcome::Created(thread) => {
            tracing::info!(
                "Thread {} opened by {} {}",
                thread.id,
                caller.role,
                caller.id()
            );
            publish_thread_updated(state, &thread).await;
            push_unread_total(state, &counterparty.id, counterparty.role).await;
            Ok(CreateOutcome::Created(thread))
        }
    }
}

pub async fn list_threads(
    state: &AppState,
    caller: &Caller,
    query: &ThreadListQuery,
) -> ApiResult<ThreadPage> {
    let (threads, pagination) =
        store::threads::list(&state.db, caller.id(), caller.role, query).await?;
    Ok(ThreadPage {
        threads,
        pagination,
    })
}

/// A thread with one page of its messages. Only marks it read when asked to.
pub async fn view_thread(
    state: &AppState,
    caller: &Caller,
    thread_id: &str,
    query: &ThreadViewQuery,
) -> ApiResult<ThreadView> {
    let mut thread =
        store::threads::find_for(&state.db, thread_id, caller.id(), caller.role).await?;

    if query.mark_read {
        thread = mark_read(state, caller, thread_id).await?;
    }

    let (messages, pagination) = store::messages::list_by_thread(
        &state.db,
        thread_id,
        &MessageQuery {
            page: query.page,
            limit: query.limit,
        },
        state.config.deleted_messages,
    )
    .await?;

    Ok(ThreadView {
        thread,
        messages,
        pagination,
    })
}

pub async fn update_thread(
    state: &AppState,
    caller: &Caller,
    thread_id: &str,
    req: UpdateThreadRequest,
) -> ApiResult<Thread> {
    let subject = req.subject.as_deref().map(str::trim);
    if let Some(subject) = subject {
        validate_subject(subject).map_err(|e| ApiError::invalid_field("subject", e))?;
    }
    if subject.is_none() && req.status.is_none() {
        return Err(ApiError::invalid("Nothing to update"));
    }

    store::threads::find_for(&state.db, thread_id, caller.id(), caller.role).await?;
    let thread = store::threads::update(&state.db, thread_id, req.status, subject).await?;

    publish_thread_updated(state, &thread).await;
    Ok(thread)
}

pub async fn archive_thread(state: &AppState, caller: &Caller, thread_id: &str) -> ApiResult<Thread> {
    update_thread(
        state,
        caller,
        thread_id,
        UpdateThreadRequest {
            status: Some(ThreadStatus::Archived),
            subject: None,
        },
    )
    .await
}

/// Reset the caller's counter and promote every counterpart message to `read`.
pub async fn mark_read(state: &AppState, caller: &Caller, thread_id: &str) -> ApiResult<Thread> {
    store::threads::find_for(&state.db, thread_id, caller.id(), caller.role).await?;

    let promoted =
        lifecycle::mark_thread_read(&state.db, thread_id, caller.id(), caller.role).await?;
    let thread = store::threads::find_for(&state.db, thread_id, caller.id(), caller.role).await?;

    if !promoted.is_empty() {
        tracing::debug!("{} messages in {} marked read", promoted.len(), thread_id);
        state
            .fanout
            .publish_thread(
                ThreadAudience::of(&thread),
                &ServerEvent::MessageStatusChanged {
                    thread_id: thread.id.clone(),
                    message_ids: promoted,
                    status: MessageStatus::Read,
                    read_by: Some(caller.id().to_string()),
                },
            )
            .await;
    }
    publish_thread_updated(state, &thread).await;
    push_unread_total(state, caller.id(), caller.role).await;

    Ok(thread)
}

pub async fn stats(state: &AppState, caller: &Caller) -> ApiResult<ThreadStats> {
    store::threads::stats(&state.db, caller.id(), caller.role).await
}
