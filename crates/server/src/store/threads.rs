use sqlx::SqlitePool;
use uuid::Uuid;

use inbox_shared::constants::{MAX_PAGE_SIZE, THREAD_PAGE_SIZE};

use super::{escape_like, fold_case};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    page_window, Pagination, Role, Thread, ThreadListQuery, ThreadStats, ThreadStatus, ThreadType,
};

pub struct NewThread<'a> {
    pub seller_id: &'a str,
    pub buyer_id: &'a str,
    pub subject: &'a str,
    pub thread_type: ThreadType,
    pub related_order_id: Option<&'a str>,
    pub related_rfq_id: Option<&'a str>,
}

pub enum CreateOutcome {
    Created(Thread),
    /// An open thread with the same pair and subject already existed.
    Existing(Thread),
}

pub async fn find(pool: &SqlitePool, thread_id: &str) -> ApiResult<Option<Thread>> {
    let thread = sqlx::query_as::<_, Thread>("SELECT * FROM threads WHERE id = ?")
        .bind(thread_id)
        .fetch_optional(pool)
        .await?;
    Ok(thread)
}

/// Load a thread the user takes part in under `role`. Anything else is reported as not found.
pub async fn find_for(
    pool: &SqlitePool,
    thread_id: &str,
    user_id: &str,
    role: Role,
) -> ApiResult<Thread> {
    match find(pool, thread_id).await? {
        Some(thread) if thread.participant(role) == user_id => Ok(thread),
        _ => Err(ApiError::NotFound("Thread")),
    }
}

pub async fn find_open_duplicate(
    pool: &SqlitePool,
    seller_id: &str,
    buyer_id: &str,
    subject: &str,
) -> ApiResult<Option<Thread>> {
    let thread = sqlx::query_as::<_, Thread>(
        r#"SELECT * FROM threads
           WHERE seller_id = ? AND buyer_id = ? AND subject = ? AND status IN (?, ?)
           LIMIT 1"#,
    )
    .bind(seller_id)
    .bind(buyer_id)
    .bind(subject)
    .bind(ThreadStatus::Active)
    .bind(ThreadStatus::Resolved)
    .fetch_optional(pool)
    .await?;
    Ok(thread)
}

/// Create a thread opened by `initiator`. The counterpart starts with one unread.
pub async fn create(
    pool: &SqlitePool,
    new: NewThread<'_>,
    initiator: Role,
) -> ApiResult<CreateOutcome> {
    if let Some(existing) =
        find_open_duplicate(pool, new.seller_id, new.buyer_id, new.subject).await?
    {
        return Ok(CreateOutcome::Existing(existing));
    }

    let id = Uuid::new_v4().to_string();
    let now = db::now();
    let (seller_unread, buyer_unread) = match initiator {
        Role::Seller => (0, 1),
        Role::Buyer => (1, 0),
    };

    let inserted = sqlx::query(
        r#"INSERT INTO threads (id, seller_id, buyer_id, subject, subject_search, type,
               related_order_id, related_rfq_id, status, last_message_at, last_message_preview,
               seller_unread_count, buyer_unread_count, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '', ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(new.seller_id)
    .bind(new.buyer_id)
    .bind(new.subject)
    .bind(fold_case(new.subject))
    .bind(new.thread_type)
    .bind(new.related_order_id)
    .bind(new.related_rfq_id)
    .bind(ThreadStatus::Active)
    .bind(&now)
    .bind(seller_unread)
    .bind(buyer_unread)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            // A concurrent request created the same thread first.
            return match find_open_duplicate(pool, new.seller_id, new.buyer_id, new.subject)
                .await?
            {
                Some(existing) => Ok(CreateOutcome::Existing(existing)),
                None => Err(ApiError::Conflict(
                    "An open thread with this subject already exists".into(),
                )),
            };
        }
        Err(e) => return Err(e.into()),
    }

    let thread = find(pool, &id).await?.ok_or(ApiError::NotFound("Thread"))?;
    Ok(CreateOutcome::Created(thread))
}

fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by.unwrap_or("lastMessageAt") {
        "createdAt" => "created_at",
        "updatedAt" => "updated_at",
        "subject" => "subject",
        "status" => "status",
        "type" => "type",
        "sellerUnreadCount" => "seller_unread_count",
        "buyerUnreadCount" => "buyer_unread_count",
        _ => "last_message_at",
    }
}

/// One page of the user's threads for `role`, filtered and sorted per the query.
pub async fn list(
    pool: &SqlitePool,
    user_id: &str,
    role: Role,
    query: &ThreadListQuery,
) -> ApiResult<(Vec<Thread>, Pagination)> {
    let (page, limit, offset) =
        page_window(query.page, query.limit, THREAD_PAGE_SIZE, MAX_PAGE_SIZE);

    let mut conditions = vec![format!("{} = ?", role.participant_column())];
    let mut args: Vec<String> = vec![user_id.to_string()];

    if let Some(status) = query.status {
        conditions.push("status = ?".into());
        args.push(status.as_str().into());
    }
    if let Some(thread_type) = query.thread_type {
        conditions.push("type = ?".into());
        args.push(thread_type.as_str().into());
    }
    if let Some(search) = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let pattern = format!("%{}%", escape_like(&fold_case(search)));
        conditions.push(
            r"(subject_search LIKE ? ESCAPE '\' OR preview_search LIKE ? ESCAPE '\')".into(),
        );
        args.push(pattern.clone());
        args.push(pattern);
    }

    let where_clause = conditions.join(" AND ");

    let count_sql = format!("SELECT COUNT(*) FROM threads WHERE {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_query = count_query.bind(arg);
    }
    let total = count_query.fetch_one(pool).await?;

    let direction = match query.sort_order.as_deref() {
        Some(order) if order.eq_ignore_ascii_case("asc") => "ASC",
        _ => "DESC",
    };
    let sql = format!(
        "SELECT * FROM threads WHERE {} ORDER BY {} {}, id {} LIMIT ? OFFSET ?",
        where_clause,
        sort_column(query.sort_by.as_deref()),
        direction,
        direction
    );
    let mut page_query = sqlx::query_as::<_, Thread>(&sql);
    for arg in &args {
        page_query = page_query.bind(arg);
    }
    let threads = page_query.bind(limit).bind(offset).fetch_all(pool).await?;

    Ok((threads, Pagination::new(page, limit, total)))
}

/// Apply a status and/or subject change. Fields left as `None` are untouched.
pub async fn update(
    pool: &SqlitePool,
    thread_id: &str,
    status: Option<ThreadStatus>,
    subject: Option<&str>,
) -> ApiResult<Thread> {
    let updated = sqlx::query(
        r#"UPDATE threads
           SET status = COALESCE(?, status), subject = COALESCE(?, subject),
               subject_search = COALESCE(?, subject_search), updated_at = ?
           WHERE id = ?"#,
    )
    .bind(status)
    .bind(subject)
    .bind(subject.map(fold_case))
    .bind(db::now())
    .bind(thread_id)
    .execute(pool)
    .await;

    match updated {
        Ok(result) if result.rows_affected() == 0 => return Err(ApiError::NotFound("Thread")),
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::Conflict(
                "An open thread with this subject already exists".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    find(pool, thread_id)
        .await?
        .ok_or(ApiError::NotFound("Thread"))
}

pub async fn stats(pool: &SqlitePool, user_id: &str, role: Role) -> ApiResult<ThreadStats> {
    let sql = format!(
        r#"SELECT COUNT(*) AS total_threads,
               COALESCE(SUM(CASE WHEN {unread} > 0 THEN 1 ELSE 0 END), 0) AS unread_threads,
               COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0) AS active_threads,
               COALESCE(SUM(CASE WHEN status = 'archived' THEN 1 ELSE 0 END), 0) AS archived_threads
           FROM threads WHERE {participant} = ?"#,
        unread = role.unread_column(),
        participant = role.participant_column(),
    );
    let stats = sqlx::query_as::<_, ThreadStats>(&sql)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(stats)
}
