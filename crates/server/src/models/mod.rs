mod message;
mod thread;
mod user;

pub use message::*;
pub use thread::*;
pub use user::*;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Clamp client-supplied paging to sane bounds. Returns (page, limit, offset).
pub fn page_window(page: Option<i64>, limit: Option<i64>, default_limit: i64, max_limit: i64) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, max_limit);
    (page, limit, (page - 1) * limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_pages_up() {
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).pages, 2);
    }

    #[test]
    fn page_window_clamps_input() {
        assert_eq!(page_window(None, None, 20, 100), (1, 20, 0));
        assert_eq!(page_window(Some(0), Some(500), 20, 100), (1, 100, 0));
        assert_eq!(page_window(Some(3), Some(10), 20, 100), (3, 10, 20));
    }
}
