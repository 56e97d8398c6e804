//! Page/limit arithmetic shared by every list endpoint.

use serde::Serialize;

/// A validated page request.
///
/// `page` is 1-based. Out-of-range input is clamped rather than rejected so
/// that `?page=0&limit=10000` still returns something sensible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    /// Page size used when the client does not ask for one.
    pub const DEFAULT_LIMIT: u32 = 20;
    /// Largest page size a client may request.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a pagination from optional query values.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Row offset for SQL `OFFSET`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    /// Number of pages needed for `total` rows (at least 1).
    #[must_use]
    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = i64::from(self.limit);
        ((total.max(0) + limit - 1) / limit).max(1)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Pagination::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), Pagination::DEFAULT_LIMIT);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_clamps_out_of_range_input() {
        let p = Pagination::new(Some(0), Some(10_000));
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), Pagination::MAX_LIMIT);

        let p = Pagination::new(Some(3), Some(0));
        assert_eq!(p.limit(), 1);
    }

    #[test]
    fn test_offset() {
        assert_eq!(Pagination::new(Some(3), Some(25)).offset(), 50);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let p = Pagination::new(None, Some(10));
        assert_eq!(p.total_pages(0), 1);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(11), 2);
        assert_eq!(p.total_pages(95), 10);
    }
}
