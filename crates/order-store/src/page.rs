use serde::Serialize;

/// Default number of orders returned per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 200;

/// Limit/offset window over the order listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of rows to return.
    pub limit: u32,

    /// Number of rows to skip.
    pub offset: u64,
}

impl PageRequest {
    /// Creates a page request, clamping the limit to `1..=MAX_PAGE_LIMIT`.
    pub fn new(limit: u32, offset: u64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            offset,
        }
    }

    /// Returns the first page with the default size.
    pub fn first() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT, 0)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of results plus the unfiltered row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,

    /// Total number of rows, independent of `limit` and `offset`.
    pub total: u64,

    pub limit: u32,
    pub offset: u64,
}

impl<T> Page<T> {
    /// Creates a page from its rows and the request that produced it.
    pub fn new(data: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            data,
            total,
            limit: request.limit,
            offset: request.offset,
        }
    }

    /// Returns true if rows exist after this page.
    pub fn has_next(&self) -> bool {
        self.offset + u64::from(self.limit) < self.total
    }

    /// Returns true if rows exist before this page.
    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        assert_eq!(PageRequest::new(0, 0).limit, 1);
        assert_eq!(PageRequest::new(500, 0).limit, MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::new(50, 10).limit, 50);
    }

    #[test]
    fn navigation_flags() {
        let page: Page<u8> = Page::new(vec![], 120, PageRequest::new(50, 50));
        assert!(page.has_next());
        assert!(page.has_prev());

        let last: Page<u8> = Page::new(vec![], 120, PageRequest::new(50, 100));
        assert!(!last.has_next());

        let first: Page<u8> = Page::new(vec![], 10, PageRequest::first());
        assert!(!first.has_prev());
        assert!(!first.has_next());
    }
}
