//! Paged listing results.

use serde::Serialize;

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u64,
    pub size: u64,
    /// Zero-based page number.
    pub number: u64,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(content: Vec<T>, total_elements: u64, number: u64, size: u64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            total_elements.div_ceil(size)
        };

        Self {
            content,
            total_elements,
            total_pages,
            size,
            number,
            first: number == 0,
            last: number.saturating_add(1) >= total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        let page = Page::new(vec![1, 2, 3], 25, 0, 12);
        assert_eq!(page.total_pages, 3);
        assert!(page.first);
        assert!(!page.last);

        let page = Page::new(vec![1], 25, 2, 12);
        assert!(!page.first);
        assert!(page.last);
    }

    #[test]
    fn test_empty_page_is_first_and_last() {
        let page: Page<i32> = Page::new(vec![], 0, 0, 12);
        assert_eq!(page.total_pages, 0);
        assert!(page.first && page.last);
    }

    #[test]
    fn test_last_page_number_does_not_overflow() {
        let page: Page<i32> = Page::new(vec![], 25, u64::MAX, 12);
        assert!(!page.first);
        assert!(page.last);
    }
}
