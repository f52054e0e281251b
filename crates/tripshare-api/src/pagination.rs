//! Fixed-size, 1-based page windows over ordered query results.
//!
//! Page sizes are fixed per resource kind; clients only pick the page
//! number. Page 0 is rejected, and a page past the last one is `NotFound`
//! except for page 1 of an empty collection, which is an empty page.

use tripshare_types::api::Page;

use crate::error::ApiError;

pub const COMMENT_PAGE_SIZE: u32 = 5;
pub const POST_PAGE_SIZE: u32 = 5;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub page: u32,
    pub limit: u32,
    pub offset: u32,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
}

/// Compute the window for `page` (default 1) over `total_count` items.
pub fn paginate(total_count: u64, page: Option<u32>, page_size: u32) -> Result<Window, ApiError> {
    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(ApiError::validation("page numbers start at 1"));
    }
    if page_size == 0 {
        return Err(ApiError::Internal(anyhow::anyhow!("page size must be positive")));
    }

    let size = u64::from(page_size);
    let last_page = total_count.div_ceil(size).max(1);
    if u64::from(page) > last_page {
        return Err(ApiError::NotFound("Page"));
    }

    let offset = (u64::from(page) - 1) * size;
    Ok(Window {
        page,
        limit: page_size,
        offset: u32::try_from(offset).map_err(|_| ApiError::NotFound("Page"))?,
        next_page: (u64::from(page) < last_page).then(|| page + 1),
        previous_page: (page > 1).then(|| page - 1),
    })
}

impl Window {
    pub fn into_page<T>(self, items: Vec<T>, total_count: u64) -> Page<T> {
        Page {
            items,
            next_page: self.next_page,
            previous_page: self.previous_page,
            total_count,
        }
    }
}

/// Count, window, then fetch with the window's `LIMIT`/`OFFSET`.
pub fn fetch_page<T, C, F>(page: Option<u32>, page_size: u32, count: C, fetch: F) -> Result<Page<T>, ApiError>
where
    C: FnOnce() -> anyhow::Result<u64>,
    F: FnOnce(u32, u32) -> anyhow::Result<Vec<T>>,
{
    let total_count = count()?;
    let window = paginate(total_count, page, page_size)?;
    let items = fetch(window.limit, window.offset)?;
    Ok(window.into_page(items, total_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_middle_and_last_pages() {
        let first = paginate(12, None, 5).unwrap();
        assert_eq!((first.offset, first.limit), (0, 5));
        assert_eq!((first.previous_page, first.next_page), (None, Some(2)));

        let middle = paginate(12, Some(2), 5).unwrap();
        assert_eq!(middle.offset, 5);
        assert_eq!((middle.previous_page, middle.next_page), (Some(1), Some(3)));

        let last = paginate(12, Some(3), 5).unwrap();
        assert_eq!(last.offset, 10);
        assert_eq!((last.previous_page, last.next_page), (Some(2), None));
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_page() {
        assert!(paginate(10, Some(2), 5).unwrap().next_page.is_none());
        assert!(matches!(paginate(10, Some(3), 5), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn empty_collection_has_one_empty_page() {
        let only = paginate(0, Some(1), 5).unwrap();
        assert_eq!(only.offset, 0);
        assert!(only.next_page.is_none() && only.previous_page.is_none());
        assert!(matches!(paginate(0, Some(2), 5), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn page_zero_is_a_validation_error() {
        assert!(matches!(paginate(3, Some(0), 5), Err(ApiError::Validation(_))));
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        assert!(matches!(paginate(3, Some(u32::MAX), 5), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn fetch_page_threads_limit_and_offset() {
        let data: Vec<u32> = (0..7).collect();
        let page = fetch_page(Some(2), 5, || Ok(data.len() as u64), |limit, offset| {
            Ok(data.iter().copied().skip(offset as usize).take(limit as usize).collect())
        })
        .unwrap();
        assert_eq!(page.items, vec![5, 6]);
        assert_eq!(page.total_count, 7);
        assert_eq!(page.previous_page, Some(1));
        assert_eq!(page.next_page, None);
    }
}
