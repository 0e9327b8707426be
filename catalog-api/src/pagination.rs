//! Pagination bounds shared by every list-returning query-service
//! operation (spec §4.9): `page_size ∈ [1, 100]` default 50,
//! `page_number ≥ 1` default 1. Out-of-bounds values are a validation
//! failure, not a clamp — the edge surfaces this as 422 (spec §6).

use catalog_core::error::{CatalogError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_PAGE_NUMBER: u32 = 1;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub size: u32,
    pub number: u32,
}

impl Page {
    pub fn validate(size: Option<u32>, number: Option<u32>) -> Result<Self> {
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
        let number = number.unwrap_or(DEFAULT_PAGE_NUMBER);
        if size < 1 || size > MAX_PAGE_SIZE {
            return Err(CatalogError::Invalid(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {size}"
            )));
        }
        if number < 1 {
            return Err(CatalogError::Invalid(format!("page_number must be >= 1, got {number}")));
        }
        Ok(Self { size, number })
    }

    /// Elasticsearch `from`: `page_size * (page_number - 1)`.
    pub fn from_offset(&self) -> u32 {
        self.size * (self.number - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let page = Page::validate(None, None).unwrap();
        assert_eq!(page, Page { size: DEFAULT_PAGE_SIZE, number: DEFAULT_PAGE_NUMBER });
    }

    #[test]
    fn page_size_101_is_rejected() {
        assert!(Page::validate(Some(101), None).is_err());
    }

    #[test]
    fn page_size_one_and_hundred_are_accepted() {
        assert!(Page::validate(Some(1), None).is_ok());
        assert!(Page::validate(Some(100), None).is_ok());
    }

    #[test]
    fn page_number_zero_is_rejected() {
        assert!(Page::validate(None, Some(0)).is_err());
    }

    #[test]
    fn offset_is_size_times_number_minus_one() {
        let page = Page::validate(Some(50), Some(3)).unwrap();
        assert_eq!(page.from_offset(), 100);
    }
}
