//! Page-number pagination for post listings.

use std::str::FromStr;

use serde::Serialize;

use crate::error::DomainError;

/// Number of posts on a listing page.
pub const PAGE_SIZE: u64 = 10;

/// Page requested through the `page` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelector {
    Number(u64),
    Last,
}

impl Default for PageSelector {
    fn default() -> Self {
        PageSelector::Number(1)
    }
}

impl FromStr for PageSelector {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == "last" {
            return Ok(PageSelector::Last);
        }
        match raw.parse::<u64>() {
            Ok(number) if number >= 1 => Ok(PageSelector::Number(number)),
            _ => Err(DomainError::not_found("Page", raw)),
        }
    }
}

impl PageSelector {
    /// Parse an optional query value; absent or empty means the first page.
    pub fn parse(raw: Option<&str>) -> Result<Self, DomainError> {
        match raw {
            None | Some("") => Ok(PageSelector::default()),
            Some(s) => s.parse(),
        }
    }
}

/// A concrete, in-range page of a result set of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u64,
    pub per_page: u64,
}

impl PageRequest {
    /// Resolve `selector` against `total` items.
    ///
    /// Page 1 always exists, even for an empty result; any other page past
    /// the end is not found.
    pub fn resolve(selector: PageSelector, total: u64, per_page: u64) -> Result<Self, DomainError> {
        let last = num_pages(total, per_page);
        let number = match selector {
            PageSelector::Last => last,
            PageSelector::Number(n) if n <= last => n,
            PageSelector::Number(n) => return Err(DomainError::not_found("Page", n)),
        };
        Ok(Self { number, per_page })
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

/// Number of pages needed for `total` items, never less than one.
pub fn num_pages(total: u64, per_page: u64) -> u64 {
    total.div_ceil(per_page).max(1)
}

/// One page of a listing together with its position in the whole result.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub num_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let num_pages = num_pages(total_items, request.per_page);
        Self {
            items,
            number: request.number,
            per_page: request.per_page,
            total_items,
            num_pages,
            has_next: request.number < num_pages,
            has_previous: request.number > 1,
        }
    }
}
