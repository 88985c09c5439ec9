//! Listing filters and pagination utilities

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{DEFAULT_PAGE_LIMIT, DEFAULT_PAGE_NUMBER};
use crate::core::booking::{Booking, BookingStatus};

/// AND-combined predicates applied to non-deleted bookings
///
/// Every `None` field is ignored. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    /// Case-insensitive substring of the customer name
    pub customer_name: Option<String>,
    /// Exact phone number
    pub phone: Option<i64>,
    pub booking_from: Option<DateTime<Utc>>,
    pub booking_to: Option<DateTime<Utc>>,
    /// Exact status
    pub status: Option<BookingStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl BookingFilter {
    /// Evaluate the filter against a single row
    ///
    /// Soft-deleted rows never match.
    pub fn matches(&self, booking: &Booking) -> bool {
        if booking.is_deleted {
            return false;
        }

        if let Some(name) = &self.customer_name
            && !booking
                .customer_name
                .to_lowercase()
                .contains(&name.to_lowercase())
        {
            return false;
        }

        if self.phone.is_some_and(|phone| booking.phone != phone) {
            return false;
        }

        if self.status.is_some_and(|status| booking.status != status) {
            return false;
        }

        within(booking.booking_date, self.booking_from, self.booking_to)
            && within(booking.created_at, self.created_from, self.created_to)
    }
}

fn within(value: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.is_none_or(|from| value >= from) && to.is_none_or(|to| value <= to)
}

/// Requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    /// Build a request, forcing both values to at least 1
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page: page.max(1),
            size: size.max(1),
        }
    }

    /// Number of rows skipped before this page, saturating at `usize::MAX`
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_LIMIT)
    }
}

/// One page of rows plus the total count across all pages
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Paginated response structure
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(page: Page<T>, request: PageRequest) -> Self {
        Self {
            pagination: PaginationMeta::new(request.page, request.size, page.total),
            data: page.items,
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    /// Whether a later page exists
    pub has_next: bool,

    /// Whether an earlier page exists
    pub has_previous: bool,

    pub next_page: Option<usize>,

    pub previous_page: Option<usize>,

    /// Current page number (starts at 1)
    pub current_page: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Number of items per page
    pub per_page: usize,

    /// Total number of items (after filters)
    pub total: usize,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: usize, per_page: usize, total: usize) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total.div_ceil(per_page);
        let has_next = page < total_pages;
        let has_previous = page > 1;

        Self {
            has_next,
            has_previous,
            next_page: has_next.then_some(page + 1),
            previous_page: has_previous.then(|| page - 1),
            current_page: page,
            total_pages,
            per_page,
            total,
        }
    }
}
