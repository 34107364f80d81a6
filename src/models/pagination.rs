//! Pagination and date-window primitives shared by list and report endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Pagination query parameters.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    const MAX_PER_PAGE: i64 = 100;

    const DEFAULT_PER_PAGE: i64 = 20;

    pub fn limit(&self) -> i64 {
        self.per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.current_page() - 1) * self.limit()
    }

    pub fn current_page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Paged result envelope returned by list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T: Serialize> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: &Pagination) -> Self {
        let per_page = pagination.limit();
        let total_pages = (total + per_page - 1) / per_page;
        Self {
            items,
            total,
            page: pagination.current_page(),
            per_page,
            total_pages,
        }
    }
}

/// Inclusive-exclusive `[from, to)` window used by exports.
#[derive(Debug, Clone, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    const MAX_DAYS: i64 = 366;

    pub fn validate(&self) -> Result<(), AppError> {
        if self.to <= self.from {
            return Err(AppError::Validation(
                "'to' must be after 'from'".to_string(),
            ));
        }
        if (self.to - self.from).num_days() > Self::MAX_DAYS {
            return Err(AppError::Validation(format!(
                "Date range cannot exceed {} days",
                Self::MAX_DAYS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn pagination_defaults() {
        let p = Pagination::default();
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.current_page(), 1);
    }

    #[test]
    fn pagination_clamps_per_page_and_page() {
        let p = Pagination {
            page: Some(-4),
            per_page: Some(500),
        };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.current_page(), 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn pagination_offset_calculation() {
        let p = Pagination {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn paged_result_total_pages() {
        let p = Pagination {
            page: Some(1),
            per_page: Some(10),
        };
        let result = PagedResult::new(vec![1, 2, 3], 25, &p);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.total, 25);
    }

    #[test]
    fn date_range_rejects_inverted_and_oversized_windows() {
        let now = Utc::now();
        let inverted = DateRange {
            from: now,
            to: now - Duration::hours(1),
        };
        assert!(inverted.validate().is_err());

        let huge = DateRange {
            from: now - Duration::days(400),
            to: now,
        };
        assert!(huge.validate().is_err());

        let week = DateRange {
            from: now - Duration::days(7),
            to: now,
        };
        assert!(week.validate().is_ok());
    }
}
