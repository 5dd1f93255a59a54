//! Page reconciliation across providers with incompatible paging contracts.
//!
//! Primary and USDA declare a real total and page server-side. The UPC and
//! nutrition lookups only return a capped list, so their "total" is just the
//! number of items in this call.

use crate::query::CanonicalQuery;
use serde::{Deserialize, Serialize};

/// What a provider told us about the size of the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum ReportedTotal {
    /// Server-declared total across all pages
    Declared(u64),
    /// Only the number of items returned by this call; no stable total
    ReturnedOnly(u64),
}

impl ReportedTotal {
    pub fn count(&self) -> u64 {
        match self {
            ReportedTotal::Declared(n) | ReportedTotal::ReturnedOnly(n) => *n,
        }
    }

    pub fn is_declared(&self) -> bool {
        matches!(self, ReportedTotal::Declared(_))
    }
}

/// Page metadata handed to the caller alongside the merged items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
    /// Best-effort total item count across the sources that answered
    pub total_count: u64,
    /// True only if every contributing source declared its total
    pub total_exact: bool,
}

impl PageMeta {
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }
}

pub struct PaginationController;

impl PaginationController {
    /// Pages implied by one source's total.
    pub fn pages_for(total: ReportedTotal, page_size: u32) -> u32 {
        let size = u64::from(page_size.max(1));
        match total {
            ReportedTotal::Declared(n) => {
                let pages = n.div_ceil(size).max(1);
                u32::try_from(pages).unwrap_or(u32::MAX)
            }
            ReportedTotal::ReturnedOnly(_) => 1,
        }
    }

    /// Reconcile the requested page with whatever totals the answering sources reported.
    pub fn page_meta(page_number: u32, page_size: u32, totals: &[ReportedTotal]) -> PageMeta {
        let page_size = page_size.max(1);
        let total_pages = totals
            .iter()
            .map(|t| Self::pages_for(*t, page_size))
            .max()
            .unwrap_or(1);
        PageMeta {
            current_page: page_number.max(1),
            total_pages,
            page_size,
            total_count: totals.iter().map(ReportedTotal::count).sum(),
            total_exact: !totals.is_empty() && totals.iter().all(ReportedTotal::is_declared),
        }
    }

    /// Query for the following page, if there is one.
    pub fn next(query: &CanonicalQuery, meta: &PageMeta) -> Option<CanonicalQuery> {
        meta.has_next().then(|| query.with_page(meta.current_page + 1))
    }

    /// Query for the preceding page, if there is one.
    pub fn previous(query: &CanonicalQuery) -> Option<CanonicalQuery> {
        (query.page_number() > 1).then(|| query.with_page(query.page_number() - 1))
    }

    /// Query for an explicit page, clamped into `1..=total_pages`.
    pub fn go_to(query: &CanonicalQuery, page: u32, meta: &PageMeta) -> CanonicalQuery {
        query.with_page(page.clamp(1, meta.total_pages.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_total_pages() {
        assert_eq!(PaginationController::pages_for(ReportedTotal::Declared(0), 20), 1);
        assert_eq!(PaginationController::pages_for(ReportedTotal::Declared(20), 20), 1);
        assert_eq!(PaginationController::pages_for(ReportedTotal::Declared(21), 20), 2);
        assert_eq!(PaginationController::pages_for(ReportedTotal::Declared(95), 10), 10);
    }

    #[test]
    fn test_returned_only_is_single_page() {
        assert_eq!(PaginationController::pages_for(ReportedTotal::ReturnedOnly(100), 10), 1);
        let meta = PaginationController::page_meta(1, 10, &[ReportedTotal::ReturnedOnly(40)]);
        assert_eq!(meta.total_pages, 1);
        assert!(!meta.total_exact);
        assert_eq!(meta.total_count, 40);
    }

    #[test]
    fn test_merged_meta_uses_largest_source() {
        let meta = PaginationController::page_meta(
            2,
            25,
            &[ReportedTotal::Declared(120), ReportedTotal::Declared(30)],
        );
        assert_eq!(meta.current_page, 2);
        assert_eq!(meta.total_pages, 5);
        assert_eq!(meta.total_count, 150);
        assert!(meta.total_exact);
        assert!(meta.has_next());
        assert!(meta.has_previous());
    }

    #[test]
    fn test_zero_inputs_are_clamped() {
        let meta = PaginationController::page_meta(0, 0, &[]);
        assert_eq!(meta.current_page, 1);
        assert_eq!(meta.page_size, 1);
        assert_eq!(meta.total_pages, 1);
        assert!(!meta.total_exact);
    }

    #[test]
    fn test_navigation_reissues_full_query() {
        let query = CanonicalQuery::builder().item_name("rice").page_size(10).build();
        let meta = PaginationController::page_meta(1, 10, &[ReportedTotal::Declared(35)]);

        let next = PaginationController::next(&query, &meta).unwrap();
        assert_eq!(next.page_number(), 2);
        assert_eq!(next.item_name(), Some("rice"));

        assert!(PaginationController::previous(&query).is_none());
        assert_eq!(PaginationController::previous(&next).unwrap().page_number(), 1);

        assert_eq!(PaginationController::go_to(&query, 99, &meta).page_number(), 4);
        assert_eq!(PaginationController::go_to(&query, 0, &meta).page_number(), 1);

        let last = PaginationController::page_meta(4, 10, &[ReportedTotal::Declared(35)]);
        assert!(PaginationController::next(&query, &last).is_none());
    }
}
