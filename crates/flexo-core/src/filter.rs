//! Record filtering for listings

use crate::{Record, Table};

/// Listings never return more rows than this unless asked to
pub const DEFAULT_ROW_CAP: usize = 1000;

/// Case-insensitive substring filters, combined with AND
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub order_number: Option<String>,
    pub sender_name: Option<String>,
    pub max_rows: usize,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            order_number: None,
            sender_name: None,
            max_rows: DEFAULT_ROW_CAP,
        }
    }
}

/// Records that passed a filter, capped at `max_rows`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredRecords {
    pub records: Vec<Record>,
    /// Matches before the cap was applied
    pub total_matches: usize,
    pub truncated: bool,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_number(mut self, needle: impl Into<String>) -> Self {
        self.order_number = non_blank(needle.into());
        self
    }

    pub fn sender_name(mut self, needle: impl Into<String>) -> Self {
        self.sender_name = non_blank(needle.into());
        self
    }

    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        contains(&record.order_number, self.order_number.as_deref())
            && contains(&record.sender_name, self.sender_name.as_deref())
    }

    pub fn apply(&self, table: &Table) -> FilteredRecords {
        let matching: Vec<&Record> = table.records().iter().filter(|r| self.matches(r)).collect();
        let total_matches = matching.len();
        FilteredRecords {
            records: matching.into_iter().take(self.max_rows).cloned().collect(),
            total_matches,
            truncated: total_matches > self.max_rows,
        }
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn contains(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(order: &str, sender: &str) -> Record {
        Record {
            order_number: order.into(),
            sender_name: sender.into(),
            ..Default::default()
        }
    }

    fn table() -> Table {
        Table::from_records(vec![
            record("PO-100", "Acme Labels"),
            record("PO-101", "Borealis Print"),
            record("PO-200", "ACME Packaging"),
        ])
    }

    #[test]
    fn no_filters_returns_everything() {
        let result = RecordFilter::new().apply(&table());
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.total_matches, 3);
        assert!(!result.truncated);
    }

    #[test]
    fn filters_are_case_insensitive_and_combined() {
        let result = RecordFilter::new().sender_name("acme").apply(&table());
        assert_eq!(result.total_matches, 2);

        let result = RecordFilter::new()
            .sender_name("acme")
            .order_number("po-2")
            .apply(&table());
        assert_eq!(result.records, vec![record("PO-200", "ACME Packaging")]);
    }

    #[test]
    fn blank_needles_are_ignored() {
        let filter = RecordFilter::new().order_number("   ");
        assert_eq!(filter.order_number, None);
        assert_eq!(filter.apply(&table()).total_matches, 3);
    }

    #[test]
    fn row_cap_truncates_and_reports_total() {
        let result = RecordFilter::new().max_rows(2).apply(&table());
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.total_matches, 3);
        assert!(result.truncated);
        assert_eq!(result.records[0].order_number, "PO-100");
    }
}
