//! Recent-activity feed and the sortable/filterable history table.
//!
//! Both views are recomputed from the unfiltered source collection every time;
//! nothing here keeps derived state between calls.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::format::type_label;
use crate::model::{Transaction, TransactionType};

/// How many entries the dashboard feed shows.
pub const RECENT_LIMIT: usize = 5;

pub const EMPTY_RECENT_TITLE: &str = "No recent activity";
pub const EMPTY_RECENT_HINT: &str = "Your recent transactions will appear here";
pub const EMPTY_TABLE_TITLE: &str = "No transactions found";
pub const EMPTY_TABLE_HINT: &str = "Try adjusting your filters";
pub const LOAD_FAILED: &str = "Failed to load transaction history";

/// Latest `RECENT_LIMIT` transactions, newest first.
pub fn recent_activity(all: &[Transaction]) -> Vec<Transaction> {
    recent_activity_n(all, RECENT_LIMIT)
}

pub fn recent_activity_n(all: &[Transaction], limit: usize) -> Vec<Transaction> {
    let mut sorted = all.to_vec();
    sorted.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
    sorted.truncate(limit);
    sorted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    Date,
    Amount,
    Type,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" | "transactiondate" => Ok(SortField::Date),
            "amount" => Ok(SortField::Amount),
            "type" | "transactiontype" => Ok(SortField::Type),
            other => Err(format!("unknown sort field '{other}' (expected date, amount or type)")),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortField::Date => "Date",
            SortField::Amount => "Amount",
            SortField::Type => "Type",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// `All` or one exact transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Only(TransactionType),
}

impl TypeFilter {
    /// Options in the order the filter selector shows them.
    pub fn options() -> Vec<TypeFilter> {
        let mut out = vec![TypeFilter::All];
        out.extend(TransactionType::KNOWN.iter().cloned().map(TypeFilter::Only));
        out
    }

    pub fn label(&self) -> &str {
        match self {
            TypeFilter::All => "All Transactions",
            TypeFilter::Only(TransactionType::TransferSent) => "Money Sent",
            TypeFilter::Only(TransactionType::TransferReceived) => "Money Received",
            TypeFilter::Only(TransactionType::Deposit) => "Deposits",
            TypeFilter::Only(TransactionType::Withdrawal) => "Withdrawals",
            TypeFilter::Only(TransactionType::Other(raw)) => raw,
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(t) => &tx.transaction_type == t,
        }
    }

    /// Next option in selector order, wrapping around.
    pub fn cycled(&self) -> TypeFilter {
        let options = Self::options();
        let idx = options.iter().position(|o| o == self).unwrap_or(0);
        options[(idx + 1) % options.len()].clone()
    }
}

impl FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty filter".to_string());
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(TypeFilter::All);
        }
        Ok(TypeFilter::Only(TransactionType::from_wire(&s.to_ascii_uppercase())))
    }
}

/// Sort and filter parameters of the full history table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub filter: TypeFilter,
}

impl Default for TableView {
    fn default() -> Self {
        Self {
            sort_field: SortField::Date,
            sort_direction: SortDirection::Descending,
            filter: TypeFilter::All,
        }
    }
}

impl TableView {
    pub fn new(sort_field: SortField, sort_direction: SortDirection, filter: TypeFilter) -> Self {
        Self {
            sort_field,
            sort_direction,
            filter,
        }
    }

    /// Clicking the active column flips direction; a new column starts ascending.
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == field {
            self.sort_direction = self.sort_direction.flipped();
        } else {
            self.sort_field = field;
            self.sort_direction = SortDirection::Ascending;
        }
    }

    pub fn set_filter(&mut self, filter: TypeFilter) {
        self.filter = filter;
    }

    /// Filter then sort. `sort_by` is stable, so equal keys keep source order.
    pub fn rows<'a>(&self, source: &'a [Transaction]) -> Vec<&'a Transaction> {
        let mut rows: Vec<&Transaction> = source.iter().filter(|t| self.filter.matches(t)).collect();
        rows.sort_by(|a, b| {
            let ord = compare_by(self.sort_field, a, b);
            match self.sort_direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        rows
    }

    /// Column header marker: arrow on the active column, neutral elsewhere.
    pub fn indicator(&self, field: SortField) -> &'static str {
        if self.sort_field == field {
            self.sort_direction.arrow()
        } else {
            "↕"
        }
    }
}

fn compare_by(field: SortField, a: &Transaction, b: &Transaction) -> Ordering {
    match field {
        SortField::Date => a.transaction_date.cmp(&b.transaction_date),
        SortField::Amount => a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal),
        SortField::Type => type_label(&a.transaction_type).cmp(type_label(&b.transaction_type)),
    }
}

/// `1 transaction` / `3 transactions`.
pub fn summary(count: usize) -> String {
    format!("{} transaction{}", count, if count == 1 { "" } else { "s" })
}

/// One page of table rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Zero-based.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice `rows` into pages of `per_page`. An out-of-range page is empty.
pub fn paginate<T: Clone>(rows: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_pages = rows.len().div_ceil(per_page);
    let items = rows
        .iter()
        .skip(page.saturating_mul(per_page))
        .take(per_page)
        .cloned()
        .collect();
    Page {
        items,
        page,
        total_pages,
        total_items: rows.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn tx(id: &str, t: TransactionType, amount: f64, offset_hours: i64) -> Transaction {
        Transaction::new(id, t, amount, t0() + Duration::hours(offset_hours))
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("a", TransactionType::Deposit, 300.0, 0),
            tx("b", TransactionType::TransferSent, 20.0, 5),
            tx("c", TransactionType::Withdrawal, 75.0, 2),
            tx("d", TransactionType::TransferReceived, 120.0, 9),
            tx("e", TransactionType::Deposit, 10.0, 7),
            tx("f", TransactionType::Other("FEE".into()), 1.5, 1),
            tx("g", TransactionType::TransferSent, 55.0, 3),
        ]
    }

    fn ids(rows: &[&Transaction]) -> Vec<String> {
        rows.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_recent_activity_top_five_newest_first() {
        let recent = recent_activity(&sample());
        let got: Vec<&str> = recent.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(got, vec!["d", "e", "b", "g", "c"]);
        for w in recent.windows(2) {
            assert!(w[0].transaction_date >= w[1].transaction_date);
        }
    }

    #[test]
    fn test_recent_activity_short_and_empty() {
        assert!(recent_activity(&[]).is_empty());
        let two = vec![tx("x", TransactionType::Deposit, 1.0, 0), tx("y", TransactionType::Deposit, 1.0, 1)];
        assert_eq!(recent_activity(&two).len(), 2);
    }

    #[test]
    fn test_default_table_is_date_descending() {
        let source = sample();
        let view = TableView::default();
        assert_eq!(ids(&view.rows(&source)), vec!["d", "e", "b", "g", "c", "f", "a"]);
    }

    #[test]
    fn test_amount_toggle_reverses_then_new_field_resets() {
        let source = sample();
        let mut view = TableView::default();

        view.toggle_sort(SortField::Amount);
        assert_eq!(view.sort_direction, SortDirection::Ascending);
        let asc = ids(&view.rows(&source));
        assert_eq!(asc, vec!["f", "e", "b", "g", "c", "d", "a"]);

        view.toggle_sort(SortField::Amount);
        assert_eq!(view.sort_direction, SortDirection::Descending);
        let mut desc = ids(&view.rows(&source));
        desc.reverse();
        assert_eq!(desc, asc);

        view.toggle_sort(SortField::Type);
        assert_eq!(view.sort_field, SortField::Type);
        assert_eq!(view.sort_direction, SortDirection::Ascending);
    }

    #[test]
    fn test_type_sort_uses_labels_and_is_stable() {
        let source = sample();
        let mut view = TableView::default();
        view.toggle_sort(SortField::Type);
        // Deposit < FEE < Money Received < Money Sent < Withdrawal
        assert_eq!(ids(&view.rows(&source)), vec!["a", "e", "f", "d", "b", "g", "c"]);
    }

    #[test]
    fn test_filter_subset_and_summary() {
        let source = sample();
        let mut view = TableView::default();
        view.set_filter(TypeFilter::Only(TransactionType::TransferSent));
        let rows = view.rows(&source);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|t| t.transaction_type == TransactionType::TransferSent));
        assert_eq!(summary(rows.len()), "2 transactions");

        view.set_filter(TypeFilter::Only(TransactionType::Withdrawal));
        assert_eq!(summary(view.rows(&source).len()), "1 transaction");

        view.set_filter(TypeFilter::All);
        assert_eq!(view.rows(&source).len(), source.len());
    }

    #[test]
    fn test_filtered_deposit_scenario() {
        let t = t0();
        let source = vec![
            Transaction::new("1", TransactionType::Withdrawal, 50.0, t),
            Transaction::new("2", TransactionType::Deposit, 200.0, t + Duration::days(1)),
        ];
        let mut view = TableView::default();
        view.set_filter(TypeFilter::Only(TransactionType::Deposit));
        let rows = view.rows(&source);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            crate::format::format_signed_amount(rows[0].amount, &rows[0].transaction_type),
            "+$200.00"
        );
        assert!(rows[0].transaction_date > t);
    }

    #[test]
    fn test_filter_parsing_and_cycle() {
        assert_eq!("all".parse::<TypeFilter>().unwrap(), TypeFilter::All);
        assert_eq!(
            "deposit".parse::<TypeFilter>().unwrap(),
            TypeFilter::Only(TransactionType::Deposit)
        );
        assert!("".parse::<TypeFilter>().is_err());

        let mut f = TypeFilter::All;
        for _ in 0..TypeFilter::options().len() {
            f = f.cycled();
        }
        assert_eq!(f, TypeFilter::All);
        assert_eq!(TypeFilter::All.cycled().label(), "Money Sent");
    }

    #[test]
    fn test_sort_field_parse() {
        assert_eq!("Amount".parse::<SortField>().unwrap(), SortField::Amount);
        assert_eq!("transactionDate".parse::<SortField>().unwrap(), SortField::Date);
        assert!("balance".parse::<SortField>().is_err());
    }

    #[test]
    fn test_paginate() {
        let rows: Vec<u32> = (0..7).collect();
        let p0 = paginate(&rows, 0, 3);
        assert_eq!(p0.items, vec![0, 1, 2]);
        assert_eq!(p0.total_pages, 3);
        assert_eq!(paginate(&rows, 2, 3).items, vec![6]);
        assert!(paginate(&rows, 5, 3).items.is_empty());
        assert_eq!(paginate::<u32>(&[], 0, 3).total_pages, 0);
    }
}
