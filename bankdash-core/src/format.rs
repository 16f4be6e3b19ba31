//! Display formatting for transactions. Pure functions only.

use chrono::NaiveDateTime;

use crate::model::{Transaction, TransactionType};

const MILLIS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

/// Relative date used by the recent-activity feed.
///
/// The day count is the ceiling of the absolute difference in days, so
/// anything within the last 24h reads "Today", 24h-48h reads "Yesterday",
/// and so on. A timestamp equal to `now` yields a zero count and falls
/// through to "-1 days ago". Both boundaries are kept as-is.
pub fn format_relative_date(ts: NaiveDateTime, now: NaiveDateTime) -> String {
    let diff_ms = (now - ts).num_milliseconds().abs();
    let diff_days = (diff_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;

    match diff_days {
        1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        d if d <= 7 => format!("{} days ago", d - 1),
        _ => ts.format("%b %-d").to_string(),
    }
}

/// Full timestamp for the history table, e.g. `Jan 15, 2024, 10:30 AM`.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%b %-d, %Y, %I:%M %p").to_string()
}

/// `-$12.50` for money leaving the account, `+$12.50` otherwise.
pub fn format_signed_amount(amount: f64, transaction_type: &TransactionType) -> String {
    let sign = if transaction_type.is_outflow() { '-' } else { '+' };
    format!("{}${:.2}", sign, amount)
}

/// Balance card value; a missing balance shows as zero.
pub fn format_balance(balance: Option<f64>) -> String {
    format!("${:.2}", balance.unwrap_or(0.0))
}

pub fn type_label(transaction_type: &TransactionType) -> &str {
    match transaction_type {
        TransactionType::TransferSent => "Money Sent",
        TransactionType::TransferReceived => "Money Received",
        TransactionType::Deposit => "Deposit",
        TransactionType::Withdrawal => "Withdrawal",
        TransactionType::Other(raw) => raw,
    }
}

/// The other account involved, from the viewpoint of the current account.
pub fn counterparty(tx: &Transaction) -> &str {
    match tx.transaction_type {
        TransactionType::TransferSent => tx
            .recipient_account_number
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown"),
        TransactionType::TransferReceived => tx
            .sender_account_number
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown"),
        _ => "N/A",
    }
}

pub fn description_or_placeholder(tx: &Transaction) -> &str {
    tx.description
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("No description")
}

/// Visual category of a transaction: colour family plus a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Sent,
    Received,
    Deposit,
    Withdrawal,
    Neutral,
}

impl Tone {
    pub fn of(transaction_type: &TransactionType) -> Self {
        match transaction_type {
            TransactionType::TransferSent => Tone::Sent,
            TransactionType::TransferReceived => Tone::Received,
            TransactionType::Deposit => Tone::Deposit,
            TransactionType::Withdrawal => Tone::Withdrawal,
            TransactionType::Other(_) => Tone::Neutral,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Tone::Sent => "⇄",
            Tone::Received => "⇇",
            Tone::Deposit => "$",
            Tone::Withdrawal => "$",
            Tone::Neutral => "•",
        }
    }

    pub fn colour_name(&self) -> &'static str {
        match self {
            Tone::Sent => "red",
            Tone::Received => "green",
            Tone::Deposit => "blue",
            Tone::Withdrawal => "orange",
            Tone::Neutral => "gray",
        }
    }
}
