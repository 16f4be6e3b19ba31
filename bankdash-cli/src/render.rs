//! Plain-text output for the one-shot commands.

use chrono::NaiveDateTime;

use bankdash_core::activity::{EMPTY_RECENT_HINT, EMPTY_RECENT_TITLE, EMPTY_TABLE_HINT, EMPTY_TABLE_TITLE};
use bankdash_core::format::description_or_placeholder;
use bankdash_core::{
    counterparty, format_relative_date, format_signed_amount, format_timestamp, summary, type_label,
    Page, Profile, SortField, TableView, Tone, Transaction,
};

pub fn recent_feed(recent: &[Transaction], now: NaiveDateTime) -> String {
    if recent.is_empty() {
        return format!("{EMPTY_RECENT_TITLE}\n{EMPTY_RECENT_HINT}\n");
    }
    let mut out = String::new();
    for tx in recent {
        out.push_str(&format!(
            "{} {:<15} {:<24} {:<12} {:>12}\n",
            Tone::of(&tx.transaction_type).glyph(),
            type_label(&tx.transaction_type),
            truncate(description_or_placeholder(tx), 24),
            format_relative_date(tx.transaction_date, now),
            format_signed_amount(tx.amount, &tx.transaction_type),
        ));
    }
    out
}

pub fn table(page: &Page<&Transaction>, view: &TableView) -> String {
    let mut out = String::new();
    out.push_str(&format!("Filter: {}\n", view.filter.label()));

    if page.items.is_empty() {
        if page.total_items > 0 {
            out.push_str(&format!(
                "Page {} is past the last page ({}). {}\n",
                page.page + 1,
                page.total_pages,
                summary(page.total_items)
            ));
        } else {
            out.push_str(&format!("{EMPTY_TABLE_TITLE}\n{EMPTY_TABLE_HINT}\n"));
        }
        return out;
    }

    out.push_str(&format!(
        "{:<24} {:<16} {:<24} {:<14} {:>12}\n",
        format!("Date {}", view.indicator(SortField::Date)),
        format!("Type {}", view.indicator(SortField::Type)),
        "Description",
        "Account",
        format!("Amount {}", view.indicator(SortField::Amount)),
    ));
    for tx in &page.items {
        out.push_str(&format!(
            "{:<24} {:<16} {:<24} {:<14} {:>12}\n",
            format_timestamp(tx.transaction_date),
            type_label(&tx.transaction_type),
            truncate(description_or_placeholder(tx), 24),
            counterparty(tx),
            format_signed_amount(tx.amount, &tx.transaction_type),
        ));
    }
    out.push_str(&format!("\n{}", summary(page.total_items)));
    if page.total_pages > 1 {
        out.push_str(&format!(" (page {} of {})", page.page + 1, page.total_pages));
    }
    out.push('\n');
    out
}

pub fn transaction_detail(tx: &Transaction) -> String {
    let mut out = format!(
        "Transaction {}\n  Type:        {}\n  Amount:      {}\n  Date:        {}\n  Description: {}\n  Account:     {}\n",
        tx.id,
        type_label(&tx.transaction_type),
        format_signed_amount(tx.amount, &tx.transaction_type),
        format_timestamp(tx.transaction_date),
        description_or_placeholder(tx),
        counterparty(tx),
    );
    if let Some(balance) = tx.balance_after_transaction {
        out.push_str(&format!("  Balance:     ${balance:.2}\n"));
    }
    if let Some(status) = &tx.status {
        out.push_str(&format!("  Status:      {}\n", status.as_wire()));
    }
    out
}

pub fn profile(p: &Profile) -> String {
    let mut out = format!("Username:       {}\n", p.username);
    if let Some(name) = &p.full_name {
        out.push_str(&format!("Full name:      {name}\n"));
    }
    if let Some(email) = &p.email {
        out.push_str(&format!("Email:          {email}\n"));
    }
    if let Some(acct) = &p.account_number {
        out.push_str(&format!("Account number: {acct}\n"));
    }
    if let Some(balance) = p.balance {
        out.push_str(&format!("Balance:        ${balance:.2}\n"));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
    t.push('…');
    t
}
