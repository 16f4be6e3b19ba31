//! Wire-level records returned by the banking API.
//!
//! Everything here is read-only on the client: records are built by serde from
//! server JSON and never mutated afterwards.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Ledger entry category.
///
/// The server enum is open-ended; anything outside the four known values is
/// kept verbatim in `Other` so a new server-side type never breaks decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionType {
    TransferSent,
    TransferReceived,
    Deposit,
    Withdrawal,
    Other(String),
}

impl TransactionType {
    pub const KNOWN: [TransactionType; 4] = [
        TransactionType::TransferSent,
        TransactionType::TransferReceived,
        TransactionType::Deposit,
        TransactionType::Withdrawal,
    ];

    /// Parse the server's wire name. Never fails.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "TRANSFER_SENT" => TransactionType::TransferSent,
            "TRANSFER_RECEIVED" => TransactionType::TransferReceived,
            "DEPOSIT" => TransactionType::Deposit,
            "WITHDRAWAL" => TransactionType::Withdrawal,
            other => TransactionType::Other(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            TransactionType::TransferSent => "TRANSFER_SENT",
            TransactionType::TransferReceived => "TRANSFER_RECEIVED",
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Other(raw) => raw,
        }
    }

    /// Money leaving the account renders negative.
    pub fn is_outflow(&self) -> bool {
        matches!(
            self,
            TransactionType::TransferSent | TransactionType::Withdrawal
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl Serialize for TransactionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TransactionType::from_wire(&raw))
    }
}

/// Settlement state reported by the server. Open-ended like the type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Other(String),
}

impl TransactionStatus {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "PENDING" => TransactionStatus::Pending,
            "COMPLETED" => TransactionStatus::Completed,
            "FAILED" => TransactionStatus::Failed,
            other => TransactionStatus::Other(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Other(raw) => raw,
        }
    }
}

impl Serialize for TransactionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for TransactionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TransactionStatus::from_wire(&raw))
    }
}

/// A ledger entry as returned by `GET /transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub transaction_type: TransactionType,
    /// Always a non-negative magnitude; the sign comes from the type.
    pub amount: f64,
    #[serde(with = "wire_datetime")]
    pub transaction_date: NaiveDateTime,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recipient_account_number: Option<String>,
    #[serde(default)]
    pub sender_account_number: Option<String>,
    #[serde(default)]
    pub balance_after_transaction: Option<f64>,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        transaction_type: TransactionType,
        amount: f64,
        transaction_date: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            transaction_type,
            amount,
            transaction_date,
            description: None,
            recipient_account_number: None,
            sender_account_number: None,
            balance_after_transaction: None,
            status: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_recipient(mut self, account: impl Into<String>) -> Self {
        self.recipient_account_number = Some(account.into());
        self
    }

    pub fn with_sender(mut self, account: impl Into<String>) -> Self {
        self.sender_account_number = Some(account.into());
        self
    }
}

/// `GET /user/profile` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
}

/// Body for `POST /transactions/transfer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub recipient_account_number: String,
    pub amount: f64,
    pub description: String,
}

/// Body for the deposit and withdraw endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountRequest {
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Num(i64),
    Str(String),
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Num(n) => n.to_string(),
        IdRepr::Str(s) => s,
    })
}

/// Timestamps arrive zone-less (`2024-01-15T10:30:00`) from the server and are
/// taken as local time. RFC 3339 strings are converted to local time.
pub mod wire_datetime {
    use super::*;

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT) {
            return Some(ndt);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Local).naive_local())
    }

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
