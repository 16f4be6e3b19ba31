//! bankdash-api: HTTP client for the banking backend.

pub mod client;
pub mod envelope;
pub mod error;
pub mod intercept;

pub use client::{BankClient, DEFAULT_BASE_URL};
pub use envelope::{decode_envelope, ApiResponse};
pub use error::ApiError;
pub use intercept::{LogoutHandler, UnauthorizedGuard};
