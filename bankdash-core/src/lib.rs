//! bankdash-core: transaction presentation, form validation and session types
//! for the bankdash client. No I/O lives here.

pub mod activity;
pub mod dashboard;
pub mod format;
pub mod model;
pub mod session;
pub mod transfer;

pub use activity::{
    paginate, recent_activity, recent_activity_n, summary, Page, SortDirection, SortField,
    TableView, TypeFilter, RECENT_LIMIT,
};
pub use dashboard::{AccountEvent, Dashboard, EventPublisher};
pub use format::{
    counterparty, format_balance, format_relative_date, format_signed_amount, format_timestamp,
    type_label, Tone,
};
pub use model::{
    AmountRequest, LoginRequest, Profile, RegisterRequest, Transaction, TransactionStatus,
    TransactionType, TransferRequest,
};
pub use session::{Session, SessionHandle, UserSummary};
pub use transfer::{
    validate_transfer, AmountAction, AmountForm, FormError, FormState, MessageKind, TransferField,
    TransferForm, ValidationError, MAX_TRANSFER_AMOUNT,
};
