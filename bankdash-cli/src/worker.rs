use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use bankdash_api::{ApiError, BankClient, LogoutHandler, UnauthorizedGuard};
use bankdash_core::{AmountAction, Transaction, TransferRequest};

#[derive(Debug, Clone)]
pub enum ApiRequest {
    /// Balance plus the full list backing the recent feed.
    Refresh,
    History,
    Transfer {
        request_id: u64,
        body: TransferRequest,
    },
    Amount {
        request_id: u64,
        action: AmountAction,
        amount: f64,
    },
}

#[derive(Debug, Clone)]
pub enum ApiEvent {
    Balance(Result<f64, ApiError>),
    Activity(Result<Vec<Transaction>, ApiError>),
    History(Result<Vec<Transaction>, ApiError>),
    TransferDone {
        request_id: u64,
        result: Result<(), ApiError>,
    },
    AmountDone {
        request_id: u64,
        action: AmountAction,
        result: Result<(), ApiError>,
    },
}

/// Runs every request as its own task; nothing is cancelled or de-duplicated.
/// Each result passes through the guard so a 401 logs out exactly once.
pub async fn run_worker<H>(
    mut rx: mpsc::UnboundedReceiver<ApiRequest>,
    tx: std::sync::mpsc::Sender<ApiEvent>,
    client: Arc<BankClient>,
    guard: Arc<UnauthorizedGuard<H>>,
) where
    H: LogoutHandler + 'static,
{
    while let Some(req) = rx.recv().await {
        debug!(?req, "worker request");
        let client = client.clone();
        let guard = guard.clone();
        let tx2 = tx.clone();

        match req {
            ApiRequest::Refresh => {
                let (c, g, t) = (client.clone(), guard.clone(), tx2.clone());
                tokio::spawn(async move {
                    let _ = t.send(ApiEvent::Balance(g.check(c.get_balance().await)));
                });
                tokio::spawn(async move {
                    let _ = tx2.send(ApiEvent::Activity(guard.check(client.get_history().await)));
                });
            }
            ApiRequest::History => {
                tokio::spawn(async move {
                    let _ = tx2.send(ApiEvent::History(guard.check(client.get_all().await)));
                });
            }
            ApiRequest::Transfer { request_id, body } => {
                tokio::spawn(async move {
                    let result = client.transfer(&body).await.map(|_| ());
                    let _ = tx2.send(ApiEvent::TransferDone {
                        request_id,
                        result: guard.check(result),
                    });
                });
            }
            ApiRequest::Amount {
                request_id,
                action,
                amount,
            } => {
                tokio::spawn(async move {
                    let result = match action {
                        AmountAction::Deposit => client.deposit(amount).await,
                        AmountAction::Withdrawal => client.withdraw(amount).await,
                    };
                    let _ = tx2.send(ApiEvent::AmountDone {
                        request_id,
                        action,
                        result: guard.check(result),
                    });
                });
            }
        }
    }
}
