use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use bankdash_core::{
    AmountRequest, LoginRequest, Profile, RegisterRequest, SessionHandle, Transaction,
    TransferRequest,
};

use crate::envelope::decode_envelope;
use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// HTTP client for the banking API.
///
/// Holds the injected session so every request can carry the current bearer
/// token. It never mutates the session; reacting to `ApiError::Unauthorized`
/// is the caller's job.
#[derive(Debug, Clone)]
pub struct BankClient {
    http_client: HttpClient,
    base_url: String,
    session: SessionHandle,
}

impl BankClient {
    pub fn new(base_url: impl Into<String>, session: SessionHandle) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// JSON content type, plus `Authorization: Bearer` when a token is held.
    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.session.token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::Request(format!("bad auth header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, ApiError> {
        let headers = self.create_headers()?;
        let response = request
            .headers(headers)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let url = response.url().path().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        debug!(status, path = %url, "api response");
        let decoded = decode_envelope(status, &body);
        if let Err(e) = &decoded {
            warn!(status, path = %url, error = %e, "api call failed");
        }
        decoded
    }

    fn required<T>(value: Option<T>, what: &str) -> Result<T, ApiError> {
        value.ok_or_else(|| ApiError::Decode(format!("response had no {what}")))
    }

    // --- auth ---

    /// POST /auth/login, returning the bearer token.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<String, ApiError> {
        let req = self.http_client.post(self.url("/auth/login")).json(credentials);
        let token: Option<String> = self.send(req).await?;
        Self::required(token, "token")
    }

    /// POST /auth/register
    pub async fn register(&self, user: &RegisterRequest) -> Result<Profile, ApiError> {
        let req = self.http_client.post(self.url("/auth/register")).json(user);
        Self::required(self.send(req).await?, "user")
    }

    // --- user ---

    /// GET /user/balance. A null balance reads as zero.
    pub async fn get_balance(&self) -> Result<f64, ApiError> {
        let req = self.http_client.get(self.url("/user/balance"));
        let balance: Option<f64> = self.send(req).await?;
        Ok(balance.unwrap_or(0.0))
    }

    /// GET /user/profile
    pub async fn get_profile(&self) -> Result<Profile, ApiError> {
        let req = self.http_client.get(self.url("/user/profile"));
        Self::required(self.send(req).await?, "profile")
    }

    /// POST /user/deposit (legacy path). Returns the new balance when reported.
    pub async fn user_deposit(&self, amount: f64) -> Result<Option<f64>, ApiError> {
        let req = self
            .http_client
            .post(self.url("/user/deposit"))
            .json(&AmountRequest { amount });
        self.send(req).await
    }

    // --- transactions ---

    /// GET /transactions. A missing or null payload is an empty history.
    pub async fn get_history(&self) -> Result<Vec<Transaction>, ApiError> {
        let req = self.http_client.get(self.url("/transactions"));
        let txns: Option<Vec<Transaction>> = self.send(req).await?;
        Ok(txns.unwrap_or_default())
    }

    /// GET /transactions?page=&size=
    pub async fn get_history_page(&self, page: u32, size: u32) -> Result<Vec<Transaction>, ApiError> {
        let req = self
            .http_client
            .get(self.url("/transactions"))
            .query(&[("page", page), ("size", size)]);
        let txns: Option<Vec<Transaction>> = self.send(req).await?;
        Ok(txns.unwrap_or_default())
    }

    /// GET /transactions/all
    pub async fn get_all(&self) -> Result<Vec<Transaction>, ApiError> {
        let req = self.http_client.get(self.url("/transactions/all"));
        let txns: Option<Vec<Transaction>> = self.send(req).await?;
        Ok(txns.unwrap_or_default())
    }

    /// GET /transactions/{id}
    pub async fn get_by_id(&self, id: &str) -> Result<Transaction, ApiError> {
        let req = self.http_client.get(self.url(&format!("/transactions/{id}")));
        Self::required(self.send(req).await?, "transaction")
    }

    /// POST /transactions/transfer. The created record is returned when the
    /// server sends one we can read; its absence is not a failure.
    pub async fn transfer(&self, transfer: &TransferRequest) -> Result<Option<Transaction>, ApiError> {
        let req = self
            .http_client
            .post(self.url("/transactions/transfer"))
            .json(transfer);
        let data: Option<serde_json::Value> = self.send(req).await?;
        Ok(data.and_then(|v| serde_json::from_value(v).ok()))
    }

    /// POST /transactions/deposit
    pub async fn deposit(&self, amount: f64) -> Result<(), ApiError> {
        let req = self
            .http_client
            .post(self.url("/transactions/deposit"))
            .json(&AmountRequest { amount });
        let _: Option<serde_json::Value> = self.send(req).await?;
        Ok(())
    }

    /// POST /transactions/withdraw
    pub async fn withdraw(&self, amount: f64) -> Result<(), ApiError> {
        let req = self
            .http_client
            .post(self.url("/transactions/withdraw"))
            .json(&AmountRequest { amount });
        let _: Option<serde_json::Value> = self.send(req).await?;
        Ok(())
    }
}
