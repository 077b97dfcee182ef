//! HTTP adapter for the underwriting service
//!
//! Transport policy: idempotent network-level failures (timeouts, connection
//! errors, 429, 5xx) are retried with bounded exponential backoff. Explicit
//! rejection payloads are business answers, not transport noise - they are
//! surfaced immediately and never retried here.
//!
//! The document endpoint returns PDF bytes on success and a JSON error
//! envelope on failure without a reliable content type, so the body is
//! sniffed.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use core_kernel::{Currency, Money};
use domain_policy::{Policy, Traveler};

use crate::error::UnderwritingError;
use crate::ports::UnderwritingApi;
use crate::types::{ContractOrder, Quote, QuoteRequest};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Retry bounds for transient transport failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Ceiling applied to the doubled delay
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry following `attempt` (1-based), doubling each time
    fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Configuration for the underwriting HTTP client
#[derive(Debug, Clone)]
pub struct UnderwritingConfig {
    /// Base URL of the underwriting API (e.g. "https://uw.example.com/api")
    pub base_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Transport retry bounds
    pub retry: RetryPolicy,
}

impl Default for UnderwritingConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

/// HTTP client for the underwriting service
#[derive(Debug, Clone)]
pub struct HttpUnderwritingClient {
    client: Client,
    config: UnderwritingConfig,
}

impl HttpUnderwritingClient {
    /// Creates a client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns `UnderwritingError::Protocol` if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: UnderwritingConfig) -> Result<Self, UnderwritingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UnderwritingError::protocol(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.config.api_key)
    }

    /// Sends a request, retrying transient transport failures with backoff
    ///
    /// The closure rebuilds the request for each attempt. Business rejections
    /// and auth failures short-circuit; only timeouts, connection errors,
    /// 429 and 5xx consume the retry budget.
    async fn send_with_retry<F>(
        &self,
        operation: &'static str,
        make_request: F,
    ) -> Result<Response, UnderwritingError>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = self.authorized(make_request()).send().await;

            let retryable_message = match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!(operation, attempt, "underwriting call succeeded");
                        return Ok(response);
                    }
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(UnderwritingError::Unauthorized);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        format!("{operation} returned {status}")
                    } else {
                        // Any other 4xx carries a business rejection payload
                        return Err(rejection_from_response(response).await);
                    }
                }
                Err(err) if err.is_timeout() || err.is_connect() => {
                    format!("{operation} transport failure: {err}")
                }
                Err(err) => return Err(UnderwritingError::protocol(err.to_string())),
            };

            if attempt >= max_attempts {
                return Err(UnderwritingError::Transient {
                    message: retryable_message,
                    attempts: attempt,
                });
            }

            let delay = self.config.retry.delay(attempt);
            warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying underwriting call: {retryable_message}"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl UnderwritingApi for HttpUnderwritingClient {
    async fn quote_price(&self, request: &QuoteRequest) -> Result<Quote, UnderwritingError> {
        let response = self
            .send_with_retry("quote_price", || {
                self.client.post(self.url("v1/quotes")).json(request)
            })
            .await?;

        let body: QuoteResponse = response
            .json()
            .await
            .map_err(|e| UnderwritingError::protocol(e.to_string()))?;
        let currency = Currency::from_str(&body.currency)
            .map_err(|e| UnderwritingError::protocol(e.to_string()))?;

        Ok(Quote {
            price: Money::new(body.amount, currency),
        })
    }

    async fn create_contract(
        &self,
        policy: &Policy,
        travelers: &[Traveler],
    ) -> Result<ContractOrder, UnderwritingError> {
        let body = CreateOrderRequest::from_policy(policy, travelers);
        let response = self
            .send_with_retry("create_contract", || {
                self.client.post(self.url("v1/orders")).json(&body)
            })
            .await?;

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| UnderwritingError::protocol(e.to_string()))?;

        Ok(ContractOrder {
            order_id: order.order_id,
            policy_number: order.policy_number,
            total_amount: order.total_amount,
        })
    }

    async fn confirm_contract(&self, order_id: &str) -> Result<(), UnderwritingError> {
        let path = format!("v1/orders/{order_id}/confirm");
        self.send_with_retry("confirm_contract", || self.client.post(self.url(&path)))
            .await?;
        Ok(())
    }

    async fn fetch_document(&self, order_id: &str) -> Result<Vec<u8>, UnderwritingError> {
        let path = format!("v1/orders/{order_id}/document");
        let response = self
            .send_with_retry("fetch_document", || self.client.get(self.url(&path)))
            .await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UnderwritingError::protocol(e.to_string()))?;

        // The endpoint reports errors as JSON bodies under a success-ish
        // transport; only a PDF magic number counts as a document.
        if bytes.starts_with(PDF_MAGIC) {
            return Ok(bytes.to_vec());
        }
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&bytes) {
            return Err(UnderwritingError::rejected(
                envelope.error.code,
                envelope.error.message,
            ));
        }
        Err(UnderwritingError::protocol(format!(
            "document endpoint returned {} bytes of neither PDF nor error JSON",
            bytes.len()
        )))
    }

    async fn cancel_contract(&self, order_id: &str) -> Result<(), UnderwritingError> {
        let path = format!("v1/orders/{order_id}/cancel");
        self.send_with_retry("cancel_contract", || self.client.post(self.url(&path)))
            .await?;
        Ok(())
    }
}

/// Builds a rejection from a non-retryable error response
async fn rejection_from_response(response: Response) -> UnderwritingError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
        Ok(envelope) => UnderwritingError::rejected(envelope.error.code, envelope.error.message),
        Err(_) => UnderwritingError::rejected(
            None,
            format!("{status}: {}", String::from_utf8_lossy(&bytes)),
        ),
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    amount: Decimal,
    currency: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    external_reference: String,
    tier_level: u8,
    locality_code: String,
    trip_start: chrono::NaiveDate,
    trip_end: chrono::NaiveDate,
    departure_country: String,
    destination_countries: Vec<String>,
    travelers: Vec<OrderTraveler>,
}

impl CreateOrderRequest {
    fn from_policy(policy: &Policy, travelers: &[Traveler]) -> Self {
        Self {
            external_reference: policy.id.to_string(),
            tier_level: policy.tier.level(),
            locality_code: policy.locality_code.clone(),
            trip_start: policy.trip_start,
            trip_end: policy.trip_end,
            departure_country: policy.departure_country.clone(),
            destination_countries: policy.destination_countries.clone(),
            travelers: travelers.iter().map(OrderTraveler::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OrderTraveler {
    first_name: String,
    last_name: String,
    birth_date: chrono::NaiveDate,
    passport_number: String,
    passport_country: String,
}

impl From<&Traveler> for OrderTraveler {
    fn from(traveler: &Traveler) -> Self {
        Self {
            first_name: traveler.first_name.clone(),
            last_name: traveler.last_name.clone(),
            birth_date: traveler.birth_date,
            passport_number: traveler.passport_number.clone(),
            passport_country: traveler.passport_country.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    order_id: String,
    policy_number: String,
    total_amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 350,
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(350));
        assert_eq!(policy.delay(4), Duration::from_millis(350));
    }

    #[test]
    fn test_url_join() {
        let client = HttpUnderwritingClient::new(UnderwritingConfig {
            base_url: "https://uw.example.com/api/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.url("v1/quotes"), "https://uw.example.com/api/v1/quotes");
    }

    #[test]
    fn test_error_envelope_parsing() {
        let body = br#"{"error":{"code":"INVALID_PASSPORT","message":"passport expired"}}"#;
        let envelope: ErrorEnvelope = serde_json::from_slice(body).unwrap();
        assert_eq!(envelope.error.code.as_deref(), Some("INVALID_PASSPORT"));
        assert_eq!(envelope.error.message, "passport expired");
    }
}
