//! HTTP adapter for the payment processor
//!
//! The processor speaks a form-encoded API with amounts in minor units.
//! Checkout-completed notifications come back over a webhook, handled by
//! `PaymentConfirmation`; this adapter only opens sessions and issues
//! refunds.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use core_kernel::Money;

use crate::ports::{
    CheckoutMetadata, CheckoutSession, PaymentError, PaymentGateway, RefundReceipt,
};

/// Configuration for the payment processor client
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Base URL of the processor API
    pub base_url: String,
    /// Secret key sent as a bearer token
    pub secret_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            secret_key: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Payment processor client
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    config: PaymentConfig,
}

impl HttpPaymentGateway {
    /// Creates a gateway client with the given configuration
    pub fn new(config: PaymentConfig) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Connection(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_checkout_session(
        &self,
        amount: Money,
        metadata: CheckoutMetadata,
    ) -> Result<CheckoutSession, PaymentError> {
        let minor = amount
            .to_minor_units()
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;

        let response = self
            .client
            .post(self.url("v1/checkout/sessions"))
            .bearer_auth(&self.config.secret_key)
            .form(&[
                ("amount", minor.to_string()),
                ("currency", amount.currency().code().to_lowercase()),
                ("metadata[policy_id]", metadata.policy_id.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PaymentError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!("{status}: {body}")));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;
        info!(session = %session.id, "checkout session opened");

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount: Money,
    ) -> Result<RefundReceipt, PaymentError> {
        let minor = amount
            .to_minor_units()
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;

        let response = self
            .client
            .post(self.url("v1/refunds"))
            .bearer_auth(&self.config.secret_key)
            .form(&[
                ("payment_intent", payment_intent_id.to_string()),
                ("amount", minor.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PaymentError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!("{status}: {body}")));
        }

        let refund: RefundResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;
        info!(refund = %refund.id, "refund created");

        Ok(RefundReceipt {
            refund_id: refund.id,
            amount,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
}
