//! Underwriting port
//!
//! The fulfillment workflow depends on this trait, never on the HTTP adapter
//! directly, so tests can substitute a scripted implementation.

use async_trait::async_trait;

use domain_policy::{Policy, Traveler};

use crate::error::UnderwritingError;
use crate::types::{ContractOrder, Quote, QuoteRequest};

/// Operations offered by the external underwriting service
#[async_trait]
pub trait UnderwritingApi: Send + Sync {
    /// Prices a trip
    async fn quote_price(&self, request: &QuoteRequest) -> Result<Quote, UnderwritingError>;

    /// Creates an underwriting contract from policy and traveler data
    async fn create_contract(
        &self,
        policy: &Policy,
        travelers: &[Traveler],
    ) -> Result<ContractOrder, UnderwritingError>;

    /// Confirms a previously created contract
    async fn confirm_contract(&self, order_id: &str) -> Result<(), UnderwritingError>;

    /// Retrieves the policy document (PDF bytes) for a confirmed contract
    async fn fetch_document(&self, order_id: &str) -> Result<Vec<u8>, UnderwritingError>;

    /// Cancels a contract on the underwriter's side
    async fn cancel_contract(&self, order_id: &str) -> Result<(), UnderwritingError>;
}
