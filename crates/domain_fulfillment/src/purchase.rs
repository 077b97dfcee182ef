//! Purchase orchestration
//!
//! Turns a validated quote into a policy awaiting payment. Each step is its
//! own failure domain: nothing is written for bad input; a checkout failure
//! leaves the policy row behind but writes no `PendingPayment` event, so the
//! purchase can simply be retried - there is never a pending state without a
//! real checkout session behind it.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use core_kernel::Money;
use domain_policy::{
    CoverageTier, EventStore, LifecycleEvent, Policy, PolicyBuilder, PolicyRepository, Traveler,
};

use crate::error::FulfillmentError;
use crate::ports::{AccountDirectory, CheckoutMetadata, CheckoutSession, PaymentGateway};

/// Traveler details as submitted with a purchase
#[derive(Debug, Clone)]
pub struct TravelerDetails {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub passport_number: String,
    pub passport_country: String,
}

/// A purchase submission: quote parameters, the quoted price, and travelers
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub email: String,
    pub trip_start: NaiveDate,
    pub trip_end: NaiveDate,
    pub departure_country: String,
    pub destination_countries: Vec<String>,
    pub tier_level: u8,
    pub locality_code: String,
    pub quoted_price: Money,
    pub travelers: Vec<TravelerDetails>,
}

/// Result of a successful purchase
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub policy: Policy,
    pub checkout: CheckoutSession,
}

/// Creates policies and opens their checkout sessions
pub struct PurchaseOrchestrator {
    accounts: Arc<dyn AccountDirectory>,
    policies: Arc<dyn PolicyRepository>,
    events: Arc<dyn EventStore>,
    payments: Arc<dyn PaymentGateway>,
}

impl PurchaseOrchestrator {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        policies: Arc<dyn PolicyRepository>,
        events: Arc<dyn EventStore>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            accounts,
            policies,
            events,
            payments,
        }
    }

    /// Runs the purchase: resolve account, persist policy and travelers,
    /// open checkout, record `PendingPayment`
    ///
    /// # Errors
    ///
    /// - `Validation` for bad input; nothing is written
    /// - `Account` when the directory cannot resolve the buyer
    /// - `PaymentGateway` when the checkout session cannot be opened; the
    ///   policy row persists, no event is written, and the caller should
    ///   treat the purchase as retryable
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn purchase(
        &self,
        request: PurchaseRequest,
    ) -> Result<PurchaseReceipt, FulfillmentError> {
        validate_request(&request)?;
        let tier = CoverageTier::from_level(request.tier_level)?;

        let account_id = self.accounts.resolve_or_create(&request.email).await?;

        let policy = PolicyBuilder::new()
            .account(account_id)
            .trip_dates(request.trip_start, request.trip_end)
            .departure_country(request.departure_country.clone())
            .destination_countries(request.destination_countries.clone())
            .tier(tier)
            .locality_code(request.locality_code.clone())
            .price(request.quoted_price)
            .build()?;

        let travelers = request
            .travelers
            .iter()
            .map(|t| {
                Traveler::new(
                    policy.id,
                    t.first_name.clone(),
                    t.last_name.clone(),
                    t.birth_date,
                    t.passport_number.clone(),
                    t.passport_country.clone(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.policies.insert(&policy, &travelers).await?;
        info!(policy_id = %policy.id, travelers = travelers.len(), "policy created");

        // Failure past this point must not leave a dangling pending state:
        // the event is appended only once the session exists.
        let checkout = self
            .payments
            .create_checkout_session(
                policy.price,
                CheckoutMetadata {
                    policy_id: policy.id,
                },
            )
            .await?;

        self.events
            .append(
                policy.id,
                LifecycleEvent::PendingPayment {
                    checkout_session_id: checkout.id.clone(),
                },
            )
            .await?;
        info!(policy_id = %policy.id, session = %checkout.id, "checkout opened");

        Ok(PurchaseReceipt { policy, checkout })
    }
}

fn validate_request(request: &PurchaseRequest) -> Result<(), FulfillmentError> {
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(FulfillmentError::validation("a valid email is required"));
    }
    if request.travelers.is_empty() {
        return Err(FulfillmentError::validation(
            "at least one traveler is required",
        ));
    }
    if !request.quoted_price.is_positive() {
        return Err(FulfillmentError::validation(
            "quoted price must be positive",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn request() -> PurchaseRequest {
        PurchaseRequest {
            email: "buyer@example.com".to_string(),
            trip_start: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            trip_end: NaiveDate::from_ymd_opt(2025, 9, 8).unwrap(),
            departure_country: "US".to_string(),
            destination_countries: vec!["MX".to_string()],
            tier_level: 1,
            locality_code: "AMER".to_string(),
            quoted_price: Money::new(dec!(59.00), Currency::USD),
            travelers: vec![TravelerDetails {
                first_name: "Sam".to_string(),
                last_name: "Rivera".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1991, 5, 20).unwrap(),
                passport_number: "542019881".to_string(),
                passport_country: "US".to_string(),
            }],
        }
    }

    #[test]
    fn test_validate_rejects_missing_email() {
        let mut bad = request();
        bad.email = "not-an-email".to_string();
        assert!(validate_request(&bad).is_err());
    }

    #[test]
    fn test_validate_rejects_no_travelers() {
        let mut bad = request();
        bad.travelers.clear();
        assert!(validate_request(&bad).is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(validate_request(&request()).is_ok());
    }
}
