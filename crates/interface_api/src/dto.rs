//! Request and response data transfer objects

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Currency, Money};
use domain_fulfillment::{PurchaseReceipt, PurchaseRequest, TravelerDetails};
use domain_policy::{PolicyState, StateEntry};
use domain_underwriting::QuoteRequest;

use crate::error::ApiError;

fn parse_currency(code: &str) -> Result<Currency, ApiError> {
    code.parse::<Currency>()
        .map_err(|e| ApiError::Validation(e.to_string()))
}

/// Quote request body
#[derive(Debug, Deserialize, Validate)]
pub struct QuoteRequestDto {
    pub trip_start: NaiveDate,
    pub trip_end: NaiveDate,
    #[validate(length(equal = 2))]
    pub departure_country: String,
    #[validate(length(min = 1))]
    pub destination_countries: Vec<String>,
    #[validate(range(min = 1, max = 3))]
    pub tier_level: u8,
    #[validate(length(min = 1))]
    pub locality_code: String,
    #[validate(range(min = 1))]
    pub traveler_count: u32,
}

impl QuoteRequestDto {
    pub fn into_domain(self) -> QuoteRequest {
        QuoteRequest {
            trip_start: self.trip_start,
            trip_end: self.trip_end,
            departure_country: self.departure_country,
            destination_countries: self.destination_countries,
            tier_level: self.tier_level,
            locality_code: self.locality_code,
            traveler_count: self.traveler_count,
        }
    }
}

/// Quote response body
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub amount: Decimal,
    pub currency: String,
}

impl QuoteResponse {
    pub fn from_price(price: Money) -> Self {
        Self {
            amount: price.amount(),
            currency: price.currency().code().to_string(),
        }
    }
}

/// Traveler details in a purchase request
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TravelerDto {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    pub birth_date: NaiveDate,
    #[validate(length(min = 1))]
    pub passport_number: String,
    #[validate(length(equal = 2))]
    pub passport_country: String,
}

/// Purchase request body
#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseRequestDto {
    #[validate(email)]
    pub email: String,
    pub trip_start: NaiveDate,
    pub trip_end: NaiveDate,
    #[validate(length(equal = 2))]
    pub departure_country: String,
    #[validate(length(min = 1))]
    pub destination_countries: Vec<String>,
    #[validate(range(min = 1, max = 3))]
    pub tier_level: u8,
    #[validate(length(min = 1))]
    pub locality_code: String,
    pub price_amount: Decimal,
    pub price_currency: String,
    #[validate(length(min = 1), nested)]
    pub travelers: Vec<TravelerDto>,
}

impl PurchaseRequestDto {
    pub fn into_domain(self) -> Result<PurchaseRequest, ApiError> {
        let currency = parse_currency(&self.price_currency)?;
        Ok(PurchaseRequest {
            email: self.email,
            trip_start: self.trip_start,
            trip_end: self.trip_end,
            departure_country: self.departure_country,
            destination_countries: self.destination_countries,
            tier_level: self.tier_level,
            locality_code: self.locality_code,
            quoted_price: Money::new(self.price_amount, currency),
            travelers: self
                .travelers
                .into_iter()
                .map(|t| TravelerDetails {
                    first_name: t.first_name,
                    last_name: t.last_name,
                    birth_date: t.birth_date,
                    passport_number: t.passport_number,
                    passport_country: t.passport_country,
                })
                .collect(),
        })
    }
}

/// Purchase response body
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub policy_id: Uuid,
    pub checkout_session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

impl From<PurchaseReceipt> for PurchaseResponse {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            policy_id: *receipt.policy.id.as_uuid(),
            checkout_session_id: receipt.checkout.id,
            checkout_url: receipt.checkout.url,
        }
    }
}

/// Checkout-completed notification body (webhook)
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentNotificationDto {
    pub policy_id: Uuid,
    #[validate(length(min = 1))]
    pub checkout_session_id: String,
    #[validate(length(min = 1))]
    pub payment_intent_id: String,
    /// Amount in the currency's minor units, as processors report it
    pub amount_minor: i64,
    pub currency: String,
}

impl PaymentNotificationDto {
    pub fn amount(&self) -> Result<Money, ApiError> {
        let currency = parse_currency(&self.currency)?;
        Ok(Money::from_minor(self.amount_minor, currency))
    }
}

/// Payment notification acknowledgement
#[derive(Debug, Serialize)]
pub struct PaymentNotificationResponse {
    pub outcome: &'static str,
}

/// Current state response body
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub policy_id: Uuid,
    pub state: PolicyState,
}

/// State history response body
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub policy_id: Uuid,
    pub entries: Vec<HistoryEntry>,
}

/// One history entry: variant name, timestamp, and the variant payload
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub state: PolicyState,
    pub recorded_at: DateTime<Utc>,
    pub detail: serde_json::Value,
}

impl From<StateEntry> for HistoryEntry {
    fn from(entry: StateEntry) -> Self {
        let mut detail = serde_json::to_value(&entry.detail).unwrap_or_default();
        // The variant tag is already carried by `state`
        if let Some(object) = detail.as_object_mut() {
            object.remove("type");
        }
        Self {
            state: entry.state,
            recorded_at: entry.recorded_at,
            detail,
        }
    }
}

/// Refund request body
#[derive(Debug, Deserialize, Validate)]
pub struct RefundRequestDto {
    #[validate(length(min = 1))]
    pub reason: String,
    #[validate(length(min = 1))]
    pub initiated_by: String,
}
