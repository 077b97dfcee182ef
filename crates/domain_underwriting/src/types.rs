//! Request and response types for the underwriting service

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::Money;

/// Parameters for pricing a trip
#[derive(Debug, Clone, Serialize)]
pub struct QuoteRequest {
    pub trip_start: NaiveDate,
    pub trip_end: NaiveDate,
    pub departure_country: String,
    pub destination_countries: Vec<String>,
    pub tier_level: u8,
    pub locality_code: String,
    pub traveler_count: u32,
}

/// A priced quote from the underwriter
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: Money,
}

/// The underwriter's record of an issued contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractOrder {
    pub order_id: String,
    pub policy_number: String,
    pub total_amount: Decimal,
}
