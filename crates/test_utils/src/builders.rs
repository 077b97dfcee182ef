//! Test data builders
//!
//! Builders fill every field with a plausible default so tests only state
//! what they care about.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use core_kernel::{Currency, EventId, Money, PolicyId};
use domain_fulfillment::{PurchaseRequest, TravelerDetails};
use domain_policy::{LifecycleEvent, RecordedEvent};

/// Builder for purchase requests
pub struct PurchaseRequestBuilder {
    request: PurchaseRequest,
}

impl Default for PurchaseRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PurchaseRequestBuilder {
    /// Creates a builder with a one-traveler European trip
    pub fn new() -> Self {
        Self {
            request: PurchaseRequest {
                email: "traveler@example.com".to_string(),
                trip_start: NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date"),
                trip_end: NaiveDate::from_ymd_opt(2025, 9, 14).expect("valid date"),
                departure_country: "GB".to_string(),
                destination_countries: vec!["FR".to_string()],
                tier_level: 2,
                locality_code: "EU".to_string(),
                quoted_price: Money::new(dec!(129.00), Currency::GBP),
                travelers: vec![TravelerDetailsBuilder::new().build()],
            },
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.request.email = email.into();
        self
    }

    pub fn with_tier_level(mut self, level: u8) -> Self {
        self.request.tier_level = level;
        self
    }

    pub fn with_price(mut self, price: Money) -> Self {
        self.request.quoted_price = price;
        self
    }

    pub fn with_travelers(mut self, travelers: Vec<TravelerDetails>) -> Self {
        self.request.travelers = travelers;
        self
    }

    pub fn build(self) -> PurchaseRequest {
        self.request
    }
}

/// Builder for traveler details
pub struct TravelerDetailsBuilder {
    traveler: TravelerDetails,
}

impl Default for TravelerDetailsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TravelerDetailsBuilder {
    pub fn new() -> Self {
        Self {
            traveler: TravelerDetails {
                first_name: "Alex".to_string(),
                last_name: "Morgan".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1990, 4, 12).expect("valid date"),
                passport_number: "123456789".to_string(),
                passport_country: "GB".to_string(),
            },
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.traveler.first_name = first.into();
        self.traveler.last_name = last.into();
        self
    }

    pub fn with_passport(
        mut self,
        number: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        self.traveler.passport_number = number.into();
        self.traveler.passport_country = country.into();
        self
    }

    pub fn build(self) -> TravelerDetails {
        self.traveler
    }
}

/// Builder for recorded events with explicit timestamps
///
/// Projection tests need control over recording time; this builder stamps
/// events at a fixed epoch plus an offset.
pub struct RecordedEventBuilder {
    policy_id: PolicyId,
    recorded_at: DateTime<Utc>,
}

impl RecordedEventBuilder {
    pub fn for_policy(policy_id: PolicyId) -> Self {
        Self {
            policy_id,
            recorded_at: Utc
                .with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    pub fn at_offset_secs(mut self, seconds: i64) -> Self {
        self.recorded_at = self.recorded_at + chrono::Duration::seconds(seconds);
        self
    }

    pub fn build(self, event: LifecycleEvent) -> RecordedEvent {
        RecordedEvent {
            id: EventId::new_v7(),
            policy_id: self.policy_id,
            recorded_at: self.recorded_at,
            event,
        }
    }
}
