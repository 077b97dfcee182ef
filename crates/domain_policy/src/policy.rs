//! Policy and traveler records
//!
//! Both are created once at purchase time and never mutated; everything that
//! happens to a policy afterwards lives in the event log. A `Policy` plus the
//! services operating on it replace any notion of a self-mutating aggregate.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, Money, PolicyId, TravelerId};

use crate::error::PolicyError;

/// Coverage tiers offered for travel products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageTier {
    Basic,
    Plus,
    Premier,
}

impl CoverageTier {
    /// Parses the numeric tier level used on the wire (1-3)
    pub fn from_level(level: u8) -> Result<Self, PolicyError> {
        match level {
            1 => Ok(CoverageTier::Basic),
            2 => Ok(CoverageTier::Plus),
            3 => Ok(CoverageTier::Premier),
            other => Err(PolicyError::UnknownTier(other)),
        }
    }

    /// Returns the numeric tier level
    pub fn level(&self) -> u8 {
        match self {
            CoverageTier::Basic => 1,
            CoverageTier::Plus => 2,
            CoverageTier::Premier => 3,
        }
    }

    /// Returns the medical/cancellation coverage ceiling for this tier
    pub fn coverage_amount(&self) -> Decimal {
        match self {
            CoverageTier::Basic => dec!(50000),
            CoverageTier::Plus => dec!(150000),
            CoverageTier::Premier => dec!(500000),
        }
    }

    /// Returns the customer-facing tier label
    pub fn label(&self) -> &'static str {
        match self {
            CoverageTier::Basic => "Essential",
            CoverageTier::Plus => "Traveller Plus",
            CoverageTier::Premier => "Premier",
        }
    }
}

/// A purchased travel policy
///
/// Owned exclusively by its account. Immutable after creation; lifecycle
/// progress is recorded as events, not as field updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub account_id: AccountId,
    pub trip_start: NaiveDate,
    pub trip_end: NaiveDate,
    pub departure_country: String,
    pub destination_countries: Vec<String>,
    pub tier: CoverageTier,
    pub coverage_amount: Decimal,
    pub coverage_label: String,
    pub locality_code: String,
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

/// A traveler covered by a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traveler {
    pub id: TravelerId,
    pub policy_id: PolicyId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub passport_number: String,
    pub passport_country: String,
}

impl Traveler {
    /// Creates a traveler record after validating its fields
    pub fn new(
        policy_id: PolicyId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        birth_date: NaiveDate,
        passport_number: impl Into<String>,
        passport_country: impl Into<String>,
    ) -> Result<Self, PolicyError> {
        let first_name = first_name.into();
        let last_name = last_name.into();
        let passport_number = passport_number.into();
        let passport_country = passport_country.into();

        if first_name.trim().is_empty() || last_name.trim().is_empty() {
            return Err(PolicyError::validation("traveler name must not be empty"));
        }
        if passport_number.trim().is_empty() {
            return Err(PolicyError::validation("passport number must not be empty"));
        }
        validate_country_code(&passport_country)?;

        Ok(Self {
            id: TravelerId::new(),
            policy_id,
            first_name,
            last_name,
            birth_date,
            passport_number,
            passport_country,
        })
    }
}

/// Builder for a new policy
///
/// Validation happens in `build()`; a `Policy` value is always well-formed.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    account_id: Option<AccountId>,
    trip_start: Option<NaiveDate>,
    trip_end: Option<NaiveDate>,
    departure_country: Option<String>,
    destination_countries: Vec<String>,
    tier: Option<CoverageTier>,
    locality_code: Option<String>,
    price: Option<Money>,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn trip_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.trip_start = Some(start);
        self.trip_end = Some(end);
        self
    }

    pub fn departure_country(mut self, country: impl Into<String>) -> Self {
        self.departure_country = Some(country.into());
        self
    }

    pub fn destination_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.destination_countries = countries.into_iter().map(Into::into).collect();
        self
    }

    pub fn tier(mut self, tier: CoverageTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn locality_code(mut self, code: impl Into<String>) -> Self {
        self.locality_code = Some(code.into());
        self
    }

    pub fn price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }

    /// Validates the collected fields and produces the policy
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::Validation` for missing or inconsistent fields,
    /// `PolicyError::UnknownTier` never (tier is typed by this point).
    pub fn build(self) -> Result<Policy, PolicyError> {
        let account_id = self
            .account_id
            .ok_or_else(|| PolicyError::missing("account"))?;
        let trip_start = self
            .trip_start
            .ok_or_else(|| PolicyError::missing("trip_start"))?;
        let trip_end = self
            .trip_end
            .ok_or_else(|| PolicyError::missing("trip_end"))?;
        let departure_country = self
            .departure_country
            .ok_or_else(|| PolicyError::missing("departure_country"))?;
        let tier = self.tier.ok_or_else(|| PolicyError::missing("tier"))?;
        let locality_code = self
            .locality_code
            .ok_or_else(|| PolicyError::missing("locality_code"))?;
        let price = self.price.ok_or_else(|| PolicyError::missing("price"))?;

        if trip_end < trip_start {
            return Err(PolicyError::validation(
                "trip end date must not precede start date",
            ));
        }
        validate_country_code(&departure_country)?;
        if self.destination_countries.is_empty() {
            return Err(PolicyError::validation(
                "at least one destination country is required",
            ));
        }
        for country in &self.destination_countries {
            validate_country_code(country)?;
        }
        if !price.is_positive() {
            return Err(PolicyError::validation("price must be positive"));
        }

        Ok(Policy {
            id: PolicyId::new(),
            account_id,
            trip_start,
            trip_end,
            departure_country,
            destination_countries: self.destination_countries,
            tier,
            coverage_amount: tier.coverage_amount(),
            coverage_label: tier.label().to_string(),
            locality_code,
            price,
            created_at: Utc::now(),
        })
    }
}

fn validate_country_code(code: &str) -> Result<(), PolicyError> {
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(PolicyError::Validation(format!(
            "'{code}' is not an ISO 3166-1 alpha-2 country code"
        )))
    }
}
