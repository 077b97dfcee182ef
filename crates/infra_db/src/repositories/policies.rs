//! Policy, traveler, and account persistence on PostgreSQL

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use core_kernel::{AccountId, Currency, Money, PolicyId, TravelerId};
use domain_fulfillment::{AccountDirectory, AccountError};
use domain_policy::{CoverageTier, Policy, PolicyRepository, StoreError, Traveler};

use crate::error::DatabaseError;
use crate::pool::DatabasePool;

/// Policy and traveler repository backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgPolicyRepository {
    pool: DatabasePool,
}

impl PgPolicyRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyRepository for PgPolicyRepository {
    async fn insert(&self, policy: &Policy, travelers: &[Traveler]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        sqlx::query(
            r#"
            INSERT INTO policies (
                id, account_id, trip_start, trip_end, departure_country,
                destination_countries, tier_level, coverage_amount, coverage_label,
                locality_code, price_amount, price_currency, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(policy.id.as_uuid())
        .bind(policy.account_id.as_uuid())
        .bind(policy.trip_start)
        .bind(policy.trip_end)
        .bind(&policy.departure_country)
        .bind(&policy.destination_countries)
        .bind(i16::from(policy.tier.level()))
        .bind(policy.coverage_amount)
        .bind(&policy.coverage_label)
        .bind(&policy.locality_code)
        .bind(policy.price.amount())
        .bind(policy.price.currency().code())
        .bind(policy.created_at)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from)?;

        for traveler in travelers {
            sqlx::query(
                r#"
                INSERT INTO travelers (
                    id, policy_id, first_name, last_name, birth_date,
                    passport_number, passport_country
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(traveler.id.as_uuid())
            .bind(traveler.policy_id.as_uuid())
            .bind(&traveler.first_name)
            .bind(&traveler.last_name)
            .bind(traveler.birth_date)
            .bind(&traveler.passport_number)
            .bind(&traveler.passport_country)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        debug!(policy_id = %policy.id, travelers = travelers.len(), "policy inserted");
        Ok(())
    }

    async fn get(
        &self,
        policy_id: PolicyId,
    ) -> Result<Option<(Policy, Vec<Traveler>)>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, trip_start, trip_end, departure_country,
                   destination_countries, tier_level, locality_code,
                   price_amount, price_currency, created_at
            FROM policies
            WHERE id = $1
            "#,
        )
        .bind(policy_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let policy = policy_from_row(&row)?;

        let traveler_rows = sqlx::query(
            r#"
            SELECT id, policy_id, first_name, last_name, birth_date,
                   passport_number, passport_country
            FROM travelers
            WHERE policy_id = $1
            "#,
        )
        .bind(policy_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let travelers = traveler_rows
            .iter()
            .map(traveler_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some((policy, travelers)))
    }

    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Policy>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, trip_start, trip_end, departure_country,
                   destination_countries, tier_level, locality_code,
                   price_amount, price_currency, created_at
            FROM policies
            WHERE account_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.iter().map(policy_from_row).collect()
    }
}

fn policy_from_row(row: &sqlx::postgres::PgRow) -> Result<Policy, StoreError> {
    let id: Uuid = row.get("id");
    let account_id: Uuid = row.get("account_id");
    let trip_start: NaiveDate = row.get("trip_start");
    let trip_end: NaiveDate = row.get("trip_end");
    let departure_country: String = row.get("departure_country");
    let destination_countries: Vec<String> = row.get("destination_countries");
    let tier_level: i16 = row.get("tier_level");
    let locality_code: String = row.get("locality_code");
    let price_amount: Decimal = row.get("price_amount");
    let price_currency: String = row.get("price_currency");
    let created_at: DateTime<Utc> = row.get("created_at");

    let tier = CoverageTier::from_level(
        u8::try_from(tier_level)
            .map_err(|_| StoreError::serialization(format!("tier level {tier_level}")))?,
    )
    .map_err(|e| StoreError::serialization(e.to_string()))?;
    let currency = Currency::from_str(&price_currency)
        .map_err(|e| StoreError::serialization(e.to_string()))?;

    Ok(Policy {
        id: PolicyId::from(id),
        account_id: AccountId::from(account_id),
        trip_start,
        trip_end,
        departure_country,
        destination_countries,
        tier,
        coverage_amount: tier.coverage_amount(),
        coverage_label: tier.label().to_string(),
        locality_code,
        price: Money::new(price_amount, currency),
        created_at,
    })
}

fn traveler_from_row(row: &sqlx::postgres::PgRow) -> Result<Traveler, StoreError> {
    let id: Uuid = row.get("id");
    let policy_id: Uuid = row.get("policy_id");

    Ok(Traveler {
        id: TravelerId::from(id),
        policy_id: PolicyId::from(policy_id),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        birth_date: row.get("birth_date"),
        passport_number: row.get("passport_number"),
        passport_country: row.get("passport_country"),
    })
}

/// Account directory backed by the shared application database
///
/// Account management proper lives elsewhere in the application; this
/// adapter only resolves or creates the row the purchase needs.
#[derive(Debug, Clone)]
pub struct PgAccountDirectory {
    pool: DatabasePool,
}

impl PgAccountDirectory {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn resolve_or_create(&self, email: &str) -> Result<AccountId, AccountError> {
        let row = sqlx::query(
            r#"
            INSERT INTO accounts (id, email)
            VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AccountError(e.to_string()))?;

        let id: Uuid = row.get("id");
        Ok(AccountId::from(id))
    }
}
