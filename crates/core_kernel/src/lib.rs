//! Core Kernel - Foundational types for the travel policy system
//!
//! This crate provides the fundamental building blocks used across all domain
//! modules:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Common error types

pub mod money;
pub mod identifiers;
pub mod error;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{PolicyId, TravelerId, AccountId, EventId};
pub use error::CoreError;
