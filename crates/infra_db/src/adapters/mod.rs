//! Non-database adapters for the storage ports

pub mod memory;
