//! Casewatch Core: domain types, source fetching, normalization, aggregation.
//!
//! This crate contains everything below the refresh coordinator:
//! - Domain types (region keys, case and economic series, snapshots)
//! - Expiry-aware fetching with an on-disk payload cache
//! - Dataset repository sync through a pluggable backend
//! - CSV parsing and per-region normalization
//! - Rolling-window, ratio and cumulative-excess computations
//! - Static reference tables

pub mod aggregate;
pub mod data;
pub mod domain;
pub mod reference;
