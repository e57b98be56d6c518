//! # adshelf core
//!
//! Storage-agnostic logic for adshelf: the ad data model, canonical
//! identity, dedup, filter composition, pagination, the store traits, and
//! the dashboard query that ties them together.
//!
//! This crate contains no tokio runtime, sqlx, or filesystem I/O.

pub mod dedup;
pub mod error;
pub mod filter;
pub mod identity;
pub mod models;
pub mod paginate;
pub mod query;
pub mod store;
