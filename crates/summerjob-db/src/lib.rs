//! Persistence layer for the summerjob planning engine.
//!
//! Holds the PostgreSQL schema (embedded migrations), pool construction,
//! row models and one query module per table group.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
