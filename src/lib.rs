//! Migration runner library.
//!
//! Applies SQL migrations to a hosted Postgres service through its `exec_sql`
//! remote procedure, and checks connectivity to its REST endpoint.

pub mod commands;
pub mod config;
pub mod error;
pub mod migration;
pub mod models;
pub mod services;
