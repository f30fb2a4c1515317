//! RPC E2E test suite.
//!
//! Drives the migration runner against an in-process mock PostgREST server.
//! No database or network access is needed.
//!
//! Run with: cargo test --test rpc_e2e

mod mock_postgrest;

mod test_cli;
