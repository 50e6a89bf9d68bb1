//! Scenario and property test suite for the Drip ledger.
//!
//! Integration tests live under `tests/` and drive the ledger through its
//! public API only, with in-memory tokens standing in for real custody.

pub mod helpers;
