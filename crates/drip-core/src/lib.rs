//! # drip-core
//! Foundation types, fixed-point math and collaborator traits for the Drip
//! reward ledger.

pub mod constants;
pub mod error;
pub mod math;
pub mod traits;
pub mod types;

pub use primitive_types::{U256, U512};
