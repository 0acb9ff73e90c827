//! # Quant
//!
//! Market data access and portfolio construction.

pub mod market;
pub mod portfolio;
#[cfg(feature = "yahoo")]
pub mod yahoo;
