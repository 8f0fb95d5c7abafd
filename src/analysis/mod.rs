//! Analysis modules.
//!
//! Statistics computed over projected shapes for the report.

pub mod aggregator;

pub use aggregator::*;
