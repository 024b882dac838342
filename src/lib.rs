//! Small-business tax estimation: classify transactions into tax buckets, estimate
//! federal, state, self-employment, payroll and sales tax for a period, and score how
//! trustworthy the estimate is.

pub mod core;
pub mod tax;

pub use crate::core::{aggregate, classify};
pub use crate::tax::{estimate, score};
