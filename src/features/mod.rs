//! Optional feature endpoints gated by configuration.

pub mod bureau;
pub mod npa;

pub use bureau::{BureauReport, BureauRequest};
pub use npa::NpaSummary;
