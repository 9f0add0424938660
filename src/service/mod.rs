pub mod bill_cache;
pub mod calculator;

pub use bill_cache::BillCache;
pub use calculator::{miles_from_meters, BillingCalculator};
