pub mod api;
pub mod config;
pub mod error;
pub mod formatter;
pub mod models;
pub mod service;
pub mod telemetry;

pub use api::AppState;
pub use config::{AppConfig, BillingPeriod, FleetProfile};
pub use error::{AppError, FormatError, TelemetryError};
pub use formatter::{format_bill, get_file_info, FormattedBill};
pub use service::{BillCache, BillingCalculator};
pub use telemetry::TelemetryClient;
