pub mod client;

pub use client::TelemetryClient;
