#![allow(dead_code)]

use fleet_billing::config::TelemetryConfig;
use fleet_billing::models::Snapshot;
use serde_json::{json, Value};

pub const START_PATH: &str = "/api/vehicles/history/2021-02-01T00:00:00Z";
pub const END_PATH: &str = "/api/vehicles/history/2021-02-28T23:59:00Z";

pub const COROLLA_VIN: &str = "JH4DB7540SS801338";
pub const FIESTA_VIN: &str = "JTHBJ46G992339158";

pub fn record(vin: &str, plate: &str, make: &str, model: &str, meters: f64, as_at: &str) -> Value {
    json!({
        "vin": vin,
        "licensePlate": plate,
        "make": make,
        "model": model,
        "state": {
            "odometerInMeters": meters,
            "speedInMph": 0.0,
            "asAt": as_at
        }
    })
}

/// 起始快照: 只有 Corolla (Fiesta 缺失) 以及一辆非车队车辆
pub fn start_snapshot() -> Value {
    json!([
        record(COROLLA_VIN, "CBDH 789", "Toyota", "Corolla", 12_500_000.0, "2021-02-01T00:00:00Z"),
        record("WAUZZZ8V5KA000001", "OTHER 1", "Audi", "A3", 1_000.0, "2021-02-01T00:00:00Z"),
    ])
}

pub fn end_snapshot() -> Value {
    json!([
        record(COROLLA_VIN, "CBDH 789", "Toyota", "Corolla", 13_200_000.0, "2021-02-28T23:59:00Z"),
        record(FIESTA_VIN, "86532 AZE", "Ford", "Fiesta", 9_000_000.0, "2021-02-28T23:59:00Z"),
        record("WAUZZZ8V5KA000001", "OTHER 1", "Audi", "A3", 50_000.0, "2021-02-28T23:59:00Z"),
    ])
}

pub fn snapshot(value: Value) -> Snapshot {
    serde_json::from_value(value).unwrap()
}

pub fn telemetry_config(base_url: String) -> TelemetryConfig {
    TelemetryConfig {
        base_url,
        timeout_secs: 5,
    }
}
