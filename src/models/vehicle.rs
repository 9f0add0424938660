use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 车辆在某一时刻的状态 (VehicleState)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleState {
    pub odometer_in_meters: f64, // 里程表读数 (米)
    pub speed_in_mph: f64,       // 计费不使用
    pub as_at: DateTime<Utc>,
}

/// 车辆记录 (VehicleRecord)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub vin: String,           // 全局唯一, 跨快照稳定
    pub license_plate: String, // 车队过滤用
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub state: Option<VehicleState>, // 遥测方在该时刻无读数时为空
}

/// 某一时刻的车队快照
pub type Snapshot = Vec<VehicleRecord>;
