use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 账单明细行 (BillLineItem) - 只由一对匹配的车辆记录推导
#[derive(Debug, Clone, PartialEq)]
pub struct BillLineItem {
    pub vin: String,
    pub license_plate: String,
    pub make: String,
    pub model: String,
    pub start_odometer_miles: BigDecimal, // 起始里程 (英里, 2位小数)
    pub end_odometer_miles: BigDecimal,   // 结束里程 (英里, 2位小数)
    pub miles_travelled: BigDecimal,      // 行驶里程, 非负
    pub cost: BigDecimal,                 // 费用 (2位小数)
}

/// 账单 (Bill) - 所有格式化器的唯一输入
#[derive(Debug, Clone, PartialEq)]
pub struct Bill {
    pub billing_period_start: DateTime<Utc>,
    pub billing_period_end: DateTime<Utc>,
    pub customer_name: String,
    pub cost_per_mile: BigDecimal,
    pub vehicles: Vec<BillLineItem>,
    pub total_miles: BigDecimal,
    pub total_cost: BigDecimal,
    pub generated_at: DateTime<Utc>, // 计算时刻, 不是账期时刻
}

/// 快照方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSide {
    Start,
    End,
}

/// 对账诊断信息: 数据异常只降级, 不报错
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillNotice {
    /// 起始快照中找不到该 VIN, 车辆被跳过
    MissingStartVehicle { vin: String, license_plate: String },
    /// 任一侧缺少状态读数, 车辆被跳过
    MissingState {
        vin: String,
        license_plate: String,
        side: SnapshotSide,
    },
    /// 里程表读数不是有限数, 车辆被跳过
    InvalidOdometer { vin: String, side: SnapshotSide },
    /// 里程表回退, 行驶里程按 0 计
    NegativeDistance { vin: String, meters: f64 },
}

impl BillNotice {
    pub fn vin(&self) -> &str {
        match self {
            Self::MissingStartVehicle { vin, .. }
            | Self::MissingState { vin, .. }
            | Self::InvalidOdometer { vin, .. }
            | Self::NegativeDistance { vin, .. } => vin,
        }
    }

    /// 该车辆是否从账单中被省略
    pub fn is_skip(&self) -> bool {
        !matches!(self, Self::NegativeDistance { .. })
    }
}

/// 计算结果: 账单 + 每辆车的诊断信息
#[derive(Debug, Clone, PartialEq)]
pub struct BillOutcome {
    pub bill: Bill,
    pub notices: Vec<BillNotice>,
}

impl BillOutcome {
    /// 被跳过的 VIN 列表
    pub fn skipped_vins(&self) -> Vec<&str> {
        self.notices
            .iter()
            .filter(|n| n.is_skip())
            .map(BillNotice::vin)
            .collect()
    }
}
