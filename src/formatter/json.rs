use super::format_uk_date;
use crate::error::FormatError;
use crate::models::{Bill, BillLineItem};
use crate::service::calculator::round_half_up;
use bigdecimal::BigDecimal;
use serde::Serialize;

/// JSON 账单文档, 字段与 Bill 模型一一对应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDocument {
    pub billing_period_start: String,
    pub billing_period_end: String,
    pub customer_name: String,
    pub cost_per_mile: f64,
    pub total_miles: f64,
    pub total_cost: f64,
    pub generated_at: String,
    pub vehicles: Vec<LineItemDocument>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDocument {
    pub license_plate: String,
    pub vin: String,
    pub make: String,
    pub model: String,
    pub start_odometer_miles: f64,
    pub end_odometer_miles: f64,
    pub miles_travelled: f64,
    pub cost: f64,
}

impl From<&Bill> for BillDocument {
    fn from(bill: &Bill) -> Self {
        Self {
            billing_period_start: format_uk_date(&bill.billing_period_start),
            billing_period_end: format_uk_date(&bill.billing_period_end),
            customer_name: bill.customer_name.clone(),
            cost_per_mile: number(&bill.cost_per_mile, 2),
            total_miles: number(&bill.total_miles, 2),
            total_cost: number(&bill.total_cost, 2),
            generated_at: format_uk_date(&bill.generated_at),
            vehicles: bill.vehicles.iter().map(LineItemDocument::from).collect(),
        }
    }
}

impl From<&BillLineItem> for LineItemDocument {
    fn from(line: &BillLineItem) -> Self {
        Self {
            license_plate: line.license_plate.clone(),
            vin: line.vin.clone(),
            make: line.make.clone(),
            model: line.model.clone(),
            start_odometer_miles: number(&line.start_odometer_miles, 2),
            end_odometer_miles: number(&line.end_odometer_miles, 2),
            miles_travelled: number(&line.miles_travelled, 2),
            cost: number(&line.cost, 2),
        }
    }
}

/// 十进制 -> JSON number (经字符串转换, 避免二进制误差)
fn number(value: &BigDecimal, places: i64) -> f64 {
    round_half_up(value, places)
        .to_string()
        .parse()
        .unwrap_or_default()
}

pub fn format_as_json(bill: &Bill) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(&BillDocument::from(bill))?)
}
