use crate::config::FleetProfile;
use crate::models::{
    Bill, BillLineItem, BillNotice, BillOutcome, SnapshotSide, VehicleRecord,
};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::str::FromStr;

/// 1 mile = 1609.344 meters
fn meters_per_mile() -> BigDecimal {
    BigDecimal::new(1_609_344.into(), 3)
}

/// 四舍五入 (half-up) 到 `places` 位小数, 并固定显示精度
pub fn round_half_up(value: &BigDecimal, places: i64) -> BigDecimal {
    if *value < BigDecimal::zero() {
        return -round_half_up(&-value.clone(), places);
    }
    // with_scale 向零截断
    let truncated = value.with_scale(places);
    let remainder = value - &truncated;
    if remainder >= BigDecimal::new(5.into(), places + 1) {
        truncated + BigDecimal::new(1.into(), places)
    } else {
        truncated
    }
}

pub fn round2(value: &BigDecimal) -> BigDecimal {
    round_half_up(value, 2)
}

/// 米 -> 英里 (2位小数)
pub fn miles_from_meters(meters: &BigDecimal) -> BigDecimal {
    round2(&(meters / &meters_per_mile()))
}

/// 两次里程表读数之间的行驶英里数, 回退时按 0 计
pub fn miles_travelled(start_meters: &BigDecimal, end_meters: &BigDecimal) -> BigDecimal {
    let meters = end_meters - start_meters;
    if meters < BigDecimal::zero() {
        return round2(&BigDecimal::zero());
    }
    miles_from_meters(&meters)
}

/// 费用 = 英里 * 单价 (2位小数)
pub fn cost_for(miles: &BigDecimal, cost_per_mile: &BigDecimal) -> BigDecimal {
    round2(&(miles * cost_per_mile))
}

/// 遥测读数 (JSON number) 转十进制, 非有限数返回 None
pub fn decimal_from_reading(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

/// 账单计算服务
#[derive(Debug, Clone, Default)]
pub struct BillingCalculator {
    profile: FleetProfile,
}

impl BillingCalculator {
    pub fn new(profile: FleetProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &FleetProfile {
        &self.profile
    }

    /// 对账两个快照并生成账单
    ///
    /// 数据异常不会导致失败: 缺失起始车辆或状态的车辆被跳过,
    /// 里程表回退的车辆按 0 英里计费, 都记录在 `notices` 中。
    /// 输出顺序与结束快照 (过滤后) 一致。
    pub fn generate_bill(
        &self,
        start_vehicles: &[VehicleRecord],
        end_vehicles: &[VehicleRecord],
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> BillOutcome {
        // 起始快照按 VIN 建索引, 重复 VIN 取第一条
        let mut start_index: IndexMap<&str, &VehicleRecord> = IndexMap::new();
        for v in start_vehicles
            .iter()
            .filter(|v| self.profile.includes(&v.license_plate))
        {
            start_index.entry(v.vin.as_str()).or_insert(v);
        }

        let mut vehicles: Vec<BillLineItem> = Vec::new();
        let mut notices: Vec<BillNotice> = Vec::new();
        let mut total_miles = BigDecimal::zero();
        let mut total_cost = BigDecimal::zero();

        for end_vehicle in end_vehicles
            .iter()
            .filter(|v| self.profile.includes(&v.license_plate))
        {
            let start_vehicle = start_index.get(end_vehicle.vin.as_str()).copied();
            let Some(line) = self.reconcile(start_vehicle, end_vehicle, &mut notices) else {
                continue;
            };

            // 累计已四舍五入的单行值
            total_miles += &line.miles_travelled;
            total_cost += &line.cost;
            vehicles.push(line);
        }

        let bill = Bill {
            billing_period_start: start_date,
            billing_period_end: end_date,
            customer_name: self.profile.customer_name.clone(),
            cost_per_mile: self.profile.cost_per_mile.clone(),
            vehicles,
            total_miles: round2(&total_miles),
            total_cost: round2(&total_cost),
            generated_at: Utc::now(),
        };

        tracing::info!(
            "Bill generated for {}: {} vehicles, {} miles, total cost {}, {} notices",
            bill.customer_name,
            bill.vehicles.len(),
            bill.total_miles,
            bill.total_cost,
            notices.len()
        );

        BillOutcome { bill, notices }
    }

    /// 单辆车对账, 返回 None 表示跳过
    fn reconcile(
        &self,
        start_vehicle: Option<&VehicleRecord>,
        end_vehicle: &VehicleRecord,
        notices: &mut Vec<BillNotice>,
    ) -> Option<BillLineItem> {
        let Some(start_vehicle) = start_vehicle else {
            tracing::warn!(
                "Vehicle {} ({}) missing from start snapshot, skipping",
                end_vehicle.vin,
                end_vehicle.license_plate
            );
            notices.push(BillNotice::MissingStartVehicle {
                vin: end_vehicle.vin.clone(),
                license_plate: end_vehicle.license_plate.clone(),
            });
            return None;
        };

        let start_meters = odometer_of(start_vehicle, SnapshotSide::Start, notices)?;
        let end_meters = odometer_of(end_vehicle, SnapshotSide::End, notices)?;

        let meters_travelled = &end_meters - &start_meters;
        if meters_travelled < BigDecimal::zero() {
            tracing::warn!(
                "Negative distance for vehicle {} ({} meters), assuming 0 miles travelled",
                end_vehicle.vin,
                meters_travelled
            );
            notices.push(BillNotice::NegativeDistance {
                vin: end_vehicle.vin.clone(),
                meters: meters_travelled.to_string().parse().unwrap_or_default(),
            });
        }

        let miles = miles_travelled(&start_meters, &end_meters);
        let cost = cost_for(&miles, &self.profile.cost_per_mile);

        Some(BillLineItem {
            vin: end_vehicle.vin.clone(),
            license_plate: end_vehicle.license_plate.clone(),
            make: end_vehicle.make.clone(),
            model: end_vehicle.model.clone(),
            start_odometer_miles: miles_from_meters(&start_meters),
            end_odometer_miles: miles_from_meters(&end_meters),
            miles_travelled: miles,
            cost,
        })
    }
}

/// 读取里程表 (米), 缺失或无效时记录诊断
fn odometer_of(
    vehicle: &VehicleRecord,
    side: SnapshotSide,
    notices: &mut Vec<BillNotice>,
) -> Option<BigDecimal> {
    let Some(state) = vehicle.state.as_ref() else {
        tracing::warn!(
            "Missing {:?} state data for vehicle {}, skipping",
            side,
            vehicle.vin
        );
        notices.push(BillNotice::MissingState {
            vin: vehicle.vin.clone(),
            license_plate: vehicle.license_plate.clone(),
            side,
        });
        return None;
    };

    let reading = decimal_from_reading(state.odometer_in_meters);
    if reading.is_none() {
        tracing::warn!(
            "Invalid {:?} odometer reading for vehicle {}, skipping",
            side,
            vehicle.vin
        );
        notices.push(BillNotice::InvalidOdometer {
            vin: vehicle.vin.clone(),
            side,
        });
    }
    reading
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleState;
    use chrono::TimeZone;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn vehicle(vin: &str, plate: &str, meters: Option<f64>) -> VehicleRecord {
        VehicleRecord {
            vin: vin.to_string(),
            license_plate: plate.to_string(),
            make: "Toyota".to_string(),
            model: "Prius".to_string(),
            state: meters.map(|m| VehicleState {
                odometer_in_meters: m,
                speed_in_mph: 0.0,
                as_at: Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap(),
            }),
        }
    }

    fn period() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 2, 28, 23, 59, 0).unwrap(),
        )
    }

    #[test]
    fn one_mile_in_meters_is_one_mile() {
        assert_eq!(miles_from_meters(&dec("1609.344")), dec("1.00"));
        assert_eq!(miles_from_meters(&dec("0")).to_string(), "0.00");
    }

    #[test]
    fn conversion_rounds_half_up_at_two_decimals() {
        // 8.04672 m == 0.005 mi exactly
        assert_eq!(miles_from_meters(&dec("8.04672")), dec("0.01"));
        // 6.437376 m == 0.004 mi
        assert_eq!(miles_from_meters(&dec("6.437376")), dec("0.00"));
        assert_eq!(miles_from_meters(&dec("700000")), dec("434.96"));
    }

    #[test]
    fn round2_is_symmetric_half_up() {
        assert_eq!(round2(&dec("2.675")).to_string(), "2.68");
        assert_eq!(round2(&dec("2.6749")).to_string(), "2.67");
        assert_eq!(round2(&dec("-0.005")).to_string(), "-0.01");
        assert_eq!(round2(&dec("7")).to_string(), "7.00");
    }

    #[test]
    fn rollback_is_zero_miles_not_negative() {
        assert_eq!(miles_travelled(&dec("5000"), &dec("4000")).to_string(), "0.00");
        assert_eq!(cost_for(&dec("0.00"), &dec("0.207")).to_string(), "0.00");
    }

    #[test]
    fn readings_keep_their_decimal_digits() {
        assert_eq!(decimal_from_reading(8.04672), Some(dec("8.04672")));
        assert_eq!(decimal_from_reading(f64::NAN), None);
        assert_eq!(decimal_from_reading(f64::INFINITY), None);
    }

    #[test]
    fn single_vehicle_bill() {
        let (start, end) = period();
        let outcome = BillingCalculator::default().generate_bill(
            &[vehicle("V1", "CBDH 789", Some(12_500_000.0))],
            &[vehicle("V1", "CBDH 789", Some(13_200_000.0))],
            start,
            end,
        );

        let bill = &outcome.bill;
        assert!(outcome.notices.is_empty());
        assert_eq!(bill.vehicles.len(), 1);
        let line = &bill.vehicles[0];
        assert_eq!(line.start_odometer_miles.to_string(), "7767.14");
        assert_eq!(line.end_odometer_miles.to_string(), "8202.10");
        assert_eq!(line.miles_travelled.to_string(), "434.96");
        assert_eq!(line.cost.to_string(), "90.04");
        assert_eq!(bill.total_miles, line.miles_travelled);
        assert_eq!(bill.total_cost, line.cost);
        assert_eq!(bill.customer_name, "Bob's Taxis");
        assert_eq!(bill.billing_period_start, start);
    }

    #[test]
    fn vehicle_missing_from_start_snapshot_is_skipped() {
        let (start, end) = period();
        let outcome = BillingCalculator::default().generate_bill(
            &[vehicle("V1", "CBDH 789", Some(1000.0))],
            &[
                vehicle("V1", "CBDH 789", Some(2000.0)),
                vehicle("V2", "86532 AZE", Some(9000.0)),
            ],
            start,
            end,
        );

        assert_eq!(outcome.bill.vehicles.len(), 1);
        assert_eq!(outcome.bill.vehicles[0].vin, "V1");
        assert_eq!(outcome.skipped_vins(), vec!["V2"]);
        assert!(matches!(
            outcome.notices[0],
            BillNotice::MissingStartVehicle { .. }
        ));
    }

    #[test]
    fn missing_state_on_either_side_is_skipped() {
        let (start, end) = period();
        let outcome = BillingCalculator::default().generate_bill(
            &[
                vehicle("V1", "CBDH 789", None),
                vehicle("V2", "86532 AZE", Some(1000.0)),
            ],
            &[
                vehicle("V1", "CBDH 789", Some(2000.0)),
                vehicle("V2", "86532 AZE", None),
            ],
            start,
            end,
        );

        assert!(outcome.bill.vehicles.is_empty());
        assert_eq!(
            outcome.notices,
            vec![
                BillNotice::MissingState {
                    vin: "V1".to_string(),
                    license_plate: "CBDH 789".to_string(),
                    side: SnapshotSide::Start,
                },
                BillNotice::MissingState {
                    vin: "V2".to_string(),
                    license_plate: "86532 AZE".to_string(),
                    side: SnapshotSide::End,
                },
            ]
        );
        assert_eq!(outcome.bill.total_cost.to_string(), "0.00");
    }

    #[test]
    fn negative_delta_keeps_line_at_zero() {
        let (start, end) = period();
        let outcome = BillingCalculator::default().generate_bill(
            &[vehicle("V1", "CBDH 789", Some(5000.0))],
            &[vehicle("V1", "CBDH 789", Some(4000.0))],
            start,
            end,
        );

        let line = &outcome.bill.vehicles[0];
        assert_eq!(line.miles_travelled.to_string(), "0.00");
        assert_eq!(line.cost.to_string(), "0.00");
        assert_eq!(
            outcome.notices,
            vec![BillNotice::NegativeDistance {
                vin: "V1".to_string(),
                meters: -1000.0,
            }]
        );
        assert!(outcome.skipped_vins().is_empty());
    }

    #[test]
    fn vehicles_outside_the_fleet_are_ignored() {
        let (start, end) = period();
        let outcome = BillingCalculator::default().generate_bill(
            &[vehicle("V9", "OTHER 1", Some(0.0))],
            &[vehicle("V9", "OTHER 1", Some(1_000_000.0))],
            start,
            end,
        );

        assert!(outcome.bill.vehicles.is_empty());
        assert!(outcome.notices.is_empty());
    }

    #[test]
    fn output_follows_end_snapshot_order() {
        let (start, end) = period();
        let outcome = BillingCalculator::default().generate_bill(
            &[
                vehicle("V1", "CBDH 789", Some(0.0)),
                vehicle("V2", "86532 AZE", Some(0.0)),
            ],
            &[
                vehicle("V2", "86532 AZE", Some(1609.344)),
                vehicle("V1", "CBDH 789", Some(3218.688)),
            ],
            start,
            end,
        );

        let vins: Vec<&str> = outcome.bill.vehicles.iter().map(|v| v.vin.as_str()).collect();
        assert_eq!(vins, vec!["V2", "V1"]);
        assert_eq!(outcome.bill.total_miles.to_string(), "3.00");
    }

    #[test]
    fn totals_sum_already_rounded_lines() {
        let (start, end) = period();
        // 每辆车 0.004 英里 -> 单行 0.00, 合计也必须是 0.00 (而不是 0.01)
        let outcome = BillingCalculator::default().generate_bill(
            &[
                vehicle("V1", "CBDH 789", Some(0.0)),
                vehicle("V2", "86532 AZE", Some(0.0)),
            ],
            &[
                vehicle("V1", "CBDH 789", Some(6.437376)),
                vehicle("V2", "86532 AZE", Some(6.437376)),
            ],
            start,
            end,
        );

        assert_eq!(outcome.bill.vehicles.len(), 2);
        assert_eq!(outcome.bill.total_miles.to_string(), "0.00");
        assert_eq!(outcome.bill.total_cost.to_string(), "0.00");
    }

    #[test]
    fn duplicate_start_vin_uses_first_record() {
        let (start, end) = period();
        let outcome = BillingCalculator::default().generate_bill(
            &[
                vehicle("V1", "CBDH 789", Some(0.0)),
                vehicle("V1", "CBDH 789", Some(1609.344)),
            ],
            &[vehicle("V1", "CBDH 789", Some(3218.688))],
            start,
            end,
        );

        assert_eq!(outcome.bill.vehicles[0].miles_travelled.to_string(), "2.00");
    }
}
