use crate::models::{BillOutcome, VehicleRecord};
use crate::service::BillingCalculator;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// 缓存键的组成部分 (四个计费输入)
#[derive(Serialize)]
struct BillKeyParts<'a> {
    start: &'a [VehicleRecord],
    end: &'a [VehicleRecord],
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

/// 账单缓存: 同一组输入最多计算一次
///
/// 并发的相同请求共享同一个 `OnceCell`, 后到者等待正在进行的计算。
/// 缓存命中时返回首次计算的账单, 包括其 `generated_at`。
pub struct BillCache {
    calculator: BillingCalculator,
    entries: DashMap<String, Arc<OnceCell<Arc<BillOutcome>>>>,
    computations: AtomicUsize,
}

impl BillCache {
    pub fn new(calculator: BillingCalculator) -> Self {
        Self {
            calculator,
            entries: DashMap::new(),
            computations: AtomicUsize::new(0),
        }
    }

    pub fn calculator(&self) -> &BillingCalculator {
        &self.calculator
    }

    pub async fn get_or_generate(
        &self,
        start_vehicles: &[VehicleRecord],
        end_vehicles: &[VehicleRecord],
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Arc<BillOutcome> {
        let parts = BillKeyParts {
            start: start_vehicles,
            end: end_vehicles,
            start_date,
            end_date,
        };
        let key = match serde_json::to_string(&parts) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Cannot build bill cache key ({}), computing uncached", e);
                return Arc::new(self.compute(start_vehicles, end_vehicles, start_date, end_date));
            }
        };

        // 先取出 cell 再释放分片锁, 不跨 await 持锁
        let cell = self
            .entries
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_init(|| async {
            Arc::new(self.compute(start_vehicles, end_vehicles, start_date, end_date))
        })
        .await
        .clone()
    }

    fn compute(
        &self,
        start_vehicles: &[VehicleRecord],
        end_vehicles: &[VehicleRecord],
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> BillOutcome {
        self.computations.fetch_add(1, Ordering::SeqCst);
        self.calculator
            .generate_bill(start_vehicles, end_vehicles, start_date, end_date)
    }

    /// 实际执行计算的次数
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for BillCache {
    fn default() -> Self {
        Self::new(BillingCalculator::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleState;
    use chrono::TimeZone;

    fn snapshot(meters: f64) -> Vec<VehicleRecord> {
        vec![VehicleRecord {
            vin: "V1".to_string(),
            license_plate: "CBDH 789".to_string(),
            make: "Toyota".to_string(),
            model: "Prius".to_string(),
            state: Some(VehicleState {
                odometer_in_meters: meters,
                speed_in_mph: 12.0,
                as_at: Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap(),
            }),
        }]
    }

    fn period() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 2, 28, 23, 59, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn equal_inputs_reuse_the_first_bill() {
        let cache = BillCache::default();
        let (start, end) = period();

        let first = cache
            .get_or_generate(&snapshot(0.0), &snapshot(1609.344), start, end)
            .await;
        let second = cache
            .get_or_generate(&snapshot(0.0), &snapshot(1609.344), start, end)
            .await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.bill.generated_at, second.bill.generated_at);
        assert_eq!(cache.computations(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn different_inputs_compute_separately() {
        let cache = BillCache::default();
        let (start, end) = period();

        let a = cache
            .get_or_generate(&snapshot(0.0), &snapshot(1609.344), start, end)
            .await;
        let b = cache
            .get_or_generate(&snapshot(0.0), &snapshot(3218.688), start, end)
            .await;
        let c = cache
            .get_or_generate(&snapshot(0.0), &snapshot(3218.688), start, start)
            .await;

        assert_eq!(a.bill.total_miles.to_string(), "1.00");
        assert_eq!(b.bill.total_miles.to_string(), "2.00");
        assert_eq!(c.bill.billing_period_end, start);
        assert_eq!(cache.computations(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_computation() {
        let cache = Arc::new(BillCache::default());
        let (start, end) = period();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_generate(&snapshot(0.0), &snapshot(700_000.0), start, end)
                        .await
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        assert_eq!(cache.computations(), 1);
        assert!(outcomes.iter().all(|o| Arc::ptr_eq(o, &outcomes[0])));
    }

    #[tokio::test]
    async fn clear_forces_recomputation() {
        let cache = BillCache::default();
        let (start, end) = period();

        cache
            .get_or_generate(&snapshot(0.0), &snapshot(1.0), start, end)
            .await;
        cache.clear();
        assert!(cache.is_empty());
        cache
            .get_or_generate(&snapshot(0.0), &snapshot(1.0), start, end)
            .await;

        assert_eq!(cache.computations(), 2);
    }
}
