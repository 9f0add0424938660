use crate::config::TelemetryConfig;
use crate::error::TelemetryError;
use crate::models::Snapshot;
use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use reqwest::Url;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 车辆遥测 API 客户端
///
/// 成功的响应按请求路径缓存, 失败不缓存。
#[derive(Debug, Clone)]
pub struct TelemetryClient {
    http: reqwest::Client,
    base_url: Url,
    cache: Arc<DashMap<String, Arc<Snapshot>>>,
}

impl TelemetryClient {
    pub fn new(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| TelemetryError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TelemetryError::InvalidUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            cache: Arc::new(DashMap::new()),
        })
    }

    /// 某一时刻的车队快照
    pub async fn fetch_snapshot(&self, as_at: DateTime<Utc>) -> Result<Arc<Snapshot>, TelemetryError> {
        let instant = as_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.get_cached(&format!("/api/vehicles/history/{}", instant))
            .await
    }

    /// 当前车辆列表
    pub async fn fetch_vehicles(&self) -> Result<Arc<Snapshot>, TelemetryError> {
        self.get_cached("/api/vehicles").await
    }

    /// 并发获取账期起止两个快照, 任一失败则整体失败
    pub async fn fetch_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(Arc<Snapshot>, Arc<Snapshot>), TelemetryError> {
        futures::try_join!(self.fetch_snapshot(start), self.fetch_snapshot(end))
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    async fn get_cached(&self, path: &str) -> Result<Arc<Snapshot>, TelemetryError> {
        if let Some(hit) = self.cache.get(path) {
            tracing::debug!("Telemetry cache hit: {}", path);
            return Ok(hit.value().clone());
        }

        let snapshot = Arc::new(self.get(path).await?);
        self.cache.insert(path.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    async fn get(&self, path: &str) -> Result<Snapshot, TelemetryError> {
        let url = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        let start = Instant::now();

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Telemetry API returned {} for {}", status, url);
            return Err(TelemetryError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let snapshot: Snapshot = response.json().await?;
        tracing::info!(
            "Fetched {} vehicles from {} in {:?}",
            snapshot.len(),
            url,
            start.elapsed()
        );
        Ok(snapshot)
    }
}
