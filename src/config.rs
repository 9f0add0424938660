use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 车辆遥测 API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            telemetry: TelemetryConfig {
                base_url: "https://funczetiinterviewtest.azurewebsites.net".to_string(),
                timeout_secs: 10,
            },
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置 (FLEET_BILLING__SERVER__PORT 等)
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("telemetry.base_url", defaults.telemetry.base_url)?
            .set_default("telemetry.timeout_secs", defaults.telemetry.timeout_secs as i64)?
            .add_source(config::Environment::with_prefix("FLEET_BILLING").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 加载失败时回退到默认配置
    pub fn from_env() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Invalid configuration ({}), using defaults", e);
            Self::default()
        })
    }
}

pub const CUSTOMER_NAME: &str = "Bob's Taxis";
pub const FLEET_LICENSE_PLATES: [&str; 2] = ["CBDH 789", "86532 AZE"];
pub const CURRENCY_SYMBOL: &str = "£";

/// 固定账期
pub const BILLING_PERIOD_START: &str = "2021-02-01T00:00:00Z";
pub const BILLING_PERIOD_END: &str = "2021-02-28T23:59:00Z";

/// 车队计费档案 (静态配置, 运行时不可改)
#[derive(Debug, Clone, PartialEq)]
pub struct FleetProfile {
    pub customer_name: String,
    pub license_plates: Vec<String>,
    pub cost_per_mile: BigDecimal,
}

impl FleetProfile {
    /// 是否属于本车队
    pub fn includes(&self, license_plate: &str) -> bool {
        self.license_plates.iter().any(|p| p == license_plate)
    }
}

impl Default for FleetProfile {
    fn default() -> Self {
        Self {
            customer_name: CUSTOMER_NAME.to_string(),
            license_plates: FLEET_LICENSE_PLATES.iter().map(|p| p.to_string()).collect(),
            // 0.207 GBP / mile
            cost_per_mile: BigDecimal::new(207.into(), 3),
        }
    }
}

/// 账期起止时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BillingPeriod {
    pub fn fixed() -> Result<Self, chrono::ParseError> {
        Ok(Self {
            start: DateTime::parse_from_rfc3339(BILLING_PERIOD_START)?.with_timezone(&Utc),
            end: DateTime::parse_from_rfc3339(BILLING_PERIOD_END)?.with_timezone(&Utc),
        })
    }
}
