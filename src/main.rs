use fleet_billing::{api, AppConfig, AppState, BillCache, BillingCalculator, BillingPeriod, FleetProfile, TelemetryClient};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    let telemetry = TelemetryClient::new(&config.telemetry)?;
    info!("Telemetry client ready: {}", config.telemetry.base_url);

    let profile = FleetProfile::default();
    info!(
        "Billing {} for {} vehicles at {} per mile",
        profile.customer_name,
        profile.license_plates.len(),
        profile.cost_per_mile
    );

    let state = AppState {
        telemetry,
        bills: Arc::new(BillCache::new(BillingCalculator::new(profile))),
        period: BillingPeriod::fixed()?,
    };
    let app = api::router(state);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET /api/vehicles                   - fleet vehicles");
    info!("  GET /api/bill                       - bill as JSON");
    info!("  GET /api/bill/download?format=<fmt> - json|csv|pdf|html|text|xml");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
