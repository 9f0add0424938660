use crate::config::BillingPeriod;
use crate::error::AppError;
use crate::formatter::{self, json::BillDocument};
use crate::models::{BillNotice, BillOutcome, FormatRequest, VehicleRecord};
use crate::service::BillCache;
use crate::telemetry::TelemetryClient;
use axum::{
    extract::{Json, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 共享状态: 遥测客户端 + 账单缓存 + 固定账期
#[derive(Clone)]
pub struct AppState {
    pub telemetry: TelemetryClient,
    pub bills: Arc<BillCache>,
    pub period: BillingPeriod,
}

/// 下载参数, 缺省为 json
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub format: Option<String>,
}

/// 车辆列表响应体
#[derive(Debug, Serialize)]
pub struct VehiclesResponse {
    pub success: bool,
    pub message: String,
    pub vehicles: Vec<VehicleRecord>,
}

/// 账单响应体 (含诊断信息)
#[derive(Debug, Serialize)]
pub struct BillResponse {
    pub success: bool,
    pub message: String,
    pub notices: Vec<BillNotice>,
    pub bill: BillDocument,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 当前车队车辆 (按车牌白名单过滤)
pub async fn list_vehicles(State(state): State<AppState>) -> Result<Json<VehiclesResponse>, AppError> {
    let snapshot = state.telemetry.fetch_vehicles().await?;
    let profile = state.bills.calculator().profile();

    let vehicles: Vec<VehicleRecord> = snapshot
        .iter()
        .filter(|v| profile.includes(&v.license_plate))
        .cloned()
        .collect();

    Ok(Json(VehiclesResponse {
        success: true,
        message: format!("Found {} fleet vehicles", vehicles.len()),
        vehicles,
    }))
}

/// 拉取账期两端快照并生成 (或复用) 账单
async fn current_bill(state: &AppState) -> Result<Arc<BillOutcome>, AppError> {
    let (start, end) = state
        .telemetry
        .fetch_period(state.period.start, state.period.end)
        .await?;

    Ok(state
        .bills
        .get_or_generate(&start, &end, state.period.start, state.period.end)
        .await)
}

/// 账单 JSON
pub async fn get_bill(State(state): State<AppState>) -> Result<Json<BillResponse>, AppError> {
    let outcome = current_bill(&state).await?;

    let skipped = outcome.skipped_vins().len();
    let message = if skipped == 0 {
        format!("Bill generated for {} vehicles", outcome.bill.vehicles.len())
    } else {
        format!(
            "Bill generated for {} vehicles, {} skipped",
            outcome.bill.vehicles.len(),
            skipped
        )
    };

    Ok(Json(BillResponse {
        success: true,
        message,
        notices: outcome.notices.clone(),
        bill: BillDocument::from(&outcome.bill),
    }))
}

/// 账单下载 (任意支持的格式)
pub async fn download_bill(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let request = FormatRequest::from(query.format.as_deref().unwrap_or("json"));
    let outcome = current_bill(&state).await?;

    let formatted = formatter::format_bill(&outcome.bill, request).await?;
    let bytes = formatted.payload.to_bytes()?;
    tracing::info!(
        "Serving bill as {} ({} bytes)",
        formatted.format,
        bytes.len()
    );

    let headers = [
        (header::CONTENT_TYPE, formatted.file_info.mime_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"bill.{}\"", formatted.file_info.extension),
        ),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}
