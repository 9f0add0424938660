pub mod csv;
pub mod html;
pub mod json;
pub mod pdf;
pub mod text;
pub mod xml;

use crate::config::CURRENCY_SYMBOL;
use crate::error::FormatError;
use crate::models::{Bill, BillFormat, FileInfo, FormatRequest};
use crate::service::calculator::round_half_up;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

/// 格式化后的载荷
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillPayload {
    Text(String),
    /// `data:<mime>;base64,<...>`
    DataUri(String),
}

impl BillPayload {
    pub fn as_str(&self) -> &str {
        match self {
            BillPayload::Text(s) | BillPayload::DataUri(s) => s,
        }
    }

    /// 可下载的原始字节 (DataUri 会解码 base64)
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        match self {
            BillPayload::Text(s) => Ok(s.clone().into_bytes()),
            BillPayload::DataUri(uri) => {
                let encoded = uri
                    .split_once(";base64,")
                    .map(|(_, data)| data)
                    .ok_or_else(|| FormatError::encode("data-uri", "missing base64 marker"))?;
                BASE64
                    .decode(encoded)
                    .map_err(|e| FormatError::encode("data-uri", e))
            }
        }
    }
}

/// 格式化结果: 实际渲染的格式 + 文件信息 + 载荷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedBill {
    pub format: BillFormat,
    pub file_info: FileInfo,
    pub payload: BillPayload,
}

/// 按请求格式序列化账单
///
/// 不支持的格式回退到 JSON (记录警告)。只有 PDF 编码本身失败时返回错误。
pub async fn format_bill(
    bill: &Bill,
    request: impl Into<FormatRequest>,
) -> Result<FormattedBill, FormatError> {
    let format = match request.into() {
        FormatRequest::Supported(format) => format,
        FormatRequest::Unsupported(name) => {
            tracing::warn!("Unsupported format: {}, defaulting to JSON", name);
            BillFormat::Json
        }
    };

    let payload = match format {
        BillFormat::Json => BillPayload::Text(json::format_as_json(bill)?),
        BillFormat::Csv => BillPayload::Text(csv::format_as_csv(bill)),
        BillFormat::Pdf => BillPayload::DataUri(pdf::format_as_pdf(bill).await?),
        BillFormat::Html => BillPayload::Text(html::format_as_html(bill)),
        BillFormat::Text => BillPayload::Text(text::format_as_text(bill)),
        BillFormat::Xml => BillPayload::Text(xml::format_as_xml(bill)),
    };

    Ok(FormattedBill {
        format,
        file_info: format.file_info(),
        payload,
    })
}

/// 格式 -> 文件信息, 未知格式按纯文本处理
pub fn get_file_info(request: impl Into<FormatRequest>) -> FileInfo {
    match request.into() {
        FormatRequest::Supported(format) => format.file_info(),
        FormatRequest::Unsupported(_) => BillFormat::Text.file_info(),
    }
}

/// DD/MM/YYYY HH:mm (UTC)
pub fn format_uk_date(date: &DateTime<Utc>) -> String {
    date.format("%d/%m/%Y %H:%M").to_string()
}

/// £ + 2 位小数
pub fn format_currency(value: &BigDecimal) -> String {
    format!("{}{}", CURRENCY_SYMBOL, fixed(value, 2))
}

/// 单价保留 3 位小数 (低于 1 便士的粒度)
pub fn format_rate(value: &BigDecimal) -> String {
    format!("{}{}", CURRENCY_SYMBOL, fixed(value, 3))
}

/// 英里 2 位小数
pub fn format_miles(value: &BigDecimal) -> String {
    fixed(value, 2)
}

fn fixed(value: &BigDecimal, places: i64) -> String {
    round_half_up(value, places).to_string()
}
