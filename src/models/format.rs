use serde::Serialize;
use std::fmt;

/// 支持的账单输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillFormat {
    Json,
    Csv,
    Pdf,
    Html,
    Text,
    Xml,
}

impl BillFormat {
    pub fn all() -> [BillFormat; 6] {
        [
            BillFormat::Json,
            BillFormat::Csv,
            BillFormat::Pdf,
            BillFormat::Html,
            BillFormat::Text,
            BillFormat::Xml,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillFormat::Json => "json",
            BillFormat::Csv => "csv",
            BillFormat::Pdf => "pdf",
            BillFormat::Html => "html",
            BillFormat::Text => "text",
            BillFormat::Xml => "xml",
        }
    }

    /// 大小写不敏感, `txt` 视为 `text`
    pub fn parse(name: &str) -> Option<BillFormat> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(BillFormat::Json),
            "csv" => Some(BillFormat::Csv),
            "pdf" => Some(BillFormat::Pdf),
            "html" => Some(BillFormat::Html),
            "text" | "txt" => Some(BillFormat::Text),
            "xml" => Some(BillFormat::Xml),
            _ => None,
        }
    }

    /// 文件扩展名与 MIME 类型
    pub fn file_info(&self) -> FileInfo {
        match self {
            BillFormat::Json => FileInfo::new("json", "application/json"),
            BillFormat::Csv => FileInfo::new("csv", "text/csv"),
            BillFormat::Pdf => FileInfo::new("pdf", "application/pdf"),
            BillFormat::Html => FileInfo::new("html", "text/html"),
            BillFormat::Xml => FileInfo::new("xml", "application/xml"),
            BillFormat::Text => FileInfo::new("txt", "text/plain"),
        }
    }
}

impl fmt::Display for BillFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 调用方请求的格式, 未知格式保留原始名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatRequest {
    Supported(BillFormat),
    Unsupported(String),
}

impl From<BillFormat> for FormatRequest {
    fn from(format: BillFormat) -> Self {
        FormatRequest::Supported(format)
    }
}

impl From<&str> for FormatRequest {
    fn from(name: &str) -> Self {
        match BillFormat::parse(name) {
            Some(format) => FormatRequest::Supported(format),
            None => FormatRequest::Unsupported(name.to_string()),
        }
    }
}

impl fmt::Display for FormatRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatRequest::Supported(format) => write!(f, "{}", format),
            FormatRequest::Unsupported(name) => write!(f, "{}", name),
        }
    }
}

/// 下载文件信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub extension: &'static str,
    pub mime_type: &'static str,
}

impl FileInfo {
    const fn new(extension: &'static str, mime_type: &'static str) -> Self {
        Self {
            extension,
            mime_type,
        }
    }
}
