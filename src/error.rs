use std::path::PathBuf;

use thiserror::Error;

/// 全流程统一错误类型
///
/// 单条记录的错误在批处理循环边界被捕获并记日志, 不会中断整批;
/// 传输/存储错误向上传播到 CLI 层处理。
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("could not find required value \"{field}\" in record \"{record}\"")]
    MissingField { field: &'static str, record: String },

    #[error("could not find invoice positions in record \"{record}\"")]
    NoPositions { record: String },

    #[error("invalid value \"{value}\" for \"{field}\" in record \"{record}\"")]
    InvalidField {
        field: &'static str,
        record: String,
        value: String,
    },

    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invoice template not available at {path:?}: {source}")]
    TemplateUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invoice template schema mismatch: {0}")]
    TemplateSchema(#[from] quick_xml::DeError),

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pending marker format error: {0}")]
    MarkerFormat(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
