//! 错误类型
use std::path::PathBuf;
use thiserror::Error;

/// 报告归一化失败（均为致命错误，调用方不得输出记录）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// 出现了判毒标记行，但提取不到 `<...>` 中的病毒名
    #[error("verdict marker found but no virus name could be extracted: {line:?}")]
    EmptyVerdictName { line: String },
    /// 报告中没有任何 `key: value` 结构行，输出格式已无法识别
    #[error("scanner output contains no recognizable key/value lines")]
    UnrecognizedOutputFormat,
}

/// 单个字段提取失败（由 Normalizer 决定是否致命）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("invalid signature timestamp {value:?}, expected YYYYMMDDHHmm")]
    InvalidSignatureDate { value: String },
}

/// 扫描编排失败
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan target does not exist: {}", .0.display())]
    TargetNotFound(PathBuf),
    /// 外部引擎启动失败、崩溃、超时，或非零退出且无输出
    #[error("failed to run scan engine {program}: {reason}")]
    EngineInvocation { program: String, reason: String },
    #[error(transparent)]
    Normalization(#[from] NormalizationError),
}
