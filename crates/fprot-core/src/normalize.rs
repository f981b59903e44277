//! 报告归一化：原始输出 -> ScanRecord
//!
//! 失败策略：
//! - 出现判毒标记却取不到病毒名 -> `EmptyVerdictName`
//! - 整份输出没有任何 key/value 行 -> `UnrecognizedOutputFormat`
//! - 引擎版本缺失、病毒库日期无法解析 -> 字段留空，不报错
use anyhow::Result;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::config::ReportLayout;
use crate::error::NormalizationError;
use crate::extract::{extract_signature_name, Extracted, FieldKeys};
use crate::tokenizer::{tokenize, ClassifiedLine};
use crate::types::ScanRecord;

/// 可复用的归一化器（无内部可变状态，可跨线程共享）
#[derive(Debug, Clone)]
pub struct Normalizer {
    marker: String,
    keys: FieldKeys,
}

impl Normalizer {
    pub fn new(layout: &ReportLayout) -> Result<Self> {
        Ok(Self { marker: layout.verdict_marker.clone(), keys: FieldKeys::from_layout(layout)? })
    }

    pub fn normalize(&self, raw: &str) -> Result<ScanRecord, NormalizationError> {
        let mut record = ScanRecord::default();
        let mut structured_lines = 0usize;

        for line in tokenize(raw, &self.marker) {
            if let ClassifiedLine::VerdictMarker(text) = line {
                let name = extract_signature_name(text)
                    .ok_or_else(|| NormalizationError::EmptyVerdictName { line: text.to_string() })?;
                record.infected = true;
                record.signature_name = name.to_string();
            }

            let Some((key, value)) = line.key_value() else { continue };
            structured_lines += 1;

            match self.keys.extract(key, value) {
                Some(Extracted::EngineVersion(version)) => record.engine_version = version,
                Some(Extracted::SignatureDate(Ok(date))) => record.signature_date = date,
                Some(Extracted::SignatureDate(Err(e))) => warn!(error = %e, "ignoring signature date"),
                None => {}
            }
        }

        if structured_lines == 0 {
            return Err(NormalizationError::UnrecognizedOutputFormat);
        }

        debug!(
            infected = record.infected,
            result = %record.signature_name,
            engine = %record.engine_version,
            updated = %record.signature_date,
            structured_lines,
            "normalized scan report"
        );
        Ok(record)
    }
}

pub(crate) fn default_normalizer() -> &'static Normalizer {
    static DEFAULT: OnceLock<Normalizer> = OnceLock::new();
    DEFAULT.get_or_init(|| Normalizer::new(&ReportLayout::default()).expect("default report layout"))
}

/// 以默认报告格式归一化
pub fn normalize(raw: &str) -> Result<ScanRecord, NormalizationError> {
    default_normalizer().normalize(raw)
}
