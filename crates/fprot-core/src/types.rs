//! 公共类型（对外暴露）
use serde::Serialize;

/// 插件名（JSON 顶层键、落库文档的 name 字段）
pub const NAME: &str = "f-prot";
/// 插件类别
pub const CATEGORY: &str = "av";

/// 归一化后的扫描结论
///
/// 由 `Normalizer` 从一次扫描的原始输出构造，构造后只读。
/// 序列化字段名沿用插件既有的 JSON 口径：infected / result / engine / updated。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanRecord {
    pub(crate) infected: bool,
    #[serde(rename = "result")]
    pub(crate) signature_name: String,
    #[serde(rename = "engine")]
    pub(crate) engine_version: String,
    #[serde(rename = "updated")]
    pub(crate) signature_date: String,
}

impl ScanRecord {
    /// 是否检出威胁
    pub fn infected(&self) -> bool { self.infected }

    /// 病毒名；未检出时为空
    pub fn signature_name(&self) -> &str { &self.signature_name }

    /// 引擎版本；报告未给出时为空
    pub fn engine_version(&self) -> &str { &self.engine_version }

    /// 病毒库日期（YYYYMMDD）；缺失或无法解析时为空
    pub fn signature_date(&self) -> &str { &self.signature_date }

    /// 仅在日期为空时以回退日期补齐，判毒字段保持不变
    pub(crate) fn with_fallback_date(mut self, fallback: Option<&str>) -> Self {
        if self.signature_date.is_empty() {
            if let Some(date) = fallback {
                self.signature_date = date.to_string();
            }
        }
        self
    }
}

/// JSON 输出外壳：`{"f-prot": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginResults {
    #[serde(rename = "f-prot")]
    pub results: ScanRecord,
}

impl From<ScanRecord> for PluginResults {
    fn from(results: ScanRecord) -> Self {
        Self { results }
    }
}
