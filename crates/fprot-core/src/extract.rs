//! 字段提取器（纯函数）
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

use crate::config::ReportLayout;
use crate::error::ExtractError;

/// 病毒库时间戳的源格式：YYYYMMDDHHmm（12 位数字，无分隔符）
const SIGNATURE_TS_FORMAT: &str = "%Y%m%d%H%M";
const SIGNATURE_TS_LEN: usize = 12;

fn verdict_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([^<>]+)>").expect("valid verdict name regex"))
}

/// 从判毒标记行中取第一对 `<...>` 内的病毒名；没有则返回 None
pub fn extract_signature_name(line: &str) -> Option<&str> {
    verdict_name_regex()
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|name| !name.is_empty())
}

/// 解析 YYYYMMDDHHmm 并输出 YYYYMMDD
pub fn parse_signature_date(value: &str) -> Result<String, ExtractError> {
    let value = value.trim();
    let invalid = || ExtractError::InvalidSignatureDate { value: value.to_string() };
    if value.len() != SIGNATURE_TS_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let ts = NaiveDateTime::parse_from_str(value, SIGNATURE_TS_FORMAT).map_err(|_| invalid())?;
    Ok(ts.format("%Y%m%d").to_string())
}

/// 可识别的 key/value 字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    EngineVersion,
    SignatureDate,
}

/// 单个 key/value 行的提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Extracted {
    EngineVersion(String),
    SignatureDate(Result<String, ExtractError>),
}

/// 键名匹配器：把配置中的键名子串构建成一个 AC 自动机
#[derive(Debug, Clone)]
pub(crate) struct FieldKeys {
    ac: Option<AhoCorasick>,
    /// AC 模式索引 -> 字段
    fields: Vec<Field>,
}

impl FieldKeys {
    pub(crate) fn from_layout(layout: &ReportLayout) -> Result<Self, aho_corasick::BuildError> {
        let mut patterns: Vec<&str> = Vec::new();
        let mut fields = Vec::new();
        // 空键名会匹配任意行，直接忽略
        for (pat, field) in [
            (layout.engine_version_key.as_str(), Field::EngineVersion),
            (layout.signature_date_key.as_str(), Field::SignatureDate),
        ] {
            if !pat.is_empty() {
                patterns.push(pat);
                fields.push(field);
            }
        }
        let ac = if patterns.is_empty() {
            None
        } else {
            Some(AhoCorasickBuilder::new().match_kind(MatchKind::Standard).build(&patterns)?)
        };
        Ok(Self { ac, fields })
    }

    /// 按键名判断字段；同时命中多个键名时按固定顺序取：引擎版本优先于病毒库日期
    pub(crate) fn classify(&self, key: &str) -> Option<Field> {
        let idx = self.ac.as_ref()?.find_overlapping_iter(key).map(|m| m.pattern().as_usize()).min()?;
        self.fields.get(idx).copied()
    }

    /// 对一个 key/value 行运行对应的提取器；键名不认识时返回 None
    pub(crate) fn extract(&self, key: &str, value: &str) -> Option<Extracted> {
        match self.classify(key)? {
            Field::EngineVersion => Some(Extracted::EngineVersion(value.trim().to_string())),
            Field::SignatureDate => Some(Extracted::SignatureDate(parse_signature_date(value))),
        }
    }
}
