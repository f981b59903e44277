//! 插件配置（TOML）
//!
//! 所有字段均有默认值；配置文件可只覆盖其中一部分。
//! 环境变量与命令行参数的覆盖在 CLI 层完成。
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 顶层配置文件结构
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub engine: EngineConfig,
    pub report: ReportLayout,
    pub signatures: SignatureConfig,
    pub web: WebConfig,
}

/// 外部扫描引擎与更新程序
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 扫描程序路径
    pub scanner: PathBuf,
    /// 扫描参数（目标路径追加在最后）
    pub scan_args: Vec<String>,
    /// 病毒库更新程序路径
    pub updater: PathBuf,
    /// 扫描超时（秒）
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scanner: PathBuf::from("/usr/local/bin/fpscan"),
            scan_args: vec!["-r".to_string()],
            updater: PathBuf::from("/opt/f-prot/fpupdate"),
            timeout_secs: 10,
        }
    }
}

/// 报告格式约定：判毒标记与关键字段的键名子串
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportLayout {
    pub verdict_marker: String,
    pub engine_version_key: String,
    pub signature_date_key: String,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            verdict_marker: "[Found virus]".to_string(),
            engine_version_key: "Engine version".to_string(),
            signature_date_key: "Virus signatures".to_string(),
        }
    }
}

/// 病毒库更新元数据
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// 记录最近一次更新日期（YYYYMMDD）的文件
    pub stamp_path: PathBuf,
    /// 更新记录文件不存在时使用的日期（YYYYMMDD），一般在构建镜像时注入
    pub fallback_date: Option<String>,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self { stamp_path: PathBuf::from("/opt/malice/UPDATED"), fallback_date: None }
    }
}

/// 上传扫描服务
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub listen: String,
    /// 上传文件的临时目录
    pub upload_dir: PathBuf,
    pub scan_timeout_secs: u64,
    /// multipart 请求体上限（字节）
    pub max_upload_bytes: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3993".to_string(),
            upload_dir: PathBuf::from("/malware"),
            scan_timeout_secs: 60,
            max_upload_bytes: 32 << 20,
        }
    }
}

impl PluginConfig {
    /// 从 TOML 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml(&txt).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn from_toml(txt: &str) -> Result<Self> {
        Ok(toml::from_str(txt)?)
    }
}
