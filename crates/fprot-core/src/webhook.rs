//! 回调推送：把 JSON 结果 POST 到配置的端点
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::info;

use crate::types::{PluginResults, ScanRecord};

/// 扫描 ID 请求头
pub const SCAN_ID_HEADER: &str = "X-Malice-ID";

pub struct Webhook {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl Webhook {
    /// `proxy` 为空字符串时视为未设置
    pub fn new(endpoint: &str, proxy: Option<&str>) -> Result<Self> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            bail!("webhook endpoint is empty");
        }
        let mut builder = reqwest::blocking::Client::builder().timeout(Duration::from_secs(30));
        // 未显式配置代理时不读取系统代理环境变量
        builder = match proxy.map(str::trim).filter(|p| !p.is_empty()) {
            Some(proxy) => builder.proxy(reqwest::Proxy::all(proxy).with_context(|| format!("invalid proxy {proxy}"))?),
            None => builder.no_proxy(),
        };
        let client = builder.build().context("build webhook client")?;
        Ok(Self { endpoint: endpoint.to_string(), client })
    }

    /// 推送一条记录；非 2xx 视为失败
    pub fn post(&self, scan_id: &str, record: &ScanRecord) -> Result<reqwest::StatusCode> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(SCAN_ID_HEADER, scan_id)
            .json(&PluginResults::from(record.clone()))
            .send()
            .with_context(|| format!("POST {}", self.endpoint))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("webhook {} answered HTTP {status}", self.endpoint);
        }
        info!(endpoint = %self.endpoint, %status, scan_id, "results posted");
        Ok(status)
    }
}
