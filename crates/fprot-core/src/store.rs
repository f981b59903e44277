//! 结果落库（Elasticsearch 兼容的 HTTP 接口）
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::types::{ScanRecord, CATEGORY, NAME};

const DEFAULT_INDEX: &str = "malice";

/// 结果存储接口：按 ID upsert 一条记录
pub trait ResultStore {
    fn upsert(&self, id: &str, record: &ScanRecord) -> Result<()>;
}

pub struct ElasticsearchStore {
    base_url: String,
    index: String,
    client: reqwest::blocking::Client,
}

impl ElasticsearchStore {
    /// `url` 可省略协议（默认 http://）
    pub fn new(url: &str) -> Result<Self> {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() {
            bail!("elasticsearch address is empty");
        }
        let base_url = if url.contains("://") { url.to_string() } else { format!("http://{url}") };
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build elasticsearch client")?;
        Ok(Self { base_url, index: DEFAULT_INDEX.to_string(), client })
    }

    pub fn with_index(mut self, index: &str) -> Self {
        self.index = index.to_string();
        self
    }

    fn update_url(&self, id: &str) -> String {
        format!("{}/{}/_update/{}", self.base_url, self.index, id)
    }
}

/// upsert 请求体：插件结果挂在 plugins.<category>.<name> 下
fn upsert_body(id: &str, record: &ScanRecord) -> Value {
    json!({
        "doc": {
            "id": id,
            "name": NAME,
            "category": CATEGORY,
            "plugins": { CATEGORY: { NAME: record } }
        },
        "doc_as_upsert": true
    })
}

impl ResultStore for ElasticsearchStore {
    fn upsert(&self, id: &str, record: &ScanRecord) -> Result<()> {
        let url = self.update_url(id);
        debug!(%url, "upserting scan results");
        let resp = self
            .client
            .post(&url)
            .json(&upsert_body(id, record))
            .send()
            .with_context(|| format!("POST {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("elasticsearch upsert failed (HTTP {status}): {body}");
        }
        info!(id, index = %self.index, "scan results stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_defaults_to_http_and_index() {
        let s = ElasticsearchStore::new("elasticsearch:9200/").unwrap();
        assert_eq!(s.update_url("abc"), "http://elasticsearch:9200/malice/_update/abc");
        let s = ElasticsearchStore::new("https://es.local").unwrap().with_index("samples");
        assert_eq!(s.update_url("x"), "https://es.local/samples/_update/x");
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!(ElasticsearchStore::new("  ").is_err());
    }

    #[test]
    fn body_nests_under_category_and_name() {
        let record = crate::normalize("Engine version: 4.6.2\n").unwrap();
        let body = upsert_body("id1", &record);
        assert_eq!(body["doc_as_upsert"], true);
        assert_eq!(body["doc"]["id"], "id1");
        assert_eq!(body["doc"]["name"], "f-prot");
        assert_eq!(body["doc"]["category"], "av");
        assert_eq!(body["doc"]["plugins"]["av"]["f-prot"]["engine"], "4.6.2");
        assert_eq!(body["doc"]["plugins"]["av"]["f-prot"]["infected"], false);
    }
}
