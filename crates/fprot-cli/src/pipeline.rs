//! 扫描并输出：扫描 -> 落库 -> 表格/JSON 或回调
//!
//! 任一步失败即中止该文件的后续输出，绝不写入不完整的结论。
use anyhow::{Context, Result};
use fprot_core::{render_json, render_markdown_table, scan_id, ElasticsearchStore, ResultStore, Scanner, Webhook};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 结果下游
pub struct Sinks {
    store: Option<Box<dyn ResultStore + Send + Sync>>,
    webhook: Option<Webhook>,
    table: bool,
    scan_id: Option<String>,
}

impl Sinks {
    pub fn new(
        elasticsearch: Option<&str>,
        endpoint: Option<&str>,
        proxy: Option<&str>,
        table: bool,
        scan_id: Option<String>,
    ) -> Result<Self> {
        let store = match elasticsearch.map(str::trim).filter(|s| !s.is_empty()) {
            Some(url) => Some(Box::new(ElasticsearchStore::new(url)?) as Box<dyn ResultStore + Send + Sync>),
            None => None,
        };
        let webhook = endpoint.map(|e| Webhook::new(e, proxy)).transpose()?;
        Ok(Self { store, webhook, table, scan_id })
    }

    #[cfg(test)]
    fn with_store(mut self, store: Box<dyn ResultStore + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }
}

/// 处理单个文件；返回需要打印到 stdout 的文本（已回调推送时为 None）
pub fn scan_and_report(scanner: &Scanner, sinks: &Sinks, path: &Path) -> Result<Option<String>> {
    let path = path.canonicalize().with_context(|| format!("scan target {}", path.display()))?;
    let record = scanner.scan(&path)?;
    let id = scan_id(&path, sinks.scan_id.as_deref())?;
    debug!(%id, path = %path.display(), infected = record.infected(), "scan complete");

    if let Some(store) = &sinks.store {
        store.upsert(&id, &record).context("store scan results")?;
    }

    if sinks.table {
        return Ok(Some(render_markdown_table(&record)));
    }
    if let Some(hook) = &sinks.webhook {
        hook.post(&id, &record).context("post scan results")?;
        return Ok(None);
    }
    Ok(Some(render_json(&record)?))
}

/// 并行处理多个文件，结果与输入顺序一致
pub fn scan_all(
    scanner: &Scanner,
    sinks: &Sinks,
    paths: &[PathBuf],
    threads: Option<usize>,
) -> Result<Vec<Result<Option<String>>>> {
    use rayon::prelude::*;

    if paths.len() == 1 {
        return Ok(vec![scan_and_report(scanner, sinks, &paths[0])]);
    }
    let threads = threads.unwrap_or_else(num_cpus::get).min(paths.len()).max(1);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().context("build rayon pool")?;
    Ok(pool.install(|| paths.par_iter().map(|p| scan_and_report(scanner, sinks, p)).collect()))
}
