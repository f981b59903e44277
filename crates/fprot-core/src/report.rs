//! 输出格式：Markdown 表格 / JSON
use anyhow::Result;

use crate::types::{PluginResults, ScanRecord};

/// 序列化为 `{"f-prot": {...}}`
pub fn render_json(record: &ScanRecord) -> Result<String> {
    Ok(serde_json::to_string(&PluginResults::from(record.clone()))?)
}

/// 渲染为带标题的 Markdown 表格（Infected / Result / Engine / Updated）
pub fn render_markdown_table(record: &ScanRecord) -> String {
    let mut out = String::new();
    out.push_str("#### F-PROT\n\n");
    out.push_str("| Infected | Result | Engine | Updated |\n");
    out.push_str("|---|---|---|---|\n");
    out.push_str(&format!(
        "| {} | {} | {} | {} |\n",
        record.infected(),
        escape_cell(record.signature_name()),
        escape_cell(record.engine_version()),
        escape_cell(record.signature_date()),
    ));
    out
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}
