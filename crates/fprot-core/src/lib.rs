//! F-PROT 扫描插件核心库
//!
//! 设计要点：
//! - 核心只做一件事：把外部扫描引擎的自由文本报告归一化为类型化的 `ScanRecord`。
//! - 判毒相关的解析失败一律作为错误上抛，绝不退化为“干净”结论。
//! - 可选元数据（引擎版本、病毒库日期）解析失败只降级为空字段。
//! - 落库、表格/JSON 输出、回调推送等下游均只消费已完成的记录。

mod config;
mod error;
mod types;
mod tokenizer;
mod extract;
mod normalize;
mod scan;
mod updated;
mod report;
mod store;
mod webhook;
mod scan_id;

pub use config::{EngineConfig, PluginConfig, ReportLayout, SignatureConfig, WebConfig};
pub use error::{ExtractError, NormalizationError, ScanError};
pub use types::{PluginResults, ScanRecord, CATEGORY, NAME};
pub use tokenizer::{tokenize, ClassifiedLine, ClassifiedLines};
pub use extract::{extract_signature_name, parse_signature_date};
pub use normalize::{normalize, Normalizer};
pub use scan::{scan, EngineOutput, EngineRunner, ProcessRunner, Scanner};
pub use updated::{read_update_stamp, resolve_fallback_date, update_definitions, write_update_stamp};
pub use report::{render_json, render_markdown_table};
pub use store::{ElasticsearchStore, ResultStore};
pub use webhook::{Webhook, SCAN_ID_HEADER};
pub use scan_id::{file_sha256, scan_id};
